use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{RenderArgs, SearchArgs};

#[derive(Parser)]
#[command(
    name = "tessera",
    about = "Composes text output from nested template fragments",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (use -vv for debug output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a fragment and print the result
    Render(RenderArgs),

    /// Print where a fragment would be loaded from
    Find {
        /// Logical name of the fragment
        target: String,

        #[command(flatten)]
        search: SearchArgs,

        /// Print the canonical path
        #[arg(long)]
        real_path: bool,
    },

    /// List the fragments available in every search directory
    List {
        #[command(flatten)]
        search: SearchArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Render(args) => commands::render_command(args)?,
        Commands::Find {
            target,
            search,
            real_path,
        } => commands::find_command(search, target, *real_path)?,
        Commands::List { search } => commands::list_command(search)?,
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::new("tessera=warn"), // Default: warnings and errors only
        1 => EnvFilter::new("tessera=info"), // -v: info messages
        _ => EnvFilter::new("tessera=debug"), // -vv or more: full debug
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
