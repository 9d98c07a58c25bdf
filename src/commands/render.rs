use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::{debug, info};

use tessera::config::load_helpers_file;
use tessera::helpers::{HelperMap, HelperMapping};
use tessera::templating::variables::parse_cli_vars;
use tessera::templating::{MiniJinjaExecutor, RenderEngine, VariableResolver};

use super::SearchArgs;

#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Logical name of the fragment to render
    pub target: String,

    #[command(flatten)]
    pub search: SearchArgs,

    /// Set a model variable (repeatable). JSON values keep their type.
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    /// YAML file with model variables
    #[arg(long, value_name = "FILE")]
    pub vars_file: Option<PathBuf>,

    /// YAML file with constant helpers, bound in every fragment
    #[arg(long, value_name = "FILE")]
    pub helpers: Option<PathBuf>,

    /// Render TARGET as the body of this shell fragment
    #[arg(long, value_name = "SHELL")]
    pub shell: Option<String>,

    /// Fail on undefined variables
    #[arg(long)]
    pub strict: bool,

    /// Write the output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Bind every helper a mapping advertises, then register the mapping
fn bind_all(engine: &RenderEngine, helpers: HelperMap) -> Result<()> {
    let names = helpers.helper_names();
    engine.add_helper_mapping(helpers);
    for name in names {
        engine.add_helper(&name, None)?;
    }
    Ok(())
}

pub fn render_command(args: &RenderArgs) -> Result<()> {
    let loaded = args.search.load_config()?;
    let locator = args.search.locator(loaded.as_ref())?;

    let strict = args.strict || loaded.as_ref().is_some_and(|l| l.config.strict);
    let executor = if strict {
        MiniJinjaExecutor::strict()
    } else {
        MiniJinjaExecutor::new()
    };

    let engine = RenderEngine::builder()
        .locator(locator)
        .executor(executor)
        .build();

    // Earlier mappings win, so the command line file goes first
    if let Some(path) = &args.helpers {
        bind_all(&engine, load_helpers_file(path)?)?;
    }
    if let Some(loaded) = &loaded {
        bind_all(&engine, loaded.config.helper_map())?;
    }

    let mut resolver = VariableResolver::new();
    if let Some(vars) = loaded.as_ref().and_then(|l| l.config.vars.as_ref()) {
        resolver.add_vars_section(vars);
    }
    if let Some(path) = &args.vars_file {
        resolver.add_vars_file(path)?;
    }
    resolver.add_env_vars();
    resolver.add_cli_vars(&parse_cli_vars(&args.vars)?);
    let model = resolver.to_scope();
    debug!("Rendering with {} model variables", model.len());

    let mut rendered = match &args.shell {
        Some(shell) => engine.render_shell(shell, &args.target, Some(model)),
        None => engine.render_model(&args.target, &model),
    }
    .map_err(|e| anyhow::anyhow!("{:?}", miette::Report::new(e)))?;

    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            info!("Wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
