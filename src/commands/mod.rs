mod find;
mod list;
mod render;

pub use find::find_command;
pub use list::list_command;
pub use render::{RenderArgs, render_command};

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::debug;

use tessera::PathResourceLocator;
use tessera::config::ProjectConfig;

/// Where to look for fragments
#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    /// Fragment directory, searched in the order given (repeatable).
    /// Falls back to the config file, then to TESSERA_PATH.
    #[arg(short, long = "path", value_name = "DIR")]
    pub paths: Vec<PathBuf>,

    /// Directory searched before the primary directories (repeatable)
    #[arg(long, value_name = "DIR")]
    pub prepend: Vec<PathBuf>,

    /// Directory searched after the primary directories (repeatable)
    #[arg(long, value_name = "DIR")]
    pub append: Vec<PathBuf>,

    /// Project config file (defaults to ./tessera.yml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// A loaded config file and the directory its relative paths refer to
pub struct LoadedConfig {
    pub config: ProjectConfig,
    pub base_dir: PathBuf,
}

impl SearchArgs {
    pub fn load_config(&self) -> Result<Option<LoadedConfig>> {
        let found = match &self.config {
            Some(path) => Some((ProjectConfig::load(path)?, path.clone())),
            None => ProjectConfig::discover(&std::env::current_dir()?)?,
        };

        Ok(found.map(|(config, path)| {
            debug!("Using config file {}", path.display());
            let base_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            LoadedConfig { config, base_dir }
        }))
    }

    /// Command line directories win over the config file, which wins over
    /// the search path variable.
    pub fn locator(&self, loaded: Option<&LoadedConfig>) -> Result<PathResourceLocator> {
        let cwd = std::env::current_dir()?;
        let absolute = |dirs: &[PathBuf]| dirs.iter().map(|d| cwd.join(d)).collect::<Vec<_>>();

        let base = if !self.paths.is_empty() {
            PathResourceLocator::new(absolute(self.paths.as_slice()))
        } else if let Some(loaded) = loaded {
            loaded.config.locator(&loaded.base_dir)
        } else {
            PathResourceLocator::from_search_path()
        };

        Ok(base
            .prepend(absolute(self.prepend.as_slice()))
            .append(absolute(self.append.as_slice())))
    }
}
