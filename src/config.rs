//! Project configuration file (`tessera.yml`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::helpers::HelperMap;
use crate::locator::PathResourceLocator;
use crate::templating::variables::yaml_value_to_minijinja_value;

/// File names looked for when no config is given explicitly
pub const CONFIG_FILE_NAMES: [&str; 2] = ["tessera.yml", "tessera.yaml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Primary fragment directories, relative to the config file
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Searched before `paths`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prepend: Vec<PathBuf>,

    /// Searched after `paths`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub append: Vec<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<HashMap<String, serde_yaml::Value>>,

    /// Constant helpers, bound in every fragment scope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helpers: Option<HashMap<String, serde_yaml::Value>>,

    /// Fail on undefined variables
    #[serde(default)]
    pub strict: bool,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Find and load a config file in `dir`, if there is one
    pub fn discover(dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((config, candidate)));
            }
        }
        Ok(None)
    }

    /// Locator over the configured directories, resolved against `base_dir`
    pub fn locator(&self, base_dir: &Path) -> PathResourceLocator {
        PathResourceLocator::new(self.paths.clone())
            .prepend(self.prepend.clone())
            .append(self.append.clone())
            .with_dot_path(base_dir)
    }

    /// The configured constant helpers as a helper mapping
    pub fn helper_map(&self) -> HelperMap {
        helper_map_from_yaml(self.helpers.iter().flatten())
    }
}

/// Build a helper mapping from YAML name/value pairs
pub fn helper_map_from_yaml<'a, I>(entries: I) -> HelperMap
where
    I: IntoIterator<Item = (&'a String, &'a serde_yaml::Value)>,
{
    entries
        .into_iter()
        .map(|(name, value)| (name.clone(), yaml_value_to_minijinja_value(value)))
        .collect()
}

/// Load a YAML mapping of constant helpers
pub fn load_helpers_file(path: &Path) -> Result<HelperMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read helpers file {}", path.display()))?;
    let helpers: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&content)
        .with_context(|| format!("Helpers file {} must be a YAML mapping", path.display()))?;
    Ok(helper_map_from_yaml(&helpers))
}
