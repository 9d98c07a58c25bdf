//! Directory based fragment lookup

use std::env;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::ResourceLocator;

/// Environment variable holding the process-wide fragment search path
pub const SEARCH_PATH_VAR: &str = "TESSERA_PATH";

/// Where the primary directory list comes from
#[derive(Debug, Clone)]
enum PrimaryPaths {
    Fixed(Vec<PathBuf>),
    /// Re-read from the environment on every lookup
    SearchPath,
}

/// Searches an ordered list of directories for a fragment.
///
/// Directories are consulted in the order prepended, primary, appended. The
/// first directory containing the target wins. Relative directories are
/// resolved against `dot_path` when one is set, otherwise against the current
/// working directory.
#[derive(Debug, Clone)]
pub struct PathResourceLocator {
    dot_path: Option<PathBuf>,
    primary: PrimaryPaths,
    prepended: Vec<PathBuf>,
    appended: Vec<PathBuf>,
}

impl PathResourceLocator {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dot_path: None,
            primary: PrimaryPaths::Fixed(paths.into_iter().map(Into::into).collect()),
            prepended: Vec::new(),
            appended: Vec::new(),
        }
    }

    /// Locator whose primary list is the `TESSERA_PATH` variable, split on the
    /// platform path separator.
    pub fn from_search_path() -> Self {
        Self {
            dot_path: None,
            primary: PrimaryPaths::SearchPath,
            prepended: Vec::new(),
            appended: Vec::new(),
        }
    }

    /// Base directory for relative search directories
    pub fn with_dot_path(mut self, dot_path: impl Into<PathBuf>) -> Self {
        self.dot_path = Some(dot_path.into());
        self
    }

    /// Add directories searched before the primary list
    pub fn prepend<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.prepended.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Add directories searched after the primary list
    pub fn append<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.appended.extend(paths.into_iter().map(Into::into));
        self
    }

    /// The primary directory list
    pub fn paths(&self) -> Vec<PathBuf> {
        match &self.primary {
            PrimaryPaths::Fixed(paths) => paths.clone(),
            PrimaryPaths::SearchPath => env::var_os(SEARCH_PATH_VAR)
                .map(|value| {
                    env::split_paths(&value)
                        .filter(|p| !p.as_os_str().is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Every directory in search order, relative entries resolved
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        self.prepended
            .iter()
            .cloned()
            .chain(self.paths())
            .chain(self.appended.iter().cloned())
            .map(|dir| self.resolve_dir(dir))
            .collect()
    }

    fn resolve_dir(&self, dir: PathBuf) -> PathBuf {
        match &self.dot_path {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir,
        }
    }

    fn finish(candidate: PathBuf, real_path: bool) -> Option<PathBuf> {
        if real_path {
            candidate.canonicalize().ok()
        } else {
            Some(candidate)
        }
    }
}

impl ResourceLocator for PathResourceLocator {
    fn find(&self, target: &str, real_path: bool) -> Option<PathBuf> {
        let target_path = Path::new(target);

        if target_path.is_absolute() {
            return target_path
                .is_file()
                .then(|| Self::finish(target_path.to_path_buf(), real_path))
                .flatten();
        }

        for dir in self.search_dirs() {
            let candidate = dir.join(target_path);
            trace!("Probing {}", candidate.display());
            if candidate.is_file() {
                return Self::finish(candidate, real_path);
            }
        }

        None
    }
}
