//! Resolution of logical fragment names to real files
//!
//! The render engine never touches the filesystem layout directly; it asks a
//! [`ResourceLocator`] for the location of each target and treats `None` as
//! "not found".

mod path;

pub use path::{PathResourceLocator, SEARCH_PATH_VAR};

use std::path::PathBuf;
use std::sync::Arc;

/// Maps a logical fragment identifier to a loadable location.
pub trait ResourceLocator: Send + Sync {
    /// Find `target`, returning the first existing match.
    ///
    /// When `real_path` is true the returned path is canonicalized.
    fn find(&self, target: &str, real_path: bool) -> Option<PathBuf>;
}

impl<L: ResourceLocator + ?Sized> ResourceLocator for Arc<L> {
    fn find(&self, target: &str, real_path: bool) -> Option<PathBuf> {
        (**self).find(target, real_path)
    }
}

impl<L: ResourceLocator + ?Sized> ResourceLocator for Box<L> {
    fn find(&self, target: &str, real_path: bool) -> Option<PathBuf> {
        (**self).find(target, real_path)
    }
}

/// The ways an engine can be told where its fragments live.
#[derive(Default)]
pub enum LocatorSource {
    /// A caller supplied locator, used as is
    Locator(Box<dyn ResourceLocator>),
    /// An ordered list of directories
    Paths(Vec<PathBuf>),
    /// The process-wide search path (`TESSERA_PATH`)
    #[default]
    SearchPath,
}

impl LocatorSource {
    pub fn into_locator(self) -> Box<dyn ResourceLocator> {
        match self {
            LocatorSource::Locator(locator) => locator,
            LocatorSource::Paths(paths) => Box::new(PathResourceLocator::new(paths)),
            LocatorSource::SearchPath => Box::new(PathResourceLocator::from_search_path()),
        }
    }
}

impl From<Vec<PathBuf>> for LocatorSource {
    fn from(paths: Vec<PathBuf>) -> Self {
        LocatorSource::Paths(paths)
    }
}

impl From<PathResourceLocator> for LocatorSource {
    fn from(locator: PathResourceLocator) -> Self {
        LocatorSource::Locator(Box::new(locator))
    }
}

impl From<Box<dyn ResourceLocator>> for LocatorSource {
    fn from(locator: Box<dyn ResourceLocator>) -> Self {
        LocatorSource::Locator(locator)
    }
}
