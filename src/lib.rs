//! Text composition from nested template fragments.
//!
//! A [`RenderEngine`] renders a fragment with a scope assembled from bound
//! helpers, the data of the enclosing render, explicit data arguments and
//! the enclosing level's exports. Fragments may render further fragments
//! through the same engine.

pub mod config;
pub mod error_utils;
pub mod helpers;
pub mod locator;
pub mod templating;

pub use helpers::{HelperMapping, HelperRegistry};
pub use locator::{LocatorSource, PathResourceLocator, ResourceLocator};
pub use templating::{RenderEngine, RenderError, Scope};
