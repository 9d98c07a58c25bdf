//! Named helper values shared by every fragment
//!
//! Helpers come from an ordered list of [`HelperMapping`] providers. A helper
//! is resolved the first time it is asked for, by scanning the providers in
//! registration order until one of them produces a value. That value is then
//! cached for the lifetime of the registry, so repeated lookups hand back the
//! same underlying object.

mod mappings;

pub use mappings::{HelperFactories, HelperMap};

use minijinja::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::templating::Scope;
use crate::templating::error::RenderError;

/// A source of helper values.
pub trait HelperMapping: Send + Sync {
    /// The helper registered under `name`, if this mapping provides one
    fn get_helper(&self, name: &str) -> Option<Value>;

    /// Every helper name this mapping can provide
    fn helper_names(&self) -> Vec<String>;
}

impl<M: HelperMapping + ?Sized> HelperMapping for Arc<M> {
    fn get_helper(&self, name: &str) -> Option<Value> {
        (**self).get_helper(name)
    }

    fn helper_names(&self) -> Vec<String> {
        (**self).helper_names()
    }
}

impl<M: HelperMapping + ?Sized> HelperMapping for Box<M> {
    fn get_helper(&self, name: &str) -> Option<Value> {
        (**self).get_helper(name)
    }

    fn helper_names(&self) -> Vec<String> {
        (**self).helper_names()
    }
}

/// Ordered helper providers plus the cache of everything resolved so far.
#[derive(Default)]
pub struct HelperRegistry {
    mappings: Vec<Box<dyn HelperMapping>>,
    cache: Scope,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider. Earlier providers keep priority.
    pub fn add_helper_mapping<M: HelperMapping + 'static>(&mut self, mapping: M) {
        self.mappings.push(Box::new(mapping));
        debug!("Registered helper mapping #{}", self.mappings.len());
    }

    /// Append several providers, preserving their order
    pub fn add_helper_mappings<I>(&mut self, mappings: I)
    where
        I: IntoIterator<Item = Box<dyn HelperMapping>>,
    {
        for mapping in mappings {
            self.add_helper_mapping(mapping);
        }
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }

    /// Resolve `helper_name` (defaulting to `bound_name`) and expose it in every
    /// fragment scope under `bound_name`.
    ///
    /// Fails if no provider knows the helper. A name that is already bound keeps
    /// its existing value.
    pub fn add_helper(
        &mut self,
        bound_name: &str,
        helper_name: Option<&str>,
    ) -> Result<Value, RenderError> {
        let helper_name = helper_name.unwrap_or(bound_name);
        let helper = self.require(helper_name)?;

        let bound = self
            .cache
            .entry(bound_name.to_string())
            .or_insert(helper)
            .clone();
        debug!("Bound helper '{helper_name}' as '{bound_name}'");
        Ok(bound)
    }

    /// Look up a helper, consulting the cache before the providers.
    ///
    /// When nothing provides `name`, returns [`RenderError::HelperNotFound`] if
    /// `fail_on_missing` is set and `Ok(None)` otherwise.
    pub fn helper(
        &mut self,
        name: &str,
        fail_on_missing: bool,
    ) -> Result<Option<Value>, RenderError> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(Some(cached.clone()));
        }

        let resolved = self
            .mappings
            .iter()
            .enumerate()
            .find_map(|(index, mapping)| mapping.get_helper(name).map(|helper| (index, helper)));

        match resolved {
            Some((index, helper)) => {
                debug!("Resolved helper '{name}' from mapping #{}", index + 1);
                self.cache.insert(name.to_string(), helper.clone());
                Ok(Some(helper))
            }
            None if fail_on_missing => Err(RenderError::HelperNotFound {
                name: name.to_string(),
            }),
            None => Ok(None),
        }
    }

    /// Look up a helper that must exist
    pub fn require(&mut self, name: &str) -> Result<Value, RenderError> {
        self.helper(name, true)?
            .ok_or_else(|| RenderError::HelperNotFound {
                name: name.to_string(),
            })
    }

    /// Look up a helper that may be absent
    pub fn find(&mut self, name: &str) -> Option<Value> {
        self.helper(name, false).ok().flatten()
    }

    /// Resolve every helper every provider advertises.
    ///
    /// This forces construction of helpers that might never be used, so it is
    /// expensive for providers that build helpers lazily.
    pub fn all_helpers(&mut self) -> Result<BTreeMap<String, Value>, RenderError> {
        let names: Vec<String> = self
            .mappings
            .iter()
            .flat_map(|mapping| mapping.helper_names())
            .collect();
        debug!("Materializing {} advertised helpers", names.len());

        let mut all = BTreeMap::new();
        for name in names {
            if let Some(helper) = self.helper(&name, true)? {
                all.insert(name, helper);
            }
        }
        Ok(all)
    }

    /// Everything resolved so far, the base of every fragment scope
    pub fn cached(&self) -> &Scope {
        &self.cache
    }
}
