use minijinja::Value;
use std::collections::BTreeMap;

use super::HelperMapping;

/// A fixed table of helper values
#[derive(Debug, Clone, Default)]
pub struct HelperMap {
    helpers: BTreeMap<String, Value>,
}

impl HelperMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, helper: Value) -> &mut Self {
        self.helpers.insert(name.into(), helper);
        self
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }
}

impl FromIterator<(String, Value)> for HelperMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            helpers: iter.into_iter().collect(),
        }
    }
}

impl HelperMapping for HelperMap {
    fn get_helper(&self, name: &str) -> Option<Value> {
        self.helpers.get(name).cloned()
    }

    fn helper_names(&self) -> Vec<String> {
        self.helpers.keys().cloned().collect()
    }
}

type Factory = Box<dyn Fn() -> Value + Send + Sync>;

/// Helpers built on demand.
///
/// Each factory runs whenever the mapping is asked for its helper; the
/// registry cache is what keeps that to once per name.
#[derive(Default)]
pub struct HelperFactories {
    factories: BTreeMap<String, Factory>,
}

impl HelperFactories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }
}

impl HelperMapping for HelperFactories {
    fn get_helper(&self, name: &str) -> Option<Value> {
        self.factories.get(name).map(|factory| factory())
    }

    fn helper_names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}
