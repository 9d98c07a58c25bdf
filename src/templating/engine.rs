use minijinja::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};

use super::error::RenderError;
use super::executor::{FragmentExecutor, MiniJinjaExecutor};
use super::scope::{FrameStack, Scope};
use crate::helpers::{HelperMapping, HelperRegistry};
use crate::locator::{LocatorSource, ResourceLocator};

/// Model key under which [`RenderEngine::render_shell`] passes the rendered body
pub const RENDERED_BODY_KEY: &str = "rendered_body";

/// Text substituted for a render target the locator cannot resolve
pub fn not_found_placeholder(target: &str) -> String {
    format!("<!-- include '{target}' not found -->\n")
}

/// Remove exactly one trailing line terminator (`\r\n`, `\n` or `\r`)
fn strip_trailing_newline(mut text: String) -> String {
    if text.ends_with("\r\n") {
        text.truncate(text.len() - 2);
    } else if text.ends_with('\n') || text.ends_with('\r') {
        text.pop();
    }
    text
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A render target together with its data arguments
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub target: String,
    pub data: Vec<Scope>,
}

impl RenderRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            data: Vec::new(),
        }
    }

    /// Add a data argument; later arguments override earlier ones
    pub fn with(mut self, data: Scope) -> Self {
        self.data.push(data);
        self
    }
}

struct EngineInner {
    locator: Box<dyn ResourceLocator>,
    executor: Box<dyn FragmentExecutor>,
    helpers: Mutex<HelperRegistry>,
    frames: Mutex<FrameStack>,
}

/// Pops the frame it was created for, whatever way the render ends
struct FrameGuard<'a> {
    frames: &'a Mutex<FrameStack>,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        lock(self.frames).pop();
    }
}

/// Composes output from nested fragments.
///
/// Each render call builds a scope from the bound helpers, the data of the
/// enclosing render, the explicit data arguments and finally anything the
/// enclosing level exported, then hands it to the fragment executor.
///
/// `RenderEngine` is a cheap handle; clones share frames, helpers, locator
/// and executor. It is meant for sequential use: a render runs to completion,
/// nested renders included, before returning.
#[derive(Clone)]
pub struct RenderEngine {
    inner: Arc<EngineInner>,
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RenderEngine {
    /// Engine rendering MiniJinja fragments found through `source`
    pub fn new(source: impl Into<LocatorSource>) -> Self {
        Self::builder().source(source).build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Render `target` with the given data arguments.
    ///
    /// An unresolvable target yields [`not_found_placeholder`] rather than an
    /// error.
    pub fn render(&self, target: &str, data_args: &[Scope]) -> Result<String, RenderError> {
        let helpers = lock(&self.inner.helpers).cached().clone();

        let Some(path) = self.inner.locator.find(target, false) else {
            warn!("Fragment '{target}' not found");
            return Ok(not_found_placeholder(target));
        };

        let (scope, depth) = {
            let mut frames = lock(&self.inner.frames);
            let scope = frames.compose(&helpers, data_args);
            trace!(
                "Scope for '{target}': {:?}",
                scope.keys().collect::<Vec<_>>()
            );
            frames.push(scope.clone());
            (scope, frames.depth())
        };
        let _guard = FrameGuard {
            frames: &self.inner.frames,
        };

        debug!("Rendering '{target}' from {} at depth {depth}", path.display());

        let mut out = String::new();
        self.inner.executor.execute(self, &path, &scope, &mut out)?;

        debug!("Rendered '{target}' ({} bytes)", out.len());
        Ok(strip_trailing_newline(out))
    }

    /// Render `target` with a single data mapping
    pub fn render_model(&self, target: &str, model: &Scope) -> Result<String, RenderError> {
        self.render(target, std::slice::from_ref(model))
    }

    pub fn render_request(&self, request: &RenderRequest) -> Result<String, RenderError> {
        self.render(&request.target, &request.data)
    }

    /// Render `body`, then render `shell` with the body's text available
    /// under [`RENDERED_BODY_KEY`].
    pub fn render_shell(
        &self,
        shell: &str,
        body: &str,
        model: Option<Scope>,
    ) -> Result<String, RenderError> {
        let mut model = model.unwrap_or_default();
        let rendered_body = self.render_model(body, &model)?;
        model.insert(RENDERED_BODY_KEY.to_string(), Value::from(rendered_body));
        self.render_model(shell, &model)
    }

    /// Publish `value` to every fragment rendered later at or below the
    /// current level.
    ///
    /// Outside any render the value is kept for the next top-level render.
    pub fn export(&self, name: impl Into<String>, value: Value) -> Value {
        lock(&self.inner.frames).export(name, value)
    }

    /// Number of renders currently in progress
    pub fn depth(&self) -> usize {
        lock(&self.inner.frames).depth()
    }

    /// Resolve the helper `helper_name` (default `bound_name`) and make it
    /// part of every scope under `bound_name`.
    pub fn add_helper(
        &self,
        bound_name: &str,
        helper_name: Option<&str>,
    ) -> Result<Value, RenderError> {
        lock(&self.inner.helpers).add_helper(bound_name, helper_name)
    }

    pub fn add_helper_mapping<M: HelperMapping + 'static>(&self, mapping: M) {
        lock(&self.inner.helpers).add_helper_mapping(mapping);
    }

    pub fn add_helper_mappings<I>(&self, mappings: I)
    where
        I: IntoIterator<Item = Box<dyn HelperMapping>>,
    {
        lock(&self.inner.helpers).add_helper_mappings(mappings);
    }

    /// Cached-or-resolved helper lookup; see [`HelperRegistry::helper`].
    ///
    /// Helper mappings run while the registry is locked and must not call
    /// back into the engine.
    pub fn helper(&self, name: &str, fail_on_missing: bool) -> Result<Option<Value>, RenderError> {
        lock(&self.inner.helpers).helper(name, fail_on_missing)
    }

    /// Resolve every advertised helper. Expensive.
    pub fn all_helpers(&self) -> Result<BTreeMap<String, Value>, RenderError> {
        lock(&self.inner.helpers).all_helpers()
    }
}

/// Configures a [`RenderEngine`].
///
/// Defaults to the search path locator, the MiniJinja executor and an empty
/// helper registry.
#[derive(Default)]
pub struct EngineBuilder {
    source: LocatorSource,
    executor: Option<Box<dyn FragmentExecutor>>,
    helpers: HelperRegistry,
}

impl EngineBuilder {
    pub fn source(mut self, source: impl Into<LocatorSource>) -> Self {
        self.source = source.into();
        self
    }

    pub fn locator<L: ResourceLocator + 'static>(self, locator: L) -> Self {
        self.source(LocatorSource::Locator(Box::new(locator)))
    }

    pub fn paths<I, P>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.source(LocatorSource::Paths(paths.into_iter().map(Into::into).collect()))
    }

    pub fn executor<E: FragmentExecutor + 'static>(mut self, executor: E) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    pub fn helper_mapping<M: HelperMapping + 'static>(mut self, mapping: M) -> Self {
        self.helpers.add_helper_mapping(mapping);
        self
    }

    pub fn build(self) -> RenderEngine {
        let executor = self
            .executor
            .unwrap_or_else(|| Box::new(MiniJinjaExecutor::default()));

        RenderEngine {
            inner: Arc::new(EngineInner {
                locator: self.source.into_locator(),
                executor,
                helpers: Mutex::new(self.helpers),
                frames: Mutex::new(FrameStack::new()),
            }),
        }
    }
}
