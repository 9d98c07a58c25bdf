//! Execution of a single fragment body

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use std::error::Error as StdError;
use std::path::Path;
use tracing::trace;

use super::engine::RenderEngine;
use super::error::{RenderError, TemplateError};
use super::functions::register_functions;
use super::scope::Scope;

/// Runs the body of a resolved fragment.
///
/// The executor receives the engine that invoked it so the body can call
/// back into it (`render`, `export`, helpers) as if it were the original
/// caller. Everything the body emits goes to `out`.
pub trait FragmentExecutor: Send + Sync {
    fn execute(
        &self,
        engine: &RenderEngine,
        path: &Path,
        scope: &Scope,
        out: &mut String,
    ) -> Result<(), RenderError>;
}

/// Executor backed by a closure, for fragments implemented in Rust
pub struct FnExecutor<F> {
    body: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&RenderEngine, &Path, &Scope, &mut String) -> Result<(), RenderError> + Send + Sync,
{
    pub fn new(body: F) -> Self {
        Self { body }
    }
}

impl<F> FragmentExecutor for FnExecutor<F>
where
    F: Fn(&RenderEngine, &Path, &Scope, &mut String) -> Result<(), RenderError> + Send + Sync,
{
    fn execute(
        &self,
        engine: &RenderEngine,
        path: &Path,
        scope: &Scope,
        out: &mut String,
    ) -> Result<(), RenderError> {
        (self.body)(engine, path, scope, out)
    }
}

/// Renders fragment files as MiniJinja templates.
///
/// The scope becomes the template context. A fresh environment is built for
/// every fragment, so nothing compiled outlives the call. Auto-escaping is
/// off (use `escape()` explicitly) and trailing newlines are left for the
/// engine to normalize.
#[derive(Debug, Clone, Copy)]
pub struct MiniJinjaExecutor {
    undefined: UndefinedBehavior,
}

impl Default for MiniJinjaExecutor {
    fn default() -> Self {
        Self {
            undefined: UndefinedBehavior::Lenient,
        }
    }
}

impl MiniJinjaExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on undefined variables instead of rendering them empty
    pub fn strict() -> Self {
        Self {
            undefined: UndefinedBehavior::Strict,
        }
    }

    fn environment(&self, engine: &RenderEngine) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_undefined_behavior(self.undefined);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        register_functions(&mut env, engine);
        env
    }
}

impl FragmentExecutor for MiniJinjaExecutor {
    fn execute(
        &self,
        engine: &RenderEngine,
        path: &Path,
        scope: &Scope,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let source = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        trace!("Executing {} with {} variables", path.display(), scope.len());

        let env = self.environment(engine);
        let name = path.display().to_string();
        match env.render_named_str(&name, &source, scope) {
            Ok(rendered) => {
                out.push_str(&rendered);
                Ok(())
            }
            Err(error) => match missing_helper(&error) {
                Some(name) => Err(RenderError::HelperNotFound { name }),
                None => Err(TemplateError::from_minijinja_error(error, source, path).into()),
            },
        }
    }
}

/// Name of the helper behind a failed lookup anywhere in `error`'s cause chain
fn missing_helper(error: &minijinja::Error) -> Option<String> {
    std::iter::successors(Some(error as &(dyn StdError + 'static)), |&e| e.source()).find_map(
        |cause| match cause.downcast_ref::<RenderError>() {
            Some(RenderError::HelperNotFound { name }) => Some(name.clone()),
            _ => None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_helper_surfaces_as_helper_not_found() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("outer.tmpl"), "a {{ render(\"inner.tmpl\") }} b").unwrap();
        fs::write(dir.path().join("inner.tmpl"), "{{ helper(\"uri\") }}").unwrap();
        let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);

        let err = engine.render("outer.tmpl", &[]).unwrap_err();
        assert!(matches!(err, RenderError::HelperNotFound { ref name } if name == "uri"));
        assert_eq!(engine.depth(), 0);
    }

    #[test]
    fn test_other_failures_stay_template_errors() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("page.tmpl"), "{{ nope }}").unwrap();
        let engine = RenderEngine::builder()
            .paths([dir.path()])
            .executor(MiniJinjaExecutor::strict())
            .build();

        let err = engine.render("page.tmpl", &[]).unwrap_err();
        assert!(matches!(err, RenderError::Template(_)));
    }

    #[test]
    fn test_unreadable_fragment_is_io_error() {
        let dir = tempdir().unwrap();
        let engine = RenderEngine::new(vec![dir.path().to_path_buf()]);
        let mut out = String::new();

        let err = MiniJinjaExecutor::default()
            .execute(&engine, &dir.path().join("gone.tmpl"), &Scope::new(), &mut out)
            .unwrap_err();
        assert!(matches!(err, RenderError::Io { .. }));
    }
}
