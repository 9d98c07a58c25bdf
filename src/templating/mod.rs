pub mod engine;
pub mod error;
pub mod executor;
pub mod functions;
pub mod scope;
pub mod variables;

pub use engine::{
    EngineBuilder, RENDERED_BODY_KEY, RenderEngine, RenderRequest, not_found_placeholder,
};
pub use error::{RenderError, TemplateError};
pub use executor::{FnExecutor, FragmentExecutor, MiniJinjaExecutor};
pub use functions::escape;
pub use scope::Scope;
pub use variables::VariableResolver;
