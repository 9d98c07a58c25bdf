//! Render error types with miette integration

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a render chain.
///
/// An unresolvable render target is not among them: it degrades to an inline
/// placeholder instead.
#[derive(Error, Debug, Diagnostic)]
pub enum RenderError {
    #[error("Could not locate helper named \"{name}\"")]
    #[diagnostic(
        code(tessera::helper_not_found),
        help("Register a helper mapping that provides this name before rendering")
    )]
    HelperNotFound { name: String },

    #[error("Failed to read fragment '{}'", .path.display())]
    #[diagnostic(code(tessera::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error("Fragment '{}' failed: {message}", .path.display())]
    #[diagnostic(code(tessera::fragment))]
    Fragment { path: PathBuf, message: String },
}

#[derive(Error, Debug, Diagnostic)]
#[error("Template error in {}", .path.display())]
#[diagnostic(code(tessera::template))]
pub struct TemplateError {
    // The source code is stored as NamedSource for better error display
    #[source_code]
    src: NamedSource<String>,

    #[label("{}", self.reason)]
    span: Option<SourceSpan>,

    reason: String,

    #[help]
    help: Option<String>,

    path: PathBuf,

    // Kept for chained error support
    #[source]
    source: Option<minijinja::Error>,
}

impl TemplateError {
    /// Create a new template error from a MiniJinja error
    pub fn from_minijinja_error(
        error: minijinja::Error,
        source: String,
        source_path: &std::path::Path,
    ) -> Self {
        let (span, reason, help) = Self::extract_error_info(&error, &source);

        let src = crate::error_utils::create_named_source(source_path, source);

        Self {
            src,
            span,
            reason,
            help,
            path: source_path.to_path_buf(),
            source: Some(error),
        }
    }

    /// Short description of what went wrong
    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn extract_error_info(
        error: &minijinja::Error,
        source: &str,
    ) -> (Option<SourceSpan>, String, Option<String>) {
        let span = error.line().map(|line| {
            // MiniJinja uses 1-based line numbers
            match error.range() {
                Some(range) => SourceSpan::from(range),
                None => SourceSpan::from(Self::line_to_offset(source, line.saturating_sub(1))),
            }
        });

        let detail = error.detail().unwrap_or("unknown");
        let reason = match error.kind() {
            minijinja::ErrorKind::UndefinedError => match error.detail() {
                Some(detail) => format!("undefined variable: {detail}"),
                None => "undefined variable".to_string(),
            },
            minijinja::ErrorKind::SyntaxError => format!(
                "syntax error: {}",
                error.detail().unwrap_or("invalid syntax")
            ),
            minijinja::ErrorKind::InvalidOperation => format!("invalid operation: {detail}"),
            minijinja::ErrorKind::TooManyArguments => format!("too many arguments: {detail}"),
            minijinja::ErrorKind::MissingArgument => format!("missing argument: {detail}"),
            minijinja::ErrorKind::UnknownFilter => format!("unknown filter: {detail}"),
            minijinja::ErrorKind::UnknownFunction => format!("unknown function: {detail}"),
            minijinja::ErrorKind::UnknownMethod => format!("unknown method: {detail}"),
            minijinja::ErrorKind::BadEscape => "bad escape sequence".to_string(),
            minijinja::ErrorKind::CannotUnpack => "cannot unpack value".to_string(),
            minijinja::ErrorKind::WriteFailure => "write failure".to_string(),
            _ => error.to_string(),
        };

        let help = match error.kind() {
            minijinja::ErrorKind::UndefinedError => Some(
                "Make sure this variable is provided by:\n\
                     • a registered helper\n\
                     • the including fragment or an export() above it\n\
                     • --var name=value, TESSERA_VAR_<NAME> or the vars file"
                    .to_string(),
            ),
            minijinja::ErrorKind::SyntaxError => Some(
                "Check the MiniJinja template syntax at https://docs.rs/minijinja/".to_string(),
            ),
            minijinja::ErrorKind::UnknownFunction => Some(
                "Available functions: render(target, ...), export(name, value), \
                 escape(text, html_safe), helper(name, fail_on_missing), \
                 render_shell(shell, body, model)"
                    .to_string(),
            ),
            _ => None,
        };

        (span, reason, help)
    }

    /// Calculate byte offset from line number
    fn line_to_offset(source: &str, target_line: usize) -> usize {
        let mut current_line = 0;

        for (idx, ch) in source.char_indices() {
            if current_line == target_line {
                return idx;
            }

            if ch == '\n' {
                current_line += 1;
            }
        }

        source.len()
    }
}
