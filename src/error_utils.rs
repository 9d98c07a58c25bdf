//! Shared error utilities

use miette::NamedSource;
use std::path::Path;

/// Toggle this to add spaces for iTerm2 clickability
const ADD_SPACES_FOR_ITERM: bool = true;

/// Format a fragment path for error display
///
/// Paths below the current working directory are shown relative to it. When
/// ADD_SPACES_FOR_ITERM is true, a space is added before the path to make it
/// clickable in iTerm2.
pub fn format_error_path(path: &Path) -> String {
    let display_path = std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf());
    let path_str = display_path.display().to_string();

    if ADD_SPACES_FOR_ITERM {
        format!(" {path_str}")
    } else {
        path_str
    }
}

/// Create a NamedSource with proper formatting for error display
pub fn create_named_source(path: &Path, content: String) -> NamedSource<String> {
    let formatted_path = format_error_path(path);
    NamedSource::new(formatted_path, content)
}
