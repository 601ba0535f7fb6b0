//! Error handling for template resolution and rendering.
//!
//! This module provides the crate-wide [`TemplateError`] type. The error system
//! follows two principles:
//! 1. **Strongly-typed errors** for precise handling in code
//! 2. **Descriptive messages** that name the template, directive, or directory
//!    involved, so misconfigurations can be fixed without a debugger
//!
//! No error is caught and suppressed inside this crate; everything propagates to
//! the caller, which decides how failures become user-visible (logs, 500 page,
//! CLI output, etc.).

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for template operations.
///
/// Each variant represents a specific failure mode with enough context to act on:
///
/// - **Syntax errors** ([`TemplateError::SyntaxError`]) are raised at parse or
///   early render time for malformed or misplaced inheritance directives and are
///   never recovered.
/// - **Lookup failures** ([`TemplateError::TemplateNotFound`]) signal genuine
///   misconfiguration, such as an inheritance chain deeper than the number of
///   distinct same-named template files on the search path.
/// - **Invariant violations** ([`TemplateError::UnsupportedOrigin`]) mean a
///   template reached the renderer through a path the search configuration does
///   not cover; continuing would corrupt the exclusion bookkeeping, so this is
///   fatal.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No candidate search directory (or registered template) produced the name.
    ///
    /// Carries the list of directories that were actually consulted, which for a
    /// name with exclusion bookkeeping may be a strict subset of the configured
    /// search path.
    #[error("template '{name}' does not exist (searched {n} directories)", n = .searched.len())]
    TemplateNotFound {
        /// The relative template name that could not be resolved
        name: String,
        /// The directories that were searched, in order
        searched: Vec<PathBuf>,
    },

    /// A malformed or misplaced inheritance directive.
    ///
    /// Covers wrong argument counts, duplicate inheritance directives in one
    /// template body, directives in templates with no known origin, and parent
    /// expressions that resolve to an empty value.
    #[error("template syntax error: {message}")]
    SyntaxError {
        /// Description of what is wrong and where
        message: String,
    },

    /// The directory that produced the currently rendering template is not
    /// present in that name's candidate list.
    ///
    /// The template was loaded from a source that was never added by the
    /// exclusion bookkeeping, which means the search configuration does not
    /// cover it. Rendering must stop rather than continue with a corrupted
    /// candidate list.
    #[error("template '{name}' was loaded from '{directory}', which is not on the configured search path", directory = .directory.display())]
    UnsupportedOrigin {
        /// The template name whose candidate list was being updated
        name: String,
        /// The directory that was expected to be present
        directory: PathBuf,
    },

    /// A template file existed but could not be read.
    #[error("failed to read template file '{path}'", path = .path.display())]
    Io {
        /// The file that could not be read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Compilation or rendering failed inside Tera.
    ///
    /// Block merging and expression evaluation are delegated to Tera, so its
    /// errors pass through unchanged.
    #[error("template rendering failed: {source}")]
    Render {
        /// The underlying Tera error
        #[from]
        source: tera::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_counts_directories() {
        let err = TemplateError::TemplateNotFound {
            name: "foo/bar.html".to_string(),
            searched: vec![PathBuf::from("/a"), PathBuf::from("/b")],
        };
        let msg = err.to_string();
        assert!(msg.contains("foo/bar.html"));
        assert!(msg.contains("searched 2 directories"));
    }

    #[test]
    fn test_unsupported_origin_names_directory() {
        let err = TemplateError::UnsupportedOrigin {
            name: "x.html".to_string(),
            directory: PathBuf::from("/somewhere/else"),
        };
        let msg = err.to_string();
        assert!(msg.contains("x.html"));
        assert!(msg.contains("not on the configured search path"));
    }
}
