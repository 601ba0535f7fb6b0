//! Template provenance tracking.
//!
//! Every template loaded from the filesystem carries an [`Origin`]: which search
//! directory produced it, under which relative name, and from which absolute
//! file path. Origin tracking is unconditional, with no debug-mode toggle,
//! because the scoped inheritance directive needs to know the source directory
//! of the template it appears in before it can exclude that directory from
//! subsequent lookups for the same name.
//!
//! Templates registered directly from strings have no origin; inheritance
//! directives inside them fail to parse with a descriptive error.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Provenance record for one loaded template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    /// Human-readable identifier for the source, used in diagnostics.
    pub display_name: String,
    /// The relative, normalized template name the file was resolved under.
    pub template_name: String,
    /// Absolute path of the file that was loaded.
    pub path: PathBuf,
    /// The search directory that produced the file.
    ///
    /// Captured structurally at load time rather than recovered from `path` by
    /// string arithmetic, so trailing separators and platform-specific forms
    /// cannot skew the exclusion bookkeeping.
    pub directory: PathBuf,
}

/// Construct an [`Origin`] from loader-supplied data.
///
/// Pure function: returns `Some` when `display_name` is non-empty and `None`
/// otherwise, degrading gracefully to "no origin" for sources that cannot be
/// identified. No side effects beyond construction.
#[must_use]
pub fn make_origin(
    display_name: &str,
    template_name: &str,
    path: &Path,
    directory: &Path,
) -> Option<Origin> {
    if display_name.is_empty() {
        return None;
    }
    Some(Origin {
        display_name: display_name.to_string(),
        template_name: template_name.to_string(),
        path: path.to_path_buf(),
        directory: directory.to_path_buf(),
    })
}
