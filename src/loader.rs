//! Filesystem template lookup.
//!
//! Given a relative name and an ordered list of candidate directories, returns
//! the raw source of the first match together with its [`Origin`]. The caller
//! controls the candidate list, which is how the exclusion bookkeeping steers
//! same-name lookups past directories that already contributed a file.

use std::path::{Component, Path, PathBuf};

use crate::error::TemplateError;
use crate::origin::{Origin, make_origin};

/// Search `dirs` in order for a file matching `name`.
///
/// Returns the raw template source plus its origin. The origin is `None` only
/// when the resolved path has no printable display name, in which case the
/// template still renders but cannot host a scoped inheritance directive.
///
/// # Errors
///
/// - [`TemplateError::SyntaxError`] if `name` is absolute or traverses outside
///   the search directory
/// - [`TemplateError::TemplateNotFound`] if no directory contains the name
/// - [`TemplateError::Io`] if a matching file cannot be read
pub(crate) fn find_template(
    name: &str,
    dirs: &[PathBuf],
) -> Result<(String, Option<Origin>), TemplateError> {
    validate_template_name(name)?;

    for dir in dirs {
        let candidate = dir.join(Path::new(name));
        if !candidate.is_file() {
            continue;
        }
        tracing::debug!(
            template = name,
            path = %candidate.display(),
            "resolved template"
        );
        let source = std::fs::read_to_string(&candidate).map_err(|source| TemplateError::Io {
            path: candidate.clone(),
            source,
        })?;
        let display_name = candidate.display().to_string();
        let origin = make_origin(&display_name, name, &candidate, dir);
        return Ok((source, origin));
    }

    tracing::debug!(template = name, searched = dirs.len(), "template not found");
    Err(TemplateError::TemplateNotFound {
        name: name.to_string(),
        searched: dirs.to_vec(),
    })
}

/// Reject template names that could escape the search directories.
fn validate_template_name(name: &str) -> Result<(), TemplateError> {
    let path = Path::new(name);
    if name.is_empty() || path.is_absolute() {
        return Err(TemplateError::SyntaxError {
            message: format!("template name '{name}' must be a non-empty relative path"),
        });
    }
    for component in path.components() {
        match component {
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                return Err(TemplateError::SyntaxError {
                    message: format!(
                        "template name '{name}' must not contain parent directory or root components"
                    ),
                });
            }
            _ => {}
        }
    }
    Ok(())
}
