//! Search directory configuration.
//!
//! Template names are resolved against an ordered list of search directories:
//! explicitly configured project directories first, then per-application
//! directories, each group in its configured order. The order is what makes
//! same-name inheritance deterministic: a project template shadows (and may
//! extend) an application template of the identical relative name.

use std::path::{Component, Path, PathBuf};

/// Ordered template search directory configuration.
///
/// # Examples
///
/// ```rust,no_run
/// use overextends::EngineConfig;
///
/// let config = EngineConfig::new(
///     vec!["templates".into()],
///     vec!["apps/blog/templates".into(), "apps/shop/templates".into()],
/// );
/// // Lookup order: templates, apps/blog/templates, apps/shop/templates
/// let dirs = config.search_dirs();
/// assert_eq!(dirs.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Explicitly configured project template directories, highest priority first.
    pub template_dirs: Vec<PathBuf>,
    /// Per-installed-application template directories, consulted after
    /// `template_dirs`, in configured order.
    pub app_template_dirs: Vec<PathBuf>,
}

impl EngineConfig {
    /// Create a configuration from project and application directory lists.
    #[must_use]
    pub fn new(template_dirs: Vec<PathBuf>, app_template_dirs: Vec<PathBuf>) -> Self {
        Self {
            template_dirs,
            app_template_dirs,
        }
    }

    /// The full ordered search path: project directories, then application
    /// directories.
    ///
    /// Every entry is absolutized and lexically normalized. Some deployment
    /// environments report template directories with inconsistent separators or
    /// relative forms; normalizing here ensures the directory recorded on a
    /// template's origin compares equal to the corresponding search path entry.
    #[must_use]
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        self.template_dirs
            .iter()
            .chain(self.app_template_dirs.iter())
            .map(|dir| absolute_normalized(dir))
            .collect()
    }
}

/// Absolutize a path against the current working directory and normalize it
/// lexically.
pub(crate) fn absolute_normalized(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    normalize_path(&absolute)
}

/// Normalize a path lexically without touching the filesystem.
///
/// Removes `.` components and resolves `..` against the preceding component.
/// Unlike canonicalization this does not resolve symlinks and does not require
/// the path to exist.
#[must_use]
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {} // Skip .
            Component::ParentDir => {
                components.pop(); // Remove previous component for ..
            }
            c => components.push(c),
        }
    }

    components.iter().collect()
}
