//! Per-render exclusion bookkeeping for same-name template inheritance.
//!
//! The registry maps each template name to the ordered list of search
//! directories that have *not yet* contributed a file for that name during the
//! current render. Each time a scoped inheritance directive resolves a name, the
//! directory containing the file currently rendering is removed from that name's
//! list before the parent lookup runs, so the lookup lands on the next candidate
//! rather than the file that is already in the chain. Monotonic removal from an
//! ordered list is all that is needed here: the only cycle that can occur is
//! "same relative name resolves to a different physical file at each level", so
//! no dependency-graph cycle detection is involved.
//!
//! One registry exists per render pass. It is created fresh when a render starts
//! and dropped when it finishes, so concurrent renders never observe each
//! other's state and nothing accumulates process-wide.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::error::TemplateError;

/// Mapping from template name to its remaining, shrinking list of search
/// directories, scoped to one render pass.
#[derive(Debug, Default)]
pub(crate) struct ExclusionRegistry {
    dirs: HashMap<String, Vec<PathBuf>>,
}

impl ExclusionRegistry {
    /// Create an empty registry for a new render pass.
    pub(crate) fn new() -> Self {
        Self {
            dirs: HashMap::new(),
        }
    }

    /// Ensure `name` has a candidate list.
    ///
    /// On first use the entry is populated with the full ordered search path
    /// from `config`. An existing entry is left untouched: the list for a name
    /// is populated exactly once per render and only ever shrinks afterwards.
    pub(crate) fn populate(&mut self, name: &str, config: &EngineConfig) {
        if self.dirs.contains_key(name) {
            return;
        }
        let all_dirs = config.search_dirs();
        tracing::debug!(
            template = name,
            candidates = all_dirs.len(),
            "populating exclusion registry entry"
        );
        self.dirs.insert(name.to_string(), all_dirs);
    }

    /// Remove `directory` from `name`'s candidate list so it is skipped by
    /// subsequent lookups for the same name.
    ///
    /// Removes exactly one occurrence. The directory must be present; if it is
    /// not, the template was loaded from a source the search configuration does
    /// not cover, and rendering must fail rather than continue with corrupted
    /// bookkeeping.
    pub(crate) fn remove(&mut self, name: &str, directory: &Path) -> Result<(), TemplateError> {
        let missing = || TemplateError::UnsupportedOrigin {
            name: name.to_string(),
            directory: directory.to_path_buf(),
        };

        let candidates = self.dirs.get_mut(name).ok_or_else(missing)?;
        let position = candidates
            .iter()
            .position(|dir| dir == directory)
            .ok_or_else(missing)?;
        candidates.remove(position);

        tracing::debug!(
            template = name,
            directory = %directory.display(),
            remaining = candidates.len(),
            "excluded template directory"
        );
        Ok(())
    }

    /// The candidate directories still available for `name`, or `None` if the
    /// name has never been populated in this render.
    pub(crate) fn remaining(&self, name: &str) -> Option<&[PathBuf]> {
        self.dirs.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::new(
            vec![PathBuf::from("/proj/templates")],
            vec![PathBuf::from("/apps/a/templates"), PathBuf::from("/apps/b/templates")],
        )
    }

    #[test]
    fn test_populate_inserts_full_search_path_in_order() {
        let mut registry = ExclusionRegistry::new();
        registry.populate("x.html", &config());
        assert_eq!(
            registry.remaining("x.html").unwrap(),
            &[
                PathBuf::from("/proj/templates"),
                PathBuf::from("/apps/a/templates"),
                PathBuf::from("/apps/b/templates"),
            ]
        );
    }

    #[test]
    fn test_populate_does_not_reset_shrunk_entry() {
        let mut registry = ExclusionRegistry::new();
        registry.populate("x.html", &config());
        registry.remove("x.html", Path::new("/proj/templates")).unwrap();

        // A later use of the same name must reuse the shrunk entry.
        registry.populate("x.html", &config());
        assert_eq!(registry.remaining("x.html").unwrap().len(), 2);
    }

    #[test]
    fn test_remove_takes_exactly_one_directory() {
        let mut registry = ExclusionRegistry::new();
        registry.populate("x.html", &config());
        registry.remove("x.html", Path::new("/apps/a/templates")).unwrap();
        assert_eq!(
            registry.remaining("x.html").unwrap(),
            &[PathBuf::from("/proj/templates"), PathBuf::from("/apps/b/templates")]
        );
    }

    #[test]
    fn test_remove_unknown_directory_is_fatal() {
        let mut registry = ExclusionRegistry::new();
        registry.populate("x.html", &config());
        let err = registry.remove("x.html", Path::new("/nowhere")).unwrap_err();
        assert!(matches!(err, TemplateError::UnsupportedOrigin { .. }));
    }

    #[test]
    fn test_remove_without_populate_is_fatal() {
        let mut registry = ExclusionRegistry::new();
        let err = registry.remove("x.html", Path::new("/proj/templates")).unwrap_err();
        assert!(matches!(err, TemplateError::UnsupportedOrigin { .. }));
    }

    #[test]
    fn test_names_are_tracked_independently() {
        let mut registry = ExclusionRegistry::new();
        registry.populate("x.html", &config());
        registry.populate("y.html", &config());
        registry.remove("x.html", Path::new("/proj/templates")).unwrap();
        assert_eq!(registry.remaining("x.html").unwrap().len(), 2);
        assert_eq!(registry.remaining("y.html").unwrap().len(), 3);
        assert!(registry.remaining("z.html").is_none());
    }
}
