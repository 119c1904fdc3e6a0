//! View name resolution.
//!
//! Path-resolution conventions live outside the compiler core: the engine
//! only needs a collaborator that turns a view name into a candidate file
//! path. Existence is checked by the engine itself so that a missing view
//! or partial surfaces uniformly as a 404-carrying NotFound error.

use std::path::{Path, PathBuf};

/// Collaborator translating view names to source file paths.
pub trait ViewResolver {
    /// Candidate source path for a view name. The file need not exist;
    /// the engine checks and raises NotFound when it does not.
    fn source_path(&self, name: &str) -> PathBuf;
}

/// Resolver mapping `name` to `<root>/<name>.tpl`.
///
/// View names may contain slashes (`partials/header`), which become
/// subdirectories under the root.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ViewResolver for DirectoryResolver {
    fn source_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.tpl"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_names_to_tpl_files() {
        let resolver = DirectoryResolver::new("/srv/theme/views");
        assert_eq!(
            resolver.source_path("home"),
            PathBuf::from("/srv/theme/views/home.tpl")
        );
    }

    #[test]
    fn slashes_become_subdirectories() {
        let resolver = DirectoryResolver::new("/srv/theme/views");
        assert_eq!(
            resolver.source_path("partials/header"),
            PathBuf::from("/srv/theme/views/partials/header.tpl")
        );
    }
}
