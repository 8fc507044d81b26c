//! Mapping request paths onto the filesystem.

use std::path::{Component, Path, PathBuf};

use writer_protocol::{ErrorKind, Failure};

fn expand_home(raw: &str) -> PathBuf {
    let home = || dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
    if raw == "~" {
        home()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home().join(rest)
    } else {
        PathBuf::from(raw)
    }
}

/// Drop `.` and fold `..` without touching the filesystem, so a path that
/// does not exist yet still gets a stable key.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves absolute, `~/`-prefixed and root-relative paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(document_root: &str) -> Self {
        let root = expand_home(document_root);
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        };
        Self {
            root: normalize(&root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, raw: &str) -> Result<PathBuf, Failure> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Failure::new(ErrorKind::InvalidArgument, "path must not be empty"));
        }
        let path = expand_home(trimmed);
        let absolute = if path.is_absolute() {
            path
        } else {
            self.root.join(path)
        };
        Ok(normalize(&absolute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn relative_paths_land_under_the_root() {
        let resolver = PathResolver::new("/srv/docs");
        assert_eq!(
            resolver.resolve("reports/q1.odt").unwrap(),
            PathBuf::from("/srv/docs/reports/q1.odt")
        );
        assert_eq!(
            resolver.resolve("/tmp/./a/../b.odt").unwrap(),
            PathBuf::from("/tmp/b.odt")
        );
    }

    #[test]
    fn tilde_expands_to_home() {
        let Some(home) = dirs::home_dir() else { return };
        let resolver = PathResolver::new("~/Documents");
        assert_eq!(resolver.root(), normalize(&home.join("Documents")));
        assert_eq!(resolver.resolve("~/x.odt").unwrap(), normalize(&home.join("x.odt")));
    }

    #[test]
    fn empty_paths_are_invalid() {
        let err = PathResolver::new("/srv").resolve("  ").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }
}
