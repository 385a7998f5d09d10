//! Import path resolution shared by both back ends.
//!
//! Paths are interpreted relative to the importing module's base directory;
//! absolute paths are used verbatim. Resolved paths are lexically
//! normalized so one file imported through different relative spellings
//! caches under a single key.

use std::path::{Component, Path, PathBuf};

use crate::error::{RafError, RafResult};

/// Resolves an import path literal against the importing module's base
/// directory (falling back to the working directory).
pub(crate) fn resolve_import_path(base_dir: Option<&Path>, path: &Path) -> RafResult<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let base = match base_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|err| RafError::runtime(format!("cannot determine working directory: {err}")))?,
    };
    Ok(normalize_path(&base.join(path)))
}

/// Resolves `.` and `..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn absolute_paths_are_used_verbatim() {
        let resolved = resolve_import_path(Some(Path::new("/elsewhere")), Path::new("/lib/math.raf")).unwrap();
        assert_eq!(resolved, PathBuf::from("/lib/math.raf"));
    }

    #[test]
    fn relative_paths_join_the_base_directory() {
        let resolved = resolve_import_path(Some(Path::new("/proj")), Path::new("lib/math.raf")).unwrap();
        assert_eq!(resolved, PathBuf::from("/proj/lib/math.raf"));
    }

    #[test]
    fn dots_are_normalized() {
        let resolved = resolve_import_path(Some(Path::new("/proj/sub")), Path::new("../lib/./math.raf")).unwrap();
        assert_eq!(resolved, PathBuf::from("/proj/lib/math.raf"));
        assert_eq!(normalize_path(Path::new("a/b/../c")), PathBuf::from("a/c"));
    }
}
