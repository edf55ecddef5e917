//! Single-hop symlink resolution.
//!
//! Both the instance base directory and the `mysql_install_db` location are
//! resolved through at most one level of symlink indirection. Deeper chains
//! are left alone on purpose: the result only has to be stable, not canonical.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Follow `path` through one symlink, if it is one.
///
/// Relative link targets are interpreted against the directory containing
/// the link. Paths that are not symlinks, or that do not exist yet, are
/// returned unchanged.
///
/// # Errors
///
/// Returns [`Error::Path`] if the path cannot be inspected or the link
/// cannot be read.
///
/// # Examples
///
/// ```no_run
/// use mysqltest::path::symlink::resolve_once;
/// use std::path::Path;
///
/// let target = resolve_once(Path::new("/usr/bin/mysql_install_db")).unwrap();
/// assert!(target.is_absolute());
/// ```
pub fn resolve_once(path: &Path) -> Result<PathBuf> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(path.to_path_buf()),
        Err(e) => {
            return Err(Error::Path {
                path: path.to_path_buf(),
                reason: format!("failed to stat: {e}"),
            })
        }
    };

    if !metadata.file_type().is_symlink() {
        return Ok(path.to_path_buf());
    }

    let target = fs::read_link(path).map_err(|e| Error::Path {
        path: path.to_path_buf(),
        reason: format!("failed to readlink: {e}"),
    })?;

    if target.is_absolute() {
        return Ok(target);
    }

    let parent = path.parent().ok_or_else(|| Error::Path {
        path: path.to_path_buf(),
        reason: "symlink has no parent directory".to_string(),
    })?;
    super::normalize::resolve_components(&parent.join(target))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    #[test]
    fn test_plain_directory_unchanged() {
        let dir = tempdir().unwrap();
        assert_eq!(resolve_once(dir.path()).unwrap(), dir.path());
    }

    #[test]
    fn test_missing_path_unchanged() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("not-yet-created");
        assert_eq!(resolve_once(&missing).unwrap(), missing);
    }

    #[test]
    fn test_absolute_link_followed() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        symlink(&real, &link).unwrap();

        assert_eq!(resolve_once(&link).unwrap(), real);
    }

    #[test]
    fn test_relative_link_joined_to_parent() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("mysql/bin")).unwrap();
        fs::write(dir.path().join("mysql/bin/mysql_install_db"), "").unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        let link = dir.path().join("bin/mysql_install_db");
        symlink("../mysql/bin/mysql_install_db", &link).unwrap();

        assert_eq!(
            resolve_once(&link).unwrap(),
            dir.path().join("mysql/bin/mysql_install_db")
        );
    }

    #[test]
    fn test_only_one_hop_followed() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        symlink(&real, &first).unwrap();
        symlink(&first, &second).unwrap();

        assert_eq!(resolve_once(&second).unwrap(), first);
    }
}
