//! Lexical path normalization.
//!
//! Instance paths supplied by callers may be relative, start with `~`, or
//! contain `.`/`..` components. Everything the supervisor writes into the
//! defaults file or hands to `mysqld` must be absolute, so every configured
//! path passes through [`absolutize`] exactly once during resolution.

use std::env;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Expand a leading `~` or `~/` to the home directory.
///
/// `~user` syntax is rejected.
///
/// # Errors
///
/// Returns [`Error::Path`] if the path is not UTF-8, the home directory is
/// unknown, or `~user` syntax is used.
///
/// # Examples
///
/// ```
/// use mysqltest::path::normalize::expand_tilde;
/// use std::path::Path;
///
/// let expanded = expand_tilde(Path::new("~/fixtures")).unwrap();
/// assert!(expanded.is_absolute());
/// assert_eq!(expand_tilde(Path::new("/srv")).unwrap(), Path::new("/srv"));
/// ```
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let Some(path_str) = path.to_str() else {
        return Ok(path.to_path_buf());
    };
    if !path_str.starts_with('~') {
        return Ok(path.to_path_buf());
    }

    let home = home::home_dir().ok_or_else(|| Error::Path {
        path: path.to_path_buf(),
        reason: "cannot determine home directory".to_string(),
    })?;

    match path_str {
        "~" => Ok(home),
        s if s.starts_with("~/") => Ok(home.join(&s[2..])),
        _ => Err(Error::Path {
            path: path.to_path_buf(),
            reason: "~user syntax is not supported; use ~ or ~/path".to_string(),
        }),
    }
}

/// Drop `.` components and fold `..` into the preceding component.
///
/// # Errors
///
/// Returns [`Error::Path`] when `..` would climb above the root.
///
/// # Examples
///
/// ```
/// use mysqltest::path::normalize::resolve_components;
/// use std::path::{Path, PathBuf};
///
/// let resolved = resolve_components(Path::new("/base/./tmp/../var")).unwrap();
/// assert_eq!(resolved, PathBuf::from("/base/var"));
/// ```
pub fn resolve_components(path: &Path) -> Result<PathBuf> {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                result.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() || result.as_os_str().is_empty() {
                    return Err(Error::Path {
                        path: path.to_path_buf(),
                        reason: "path contains too many '..' components".to_string(),
                    });
                }
            }
        }
    }

    Ok(result)
}

/// Make a path absolute: expand `~`, join relative paths onto the current
/// directory, then resolve `.` and `..`. Symlinks are not followed.
///
/// # Errors
///
/// Returns [`Error::Path`] if the path is empty, tilde expansion fails, the
/// current directory is unavailable, or `..` escapes the root.
///
/// # Examples
///
/// ```
/// use mysqltest::path::normalize::absolutize;
/// use std::path::Path;
///
/// let path = absolutize(Path::new("target/mysqltest")).unwrap();
/// assert!(path.is_absolute());
/// assert!(path.ends_with("target/mysqltest"));
/// ```
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::Path {
            path: path.to_path_buf(),
            reason: "path is empty".to_string(),
        });
    }

    let expanded = expand_tilde(path)?;
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        let cwd = env::current_dir().map_err(|e| Error::Path {
            path: path.to_path_buf(),
            reason: format!("cannot get current directory: {e}"),
        })?;
        cwd.join(expanded)
    };

    resolve_components(&absolute)
}
