//! Path handling for instance layouts.
//!
//! Two concerns live here:
//!
//! - [`normalize`]: lexical normalization (`~` expansion, relative to
//!   absolute, `.`/`..` folding) applied to every caller-supplied path.
//! - [`symlink`]: single-hop symlink resolution, used for the instance base
//!   directory and for locating the install prefix of `mysql_install_db`.
//!
//! # Examples
//!
//! ```
//! use mysqltest::path::{absolutize, is_nested_under};
//! use std::path::Path;
//!
//! let base = absolutize(Path::new("/tmp/mysqltest")).unwrap();
//! assert!(is_nested_under(&base.join("tmp/mysql.sock"), &base));
//! ```

pub mod normalize;
pub mod symlink;

#[cfg(all(test, feature = "property-tests"))]
mod proptests;

use std::path::Path;

pub use normalize::absolutize;
pub use symlink::resolve_once;

/// Returns `true` if `path` lies strictly below `base`.
#[must_use]
pub fn is_nested_under(path: &Path, base: &Path) -> bool {
    path != base && path.starts_with(base)
}
