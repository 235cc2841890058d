//! Path helpers shared by the settings resolver and the factories.
//!
//! Settings carry paths as strings; these expand `~` and `${VAR}` and anchor
//! relative paths at the project root.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// `$VAR`/`${VAR}` and a leading `~` expanded; unknown variables are left
/// as written. Not canonicalized.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    let with_vars = shellexpand::env(raw).unwrap_or(Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_vars).into_owned())
}

/// `p` expanded, then joined onto `base` unless already absolute.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

/// Create `dir` and its parents if missing, returning the path unchanged.
pub fn ensure_dir(dir: &Path) -> std::io::Result<&Path> {
    std::fs::create_dir_all(dir)?;
    Ok(dir)
}
