//! # Path confinement
//!
//! Every path a tool touches goes through [`PathGuard::resolve`]. The guard joins
//! the model-supplied path onto the working root, normalizes it lexically and
//! rejects anything that does not stay under the root.
//!
//! The check is lexical: symlinks are not followed, so a link inside the root
//! that points elsewhere is not caught. This is advisory confinement, not an OS
//! sandbox.

use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Resolves model-supplied relative paths against a fixed working root.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Create a guard for `root`. Relative roots are anchored at the current
    /// directory; the stored root is absolute and normalized.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = absolute(root.as_ref())
            .map_err(|e| e.with_operation("guard::new"))?;
        Ok(Self { root })
    }

    /// The normalized absolute working root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` under the root.
    ///
    /// `action` only flavors the error message ("read", "list", ...). Absolute
    /// inputs replace the root when joined, exactly like `Path::join`, and are
    /// then rejected unless they happen to point inside it.
    pub fn resolve(&self, action: &str, relative: &str) -> Result<PathBuf> {
        let candidate = normalize(&self.root.join(relative));
        if candidate.starts_with(&self.root) {
            Ok(candidate)
        } else {
            Err(Error::outside_working_root(action, relative)
                .with_operation("guard::resolve")
                .with_context("root", self.root.display().to_string()))
        }
    }

    /// Whether `relative` stays under the root
    pub fn contains(&self, relative: &str) -> bool {
        self.resolve("access", relative).is_ok()
    }
}

/// Make `path` absolute and normalized without touching the filesystem
/// beyond reading the current directory.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    let cwd = std::env::current_dir()?;
    Ok(normalize(&cwd.join(path)))
}

/// Lexically resolve `.` and `..` components. `..` never climbs above the
/// filesystem root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
