//! Path sandbox
//!
//! Confines the file tools to a fixed set of root directories. Paths are
//! normalized lexically (`.` and `..` are folded, symlinks are not followed)
//! and a candidate is allowed only if it equals a root or sits below one on
//! a separator boundary, so `/workspace-evil` never matches `/workspace`.

use std::path::{Component, Path, PathBuf};

/// A fixed set of directories the file tools may touch
#[derive(Debug, Clone)]
pub struct PathSandbox {
    /// Absolute, normalized roots
    roots: Vec<PathBuf>,
}

impl PathSandbox {
    /// Create a sandbox from root paths, resolving relative roots against the current directory
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let base = current_dir_or_root();
        Self::with_base(&base, roots)
    }

    /// Create a sandbox resolving relative roots against `base`
    pub fn with_base<I, P>(base: &Path, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut resolved: Vec<PathBuf> = Vec::new();
        for root in roots {
            let root = resolve(base, root.as_ref());
            if !resolved.contains(&root) {
                resolved.push(root);
            }
        }
        Self { roots: resolved }
    }

    /// The resolved roots, in the order given
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Check whether `candidate` lies inside one of the roots
    ///
    /// Relative candidates are resolved against the current directory.
    pub fn is_allowed(&self, candidate: impl AsRef<Path>) -> bool {
        let base = current_dir_or_root();
        self.is_allowed_from(&base, candidate)
    }

    /// Same as [`is_allowed`](Self::is_allowed) with an explicit base for relative candidates
    pub fn is_allowed_from(&self, base: &Path, candidate: impl AsRef<Path>) -> bool {
        let candidate = resolve(base, candidate.as_ref());
        self.roots.iter().any(|root| candidate.starts_with(root))
    }
}

/// Standalone predicate over an explicit root list
pub fn is_path_allowed<P: AsRef<Path>>(candidate: impl AsRef<Path>, roots: &[P]) -> bool {
    PathSandbox::new(roots).is_allowed(candidate)
}

/// Make `path` absolute against `base` and fold `.`/`..` segments
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Lexically normalize a path
///
/// `..` at the root stays at the root, matching how the OS treats `/..`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let ends_in_parent =
                    matches!(out.components().next_back(), Some(Component::ParentDir));
                if ends_in_parent || (out.as_os_str().is_empty() && !out.has_root()) {
                    out.push("..");
                } else {
                    // pop() refuses to remove the root
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

fn current_dir_or_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
}
