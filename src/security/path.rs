use crate::tools::ToolError;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// What a tool intends to do with a path; only used to word the escape error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    List,
    Write,
    Execute,
}

impl Access {
    pub fn verb(self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::List => "list",
            Access::Write => "write to",
            Access::Execute => "execute",
        }
    }
}

/// Normalize a path by resolving `.` and `..` components without touching the filesystem.
/// Unlike `canonicalize()`, this works even if the path doesn't exist.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {} // can't go above root
                Some(Component::ParentDir) | None => components.push(component),
                Some(_) => {
                    components.pop();
                }
            },
            _ => components.push(component),
        }
    }

    let mut result = PathBuf::new();
    for c in &components {
        result.push(c.as_os_str());
    }
    if result.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        result
    }
}

/// Canonicalize the deepest existing ancestor of `logical` and re-append the
/// components that do not exist yet. Returns `None` when a component is a
/// dangling symlink, since its eventual target cannot be checked.
fn canonicalize_existing(logical: &Path) -> Option<PathBuf> {
    let mut tail: Vec<&OsStr> = Vec::new();
    let mut current = logical;

    loop {
        match std::fs::canonicalize(current) {
            Ok(mut resolved) => {
                for part in tail.iter().rev() {
                    resolved.push(part);
                }
                return Some(resolved);
            }
            Err(_) => {
                if std::fs::symlink_metadata(current).is_ok() {
                    return None;
                }
                tail.push(current.file_name()?);
                current = current.parent()?;
            }
        }
    }
}

/// Component-wise containment: `/a/b` contains `/a/b` and `/a/b/c`, but not `/a/bcd`.
pub fn contains(boundary: &Path, target: &Path) -> bool {
    target.starts_with(boundary)
}

/// Confines path arguments to a single canonical directory.
#[derive(Debug, Clone)]
pub struct PathGuard {
    boundary: PathBuf,
}

impl PathGuard {
    pub fn new(boundary: impl AsRef<Path>) -> Result<Self, ToolError> {
        let boundary = boundary.as_ref();
        let canonical = std::fs::canonicalize(boundary).map_err(|e| {
            ToolError::io(
                format!("Cannot open working directory '{}'", boundary.display()),
                e,
            )
        })?;
        if !canonical.is_dir() {
            return Err(ToolError::NotADirectory(boundary.display().to_string()));
        }
        Ok(Self {
            boundary: canonical,
        })
    }

    pub fn boundary(&self) -> &Path {
        &self.boundary
    }

    /// Resolve `relative` against the boundary and reject anything that lands outside it.
    pub fn resolve(&self, relative: &str, access: Access) -> Result<PathBuf, ToolError> {
        let escape = || ToolError::OutOfBoundary {
            action: access.verb(),
            path: relative.to_string(),
        };

        let logical = normalize_path(&self.boundary.join(relative));
        let resolved = canonicalize_existing(&logical).ok_or_else(escape)?;

        if contains(&self.boundary, &resolved) {
            Ok(resolved)
        } else {
            tracing::warn!(
                path = relative,
                boundary = %self.boundary.display(),
                "rejected path outside working directory"
            );
            Err(escape())
        }
    }
}
