//! Install location resolution.
//!
//! Maps a package identity to its on-disk install root and archive member
//! paths to absolute output paths beneath it. Member resolution re-checks
//! containment even though [`crate::core::path::ArchivePath`] already
//! rejects traversal, so a crafted archive cannot escape the root.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::path::ArchivePath;
use crate::types::PackageIdentity;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("member path '{path}' escapes install root '{root}'")]
    PathEscape { path: String, root: PathBuf },
}

/// Computes install roots beneath a base directory.
///
/// Distinct (name, version) pairs always map to distinct roots:
/// `<base>/<name>/<version>`.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    base: PathBuf,
}

impl InstallLayout {
    /// Create a layout rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The base directory all install roots live under.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The install root for one package identity.
    pub fn root_for(&self, identity: &PackageIdentity) -> PathBuf {
        self.base
            .join(identity.name().as_str())
            .join(identity.version().as_str())
    }

    /// Resolve an archive member path to an absolute path beneath `root`.
    ///
    /// Fails with [`ResolveError::PathEscape`] if any segment would step
    /// outside the root.
    pub fn member_path(root: &Path, member: &ArchivePath) -> Result<PathBuf, ResolveError> {
        let escape = || ResolveError::PathEscape {
            path: member.to_string(),
            root: root.to_path_buf(),
        };

        let mut resolved = root.to_path_buf();
        for segment in member.segments() {
            if segment == ".." || segment == "." || segment.contains(['/', '\\']) {
                return Err(escape());
            }
            resolved.push(segment);
        }
        if !resolved.starts_with(root) {
            return Err(escape());
        }
        Ok(resolved)
    }
}
