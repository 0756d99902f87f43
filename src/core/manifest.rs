//! Package manifest (`parcel.toml`).
//!
//! The manifest declares the package identity, the file-to-target-path
//! mappings packed directly from disk, and an optional build section from
//! which the build collaborator derives the reference graph.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::core::package::{ArchiveMember, MemberSource};
use crate::core::path::{ArchivePath, PathError};
use crate::types::{PackageIdentity, PackageName, Version};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("package name must not be empty")]
    EmptyName,

    #[error("invalid package version '{version}': {source}")]
    InvalidVersion {
        version: String,
        source: semver::Error,
    },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to read matched file: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("mapped source does not exist: {path}")]
    MissingSource { path: PathBuf },
}

/// The `[package]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMeta {
    pub name: PackageName,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
}

/// One `[[files]]` mapping from a disk source to an archive target path.
///
/// `source` may name a literal file, a directory (packed recursively), or a
/// glob pattern. A `target` ending in `/` (or empty) is treated as a
/// directory prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMapping {
    pub source: String,
    pub target: String,
}

/// The optional `[build]` section consumed by the build collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Subtree label for packaged outputs (`lib/<subtree>/...`).
    #[serde(default = "default_subtree")]
    pub subtree: String,
    /// The project's own build output, relative to the manifest directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Referenced projects whose outputs may be folded into the package.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceDecl>,
}

fn default_subtree() -> String {
    "any".to_string()
}

/// One `[[build.references]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDecl {
    /// Path to the referenced project's manifest, relative to this one.
    pub manifest: PathBuf,
    /// Whether the referenced output is folded into this package.
    #[serde(default = "default_true")]
    pub include: bool,
}

fn default_true() -> bool {
    true
}

/// A parsed `parcel.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub package: PackageMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSection>,
}

impl Manifest {
    /// Load and validate a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a manifest from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ManifestError> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serialize back to TOML for embedding in an archive.
    pub fn to_toml(&self) -> Result<String, ManifestError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The package identity declared by this manifest.
    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity::new(self.package.name.clone(), self.package.version.clone())
    }

    /// Replace the declared version, validating the new value.
    pub fn set_version(&mut self, version: &str) -> Result<(), ManifestError> {
        validate_version(version)?;
        self.package.version = Version::new(version);
        Ok(())
    }

    fn validate(&self) -> Result<(), ManifestError> {
        if self.package.name.is_empty() {
            return Err(ManifestError::EmptyName);
        }
        validate_version(self.package.version.as_str())?;
        Ok(())
    }

    /// Resolve the `[[files]]` mappings into archive members.
    ///
    /// `base` is the directory the manifest was loaded from; relative
    /// sources resolve against it.
    pub fn collect_entries(&self, base: &Path) -> Result<Vec<ArchiveMember>, ManifestError> {
        let mut members = Vec::new();
        for mapping in &self.files {
            mapping.collect(base, &mut members)?;
        }
        tracing::debug!("collected {} direct entries from manifest", members.len());
        Ok(members)
    }
}

fn validate_version(version: &str) -> Result<(), ManifestError> {
    semver::Version::parse(version).map_err(|source| ManifestError::InvalidVersion {
        version: version.to_string(),
        source,
    })?;
    Ok(())
}

impl FileMapping {
    fn collect(&self, base: &Path, out: &mut Vec<ArchiveMember>) -> Result<(), ManifestError> {
        if has_glob_meta(&self.source) {
            return self.collect_glob(base, out);
        }

        let source = base.join(&self.source);
        if source.is_dir() {
            self.collect_dir(&source, out)
        } else if source.is_file() {
            let target = if self.target.is_empty() || self.target.ends_with('/') {
                join_target(&self.target, &file_name_of(&source))
            } else {
                self.target.clone()
            };
            out.push(self.member(&source, &target)?);
            Ok(())
        } else {
            Err(ManifestError::MissingSource { path: source })
        }
    }

    fn collect_glob(&self, base: &Path, out: &mut Vec<ArchiveMember>) -> Result<(), ManifestError> {
        let pattern = base.join(&self.source);
        let mut matched = false;
        for entry in glob::glob(&pattern.to_string_lossy())? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }
            matched = true;
            let target = join_target(&self.target, &file_name_of(&path));
            out.push(self.member(&path, &target)?);
        }
        if !matched {
            tracing::warn!("file pattern '{}' matched nothing", self.source);
        }
        Ok(())
    }

    fn collect_dir(&self, source: &Path, out: &mut Vec<ArchiveMember>) -> Result<(), ManifestError> {
        for entry in WalkDir::new(source) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
            let target = join_target(&self.target, &slash_join(rel));
            out.push(self.member(entry.path(), &target)?);
        }
        Ok(())
    }

    fn member(&self, source: &Path, target: &str) -> Result<ArchiveMember, ManifestError> {
        let path = ArchivePath::new(target)?;
        Ok(
            ArchiveMember::new(path, MemberSource::File(source.to_path_buf()))
                .with_origin(format!("manifest entry '{}'", self.source)),
        )
    }
}

fn has_glob_meta(source: &str) -> bool {
    source.contains(['*', '?', '['])
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Join a target prefix and a relative name with forward slashes.
fn join_target(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Render a relative path with forward slashes regardless of platform.
fn slash_join(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
