//! Reading `.parcel` archives.
//!
//! A [`Parcel`] wraps an opened zip container: the validated member list,
//! the embedded manifest, and access to member content. Member paths are
//! normalized through [`ArchivePath`] on open, so a crafted archive with
//! traversal sequences is rejected before anything touches the disk.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

use crate::core::manifest::{Manifest, ManifestError};
use crate::core::package::Category;
use crate::core::path::{ArchivePath, MANIFEST_PATH, PathError};
use crate::types::PackageIdentity;

#[derive(Error, Debug)]
pub enum ParcelError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("archive error: {0}")]
    Archive(String),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("duplicate archive member '{0}'")]
    DuplicateMember(String),

    #[error("archive is missing its manifest ({MANIFEST_PATH})")]
    MissingManifest,

    #[error("invalid manifest in archive: {0}")]
    Manifest(#[from] ManifestError),
}

/// One member of an opened archive.
#[derive(Debug, Clone)]
pub struct ParcelEntry {
    path: ArchivePath,
    index: usize,
    category: Category,
    size: u64,
}

impl ParcelEntry {
    /// The member's normalized path.
    pub fn path(&self) -> &ArchivePath {
        &self.path
    }

    /// Index of the member inside the zip container.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The member's save-mode category.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Whether this is a reserved metadata member.
    pub fn is_reserved(&self) -> bool {
        self.path.is_reserved()
    }

    /// Uncompressed size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// An opened package archive.
pub struct Parcel {
    path: PathBuf,
    zip: ZipArchive<File>,
    entries: Vec<ParcelEntry>,
    manifest: Manifest,
}

impl Parcel {
    /// Open an archive and validate its member list.
    ///
    /// Fails if any member path is malformed, if two members share one
    /// normalized path, or if the embedded manifest is missing or invalid.
    pub fn open(path: &Path) -> Result<Self, ParcelError> {
        let file = File::open(path)?;
        let mut zip =
            ZipArchive::new(file).map_err(|e| ParcelError::Archive(e.to_string()))?;

        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut manifest_index = None;

        for index in 0..zip.len() {
            let (name, size, is_dir) = {
                let entry = zip
                    .by_index(index)
                    .map_err(|e| ParcelError::Archive(e.to_string()))?;
                (entry.name().to_string(), entry.size(), entry.is_dir())
            };
            if is_dir {
                continue;
            }

            let member = ArchivePath::new(&name)?;
            if !seen.insert(member.clone()) {
                return Err(ParcelError::DuplicateMember(name));
            }
            if member.key() == MANIFEST_PATH {
                manifest_index = Some(index);
            }
            entries.push(ParcelEntry {
                category: Category::of(&member),
                path: member,
                index,
                size,
            });
        }

        let manifest_index = manifest_index.ok_or(ParcelError::MissingManifest)?;
        let mut text = String::new();
        zip.by_index(manifest_index)
            .map_err(|e| ParcelError::Archive(e.to_string()))?
            .read_to_string(&mut text)?;
        let manifest = Manifest::from_toml(&text)?;

        tracing::debug!(
            "opened {} with {} members",
            path.display(),
            entries.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            zip,
            entries,
            manifest,
        })
    }

    /// Where the archive file lives on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The embedded manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The package identity declared by the embedded manifest.
    pub fn identity(&self) -> PackageIdentity {
        self.manifest.identity()
    }

    /// The validated member list, in archive order.
    pub fn entries(&self) -> &[ParcelEntry] {
        &self.entries
    }

    /// Stream one member's content into `writer`.
    pub fn copy_entry(&mut self, index: usize, writer: &mut impl Write) -> Result<u64, ParcelError> {
        let mut entry = self
            .zip
            .by_index(index)
            .map_err(|e| ParcelError::Archive(e.to_string()))?;
        Ok(io::copy(&mut entry, writer)?)
    }
}
