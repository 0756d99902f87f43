//! Archive member model.
//!
//! An [`ArchiveMember`] is one logical file entry inside a package archive:
//! a normalized path plus a content source. Content may be held in memory or
//! read lazily from disk when the archive is written.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

use crate::core::path::ArchivePath;

/// Member category used by the save-mode filter at extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Reserved metadata members (the manifest and the content-type
    /// descriptor).
    Manifest,
    /// Package payload under `content/` or `lib/`.
    Content,
    /// Anything else the manifest mapped into the archive.
    Other,
}

impl Category {
    /// Classify a member path. Reserved paths are always `Manifest`.
    pub fn of(path: &ArchivePath) -> Self {
        if path.is_reserved() {
            Self::Manifest
        } else if path.key().starts_with("content/") || path.key().starts_with("lib/") {
            Self::Content
        } else {
            Self::Other
        }
    }
}

/// Where a member's bytes come from.
#[derive(Debug, Clone)]
pub enum MemberSource {
    /// Content held in memory (reserved members, generated descriptors).
    Bytes(Vec<u8>),
    /// Content read from disk when compared or written.
    File(PathBuf),
}

impl MemberSource {
    /// Content length in bytes without reading the content itself.
    pub fn len(&self) -> io::Result<u64> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.len() as u64),
            Self::File(path) => Ok(std::fs::metadata(path)?.len()),
        }
    }

    /// Whether the content is empty.
    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Open the content for reading. Files are opened read-only, so a
    /// read-only source behaves the same as a writable one.
    pub fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        match self {
            Self::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            Self::File(path) => Ok(Box::new(File::open(path)?)),
        }
    }

    /// Human-readable description for duplicate reports.
    pub fn describe(&self) -> String {
        match self {
            Self::Bytes(_) => "inline data".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// One logical file entry inside a package archive.
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    path: ArchivePath,
    source: MemberSource,
    category: Category,
    reserved: bool,
    origin: String,
}

impl ArchiveMember {
    /// Create a member; category and reserved flag derive from the path.
    pub fn new(path: ArchivePath, source: MemberSource) -> Self {
        let category = Category::of(&path);
        let reserved = path.is_reserved();
        let origin = source.describe();
        Self {
            path,
            source,
            category,
            reserved,
            origin,
        }
    }

    /// Replace the origin description used in duplicate reports.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// The member's normalized path.
    pub fn path(&self) -> &ArchivePath {
        &self.path
    }

    /// The member's content source.
    pub fn source(&self) -> &MemberSource {
        &self.source
    }

    /// The member's save-mode category.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Whether this is a reserved metadata member.
    pub fn is_reserved(&self) -> bool {
        self.reserved
    }

    /// Where this member came from, for duplicate reports.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}
