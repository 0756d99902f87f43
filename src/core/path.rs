//! Archive member path identity.
//!
//! Producers and consumers of an archive run on filesystems with differing
//! case sensitivity, so member identity is defined once here: lowercased,
//! forward-slash relative paths. Collision detection everywhere else goes
//! through this type.

use thiserror::Error;

/// Fixed location of the package manifest inside an archive.
pub const MANIFEST_PATH: &str = "parcel.toml";

/// Fixed location of the content-type descriptor inside an archive.
pub const CONTENT_TYPES_PATH: &str = ".parcel/content-types.toml";

/// Archive members that carry package-level metadata. These live at fixed
/// locations and are never user-overridable.
const RESERVED: [&str; 2] = [MANIFEST_PATH, CONTENT_TYPES_PATH];

#[derive(Error, Debug)]
pub enum PathError {
    #[error("invalid archive path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },
}

impl PathError {
    fn invalid(path: &str, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }
}

/// A validated, normalized archive member path.
///
/// Keeps the original-case spelling (with separators canonicalized to `/`)
/// for display and writing, and a lowercased key for identity. Equality and
/// hashing use the key only, so paths differing only by case are the same
/// member.
///
/// # Example
///
/// ```
/// use parcel::core::path::ArchivePath;
///
/// let a = ArchivePath::new("lib/any/Assembly.xml").unwrap();
/// let b = ArchivePath::new("lib/any/Assembly.XML").unwrap();
/// assert_eq!(a, b);
/// assert!(ArchivePath::new("../escape").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ArchivePath {
    raw: String,
    key: String,
}

impl ArchivePath {
    /// Normalize and validate a member path.
    ///
    /// Canonicalizes `\` to `/`, then rejects empty paths, absolute paths
    /// (leading separator or drive prefix), and `.`/`..` segments.
    pub fn new(path: impl AsRef<str>) -> Result<Self, PathError> {
        let original = path.as_ref();
        let raw = original.replace('\\', "/");

        if raw.is_empty() {
            return Err(PathError::invalid(original, "empty path"));
        }
        if raw.starts_with('/') {
            return Err(PathError::invalid(original, "absolute path"));
        }
        if raw.as_bytes().get(1) == Some(&b':') {
            return Err(PathError::invalid(original, "absolute path"));
        }
        for segment in raw.split('/') {
            match segment {
                "" => return Err(PathError::invalid(original, "empty path segment")),
                "." | ".." => {
                    return Err(PathError::invalid(original, "path traversal segment"));
                }
                _ => {}
            }
        }

        let key = raw.to_lowercase();
        Ok(Self { raw, key })
    }

    /// The slash-normalized, original-case spelling.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The lowercased identity key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether this path addresses a reserved metadata member.
    pub fn is_reserved(&self) -> bool {
        RESERVED.contains(&self.key.as_str())
    }

    /// Iterate over the path segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('/')
    }

    /// Lowercased file extension of the final segment, if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.key.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() { None } else { Some(ext) }
    }
}

impl PartialEq for ArchivePath {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ArchivePath {}

impl std::hash::Hash for ArchivePath {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl std::fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}
