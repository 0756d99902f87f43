//! Archive extraction.
//!
//! Writes every policy-selected member of an opened archive beneath an
//! install root. Extraction is fail-fast: the first member failure aborts
//! the call, files already written stay on disk, and the returned list
//! names exactly the members that were actually and fully written.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::resolver::{InstallLayout, ResolveError};
use crate::core::savemode::SaveMode;
use crate::io::archive::{Parcel, ParcelError};
use crate::types::CancelToken;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error writing '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Escape(#[from] ResolveError),

    #[error(transparent)]
    Parcel(ParcelError),

    #[error("extraction cancelled")]
    Cancelled,
}

/// Extract the policy-selected members of `parcel` beneath `root`.
///
/// Members are processed in archive order; parent directories are created
/// as needed and no file handle outlives its member. With
/// [`SaveMode::RAW_ARCHIVE`] set, the archive file itself is copied into
/// the root after the interior members. The cancellation token is checked
/// between members; cancelling aborts further writes and leaves prior
/// writes in place.
pub fn extract(
    parcel: &mut Parcel,
    root: &Path,
    mode: SaveMode,
    cancel: &CancelToken,
) -> Result<Vec<PathBuf>, ExtractError> {
    fs::create_dir_all(root).map_err(|e| io_error(root.display(), e))?;

    let entries = parcel.entries().to_vec();
    let mut written = Vec::new();

    for entry in &entries {
        if cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }
        if !mode.selects(entry.category()) {
            tracing::trace!("skipping '{}' (excluded by save mode)", entry.path());
            continue;
        }

        let dest = InstallLayout::member_path(root, entry.path())?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(entry.path(), e))?;
        }

        let mut out = File::create(&dest).map_err(|e| io_error(entry.path(), e))?;
        parcel
            .copy_entry(entry.index(), &mut out)
            .map_err(|e| match e {
                ParcelError::Io(source) => io_error(entry.path(), source),
                other => ExtractError::Parcel(other),
            })?;
        drop(out);

        tracing::trace!("wrote {}", dest.display());
        written.push(dest);
    }

    if mode.contains(SaveMode::RAW_ARCHIVE) {
        if cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }
        let dest = root.join(parcel.identity().archive_file_name());
        fs::copy(parcel.path(), &dest).map_err(|e| io_error(dest.display(), e))?;
        written.push(dest);
    }

    tracing::debug!(
        "extracted {} members of {} into {}",
        written.len(),
        parcel.identity(),
        root.display()
    );
    Ok(written)
}

fn io_error(path: impl ToString, source: io::Error) -> ExtractError {
    ExtractError::Io {
        path: path.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assembler::Assembler;
    use crate::core::manifest::Manifest;
    use crate::core::package::{ArchiveMember, MemberSource};
    use crate::core::path::{ArchivePath, CONTENT_TYPES_PATH, MANIFEST_PATH};
    use tempfile::tempdir;

    fn build_archive(dir: &Path) -> PathBuf {
        let manifest = Manifest::from_toml(
            r#"
[package]
name = "widget"
version = "1.0.0"
"#,
        )
        .unwrap();
        let mut assembler = Assembler::new(manifest);
        for (path, bytes) in [
            ("content/readme.md", b"docs" as &[u8]),
            ("lib/any/widget.rlib", b"obj"),
            ("extras/notes.txt", b"misc"),
        ] {
            assembler
                .add_entry(ArchiveMember::new(
                    ArchivePath::new(path).unwrap(),
                    MemberSource::Bytes(bytes.to_vec()),
                ))
                .unwrap();
        }
        assembler.finish().unwrap().write_file(dir, &CancelToken::new()).unwrap()
    }

    fn relative_set(written: &[PathBuf], root: &Path) -> Vec<String> {
        let mut rel: Vec<String> = written
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        rel.sort_unstable();
        rel
    }

    #[test]
    fn test_full_extraction_writes_everything() {
        let dir = tempdir().unwrap();
        let archive = build_archive(dir.path());
        let root = dir.path().join("out");

        let mut parcel = Parcel::open(&archive).unwrap();
        let written = extract(
            &mut parcel,
            &root,
            SaveMode::install_default(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(written.len(), 5);
        assert!(root.join("content/readme.md").is_file());
        assert!(root.join("lib/any/widget.rlib").is_file());
        assert_eq!(
            std::fs::read(root.join("content/readme.md")).unwrap(),
            b"docs"
        );
        // Every reported path exists on disk
        assert!(written.iter().all(|p| p.is_file()));
    }

    #[test]
    fn test_manifest_only_skips_content() {
        let dir = tempdir().unwrap();
        let archive = build_archive(dir.path());
        let root = dir.path().join("out");

        let mut parcel = Parcel::open(&archive).unwrap();
        let written = extract(&mut parcel, &root, SaveMode::MANIFEST, &CancelToken::new()).unwrap();

        assert_eq!(
            relative_set(&written, &root),
            vec![CONTENT_TYPES_PATH.to_string(), MANIFEST_PATH.to_string()]
        );
        assert!(!root.join("content/readme.md").exists());
        assert!(!root.join("extras/notes.txt").exists());
    }

    #[test]
    fn test_raw_archive_flag_copies_archive_file() {
        let dir = tempdir().unwrap();
        let archive = build_archive(dir.path());
        let root = dir.path().join("out");

        let mut parcel = Parcel::open(&archive).unwrap();
        let written = extract(
            &mut parcel,
            &root,
            SaveMode::MANIFEST | SaveMode::RAW_ARCHIVE,
            &CancelToken::new(),
        )
        .unwrap();

        let raw = root.join("widget-1.0.0.parcel");
        assert!(raw.is_file());
        assert_eq!(written.last().unwrap(), &raw);
    }

    #[test]
    fn test_empty_mode_writes_nothing() {
        let dir = tempdir().unwrap();
        let archive = build_archive(dir.path());
        let root = dir.path().join("out");

        let mut parcel = Parcel::open(&archive).unwrap();
        let written = extract(&mut parcel, &root, SaveMode::empty(), &CancelToken::new()).unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn test_idempotent_across_fresh_roots() {
        let dir = tempdir().unwrap();
        let archive = build_archive(dir.path());
        let root_a = dir.path().join("a");
        let root_b = dir.path().join("b");

        let mut parcel = Parcel::open(&archive).unwrap();
        let first = extract(
            &mut parcel,
            &root_a,
            SaveMode::install_default(),
            &CancelToken::new(),
        )
        .unwrap();
        let second = extract(
            &mut parcel,
            &root_b,
            SaveMode::install_default(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(relative_set(&first, &root_a), relative_set(&second, &root_b));
    }

    #[test]
    fn test_pre_cancelled_token_aborts_before_writing() {
        let dir = tempdir().unwrap();
        let archive = build_archive(dir.path());
        let root = dir.path().join("out");

        let cancel = CancelToken::new();
        cancel.cancel();

        let mut parcel = Parcel::open(&archive).unwrap();
        let err = extract(&mut parcel, &root, SaveMode::install_default(), &cancel).unwrap_err();
        assert!(matches!(err, ExtractError::Cancelled));
        assert!(!root.join(MANIFEST_PATH).exists());
    }
}
