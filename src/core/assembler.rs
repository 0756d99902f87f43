//! Archive assembly.
//!
//! Merges manifest-declared entries and graph-discovered build outputs into
//! a single member list, de-duplicating by path identity, then serializes
//! the finished archive into a zip container. Duplicate resolution is a
//! tagged outcome rather than an error path, so every conflict in a batch
//! is reported at once.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::core::graph::CollectedOutput;
use crate::core::manifest::{Manifest, ManifestError};
use crate::core::package::{ArchiveMember, MemberSource};
use crate::core::path::{ArchivePath, CONTENT_TYPES_PATH, MANIFEST_PATH, PathError};
use crate::io::content::content_equals;
use crate::types::{CancelToken, PackageIdentity};

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("entry '{path}' collides with a reserved archive member")]
    ReservedPath { path: String },

    #[error("duplicate archive entries with conflicting content:\n{}", format_conflicts(.0))]
    DuplicateConflict(Vec<Conflict>),

    #[error("assembly cancelled")]
    Cancelled,
}

/// One unresolved path collision: two distinct-content sources mapped to
/// the same identity.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// The colliding normalized path (as first seen).
    pub path: String,
    /// Description of the entry already in the archive.
    pub existing: String,
    /// Description of the entry that collided with it.
    pub incoming: String,
}

fn format_conflicts(conflicts: &[Conflict]) -> String {
    conflicts
        .iter()
        .map(|c| format!("  '{}': {} vs {}", c.path, c.existing, c.incoming))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Outcome of merging one entry into the member list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The path was unseen; the entry was added.
    Inserted,
    /// An identical-content entry already holds the path; nothing added.
    SkippedIdentical,
    /// A distinct-content entry holds the path; recorded for batch report.
    Conflict,
}

/// Builds the member list for one package archive.
pub struct Assembler {
    manifest: Manifest,
    identity: PackageIdentity,
    members: Vec<ArchiveMember>,
    index: HashMap<ArchivePath, usize>,
    conflicts: Vec<Conflict>,
}

impl Assembler {
    /// Start assembling an archive for the given manifest.
    pub fn new(manifest: Manifest) -> Self {
        let identity = manifest.identity();
        Self {
            manifest,
            identity,
            members: Vec::new(),
            index: HashMap::new(),
            conflicts: Vec::new(),
        }
    }

    /// The identity of the package being assembled.
    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    /// Merge one entry, in input order.
    ///
    /// An unseen path is inserted. A path already present with identical
    /// content is skipped; this covers a manifest-declared file and a
    /// build-discovered file that differ only by case. A path already
    /// present with different content records a conflict; `finish` reports
    /// the whole batch. Reserved paths are rejected outright.
    pub fn add_entry(&mut self, member: ArchiveMember) -> Result<MergeOutcome, AssembleError> {
        if member.path().is_reserved() {
            return Err(AssembleError::ReservedPath {
                path: member.path().to_string(),
            });
        }

        match self.index.get(member.path()) {
            None => {
                self.index.insert(member.path().clone(), self.members.len());
                self.members.push(member);
                Ok(MergeOutcome::Inserted)
            }
            Some(&existing) => {
                let held = &self.members[existing];
                if content_equals(held.source(), member.source())? {
                    tracing::debug!(
                        "skipping '{}': identical content already packed from {}",
                        member.path(),
                        held.origin()
                    );
                    Ok(MergeOutcome::SkippedIdentical)
                } else {
                    self.conflicts.push(Conflict {
                        path: held.path().to_string(),
                        existing: held.origin().to_string(),
                        incoming: member.origin().to_string(),
                    });
                    Ok(MergeOutcome::Conflict)
                }
            }
        }
    }

    /// Merge a batch of graph-collected build outputs.
    ///
    /// Each output is placed under the per-target subtree:
    /// `lib/<subtree>/<file name>`.
    pub fn add_outputs(
        &mut self,
        outputs: impl IntoIterator<Item = CollectedOutput>,
    ) -> Result<(), AssembleError> {
        for collected in outputs {
            let file_name = collected
                .output
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| PathError::InvalidPath {
                    path: collected.output.file.display().to_string(),
                    reason: "build output has no file name",
                })?;
            let path = ArchivePath::new(format!(
                "lib/{}/{}",
                collected.output.subtree, file_name
            ))?;
            let member = ArchiveMember::new(path, MemberSource::File(collected.output.file.clone()))
                .with_origin(format!("build output of '{}'", collected.node));
            self.add_entry(member)?;
        }
        Ok(())
    }

    /// Finalize the member list into an [`Archive`].
    ///
    /// Fails with every recorded conflict if any collision was left
    /// unresolved. Reserved members (the serialized manifest and the
    /// generated content-type descriptor) are injected here, exactly once;
    /// ordinary members are ordered by normalized path so the finished
    /// archive does not depend on entry order.
    pub fn finish(mut self) -> Result<Archive, AssembleError> {
        if !self.conflicts.is_empty() {
            return Err(AssembleError::DuplicateConflict(self.conflicts));
        }

        self.members.sort_by(|a, b| a.path().key().cmp(b.path().key()));

        let types = content_types_descriptor(&self.members)?;
        let manifest_member = ArchiveMember::new(
            ArchivePath::new(MANIFEST_PATH)?,
            MemberSource::Bytes(self.manifest.to_toml()?.into_bytes()),
        )
        .with_origin("package manifest");
        let types_member = ArchiveMember::new(
            ArchivePath::new(CONTENT_TYPES_PATH)?,
            MemberSource::Bytes(types.into_bytes()),
        )
        .with_origin("content-type descriptor");

        let mut members = vec![manifest_member, types_member];
        members.append(&mut self.members);

        tracing::debug!(
            "assembled {} members for {}",
            members.len(),
            self.identity
        );
        Ok(Archive {
            identity: self.identity,
            members,
        })
    }
}

#[derive(Serialize)]
struct ContentTypes {
    default: String,
    types: BTreeMap<String, String>,
}

/// Generate the reserved content-type descriptor for the final member set.
fn content_types_descriptor(members: &[ArchiveMember]) -> Result<String, AssembleError> {
    let mut types = BTreeMap::new();
    types.insert("toml".to_string(), content_type_for("toml").to_string());
    for member in members {
        if let Some(ext) = member.path().extension() {
            types.insert(ext.to_string(), content_type_for(ext).to_string());
        }
    }
    let descriptor = ContentTypes {
        default: "application/octet-stream".to_string(),
        types,
    };
    toml::to_string_pretty(&descriptor)
        .map_err(ManifestError::from)
        .map_err(AssembleError::from)
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "toml" => "text/x-toml",
        "txt" | "md" => "text/plain",
        "xml" => "text/xml",
        "html" => "text/html",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// A finished, immutable archive: ordered members ready to serialize.
#[derive(Debug)]
pub struct Archive {
    identity: PackageIdentity,
    members: Vec<ArchiveMember>,
}

impl Archive {
    /// The archive's package identity.
    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    /// The ordered member list (reserved metadata first).
    pub fn members(&self) -> &[ArchiveMember] {
        &self.members
    }

    /// Serialize into a zip container.
    ///
    /// Member timestamps are pinned so identical member sets produce
    /// identical archives. The cancellation token is checked between
    /// members; cancelling aborts further writes.
    pub fn write_to(
        &self,
        writer: impl Write + Seek,
        cancel: &CancelToken,
    ) -> Result<(), AssembleError> {
        let mut zip = ZipWriter::new(writer);
        let timestamp = zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0)
            .map_err(|e| AssembleError::Archive(e.to_string()))?;
        let options = SimpleFileOptions::default().last_modified_time(timestamp);

        for member in &self.members {
            if cancel.is_cancelled() {
                return Err(AssembleError::Cancelled);
            }
            zip.start_file(member.path().as_str(), options)
                .map_err(|e| AssembleError::Archive(e.to_string()))?;
            let mut reader = member.source().open()?;
            io::copy(&mut reader, &mut zip)?;
        }

        zip.finish().map_err(|e| AssembleError::Archive(e.to_string()))?;
        Ok(())
    }

    /// Write `<name>-<version>.parcel` into `dir`, returning its path.
    pub fn write_file(&self, dir: &Path, cancel: &CancelToken) -> Result<PathBuf, AssembleError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.identity.archive_file_name());
        let file = File::create(&path)?;
        self.write_to(file, cancel)?;
        tracing::debug!("wrote archive {}", path.display());
        Ok(path)
    }
}
