//! parcel - a package archive engine
//!
//! Assembles distributable `.parcel` archives (zip-compatible containers)
//! from manifest-declared files and transitively discovered build outputs,
//! and installs them into a versioned store.
//!
//! # Architecture
//!
//! - **Path identity first**: every archive member path flows through
//!   [`core::path::ArchivePath`], which defines case-insensitive identity
//!   once and rejects traversal before any collision check or disk write.
//! - **Tagged merges**: duplicate resolution during assembly yields
//!   `Inserted | SkippedIdentical | Conflict` outcomes so whole batches of
//!   conflicts surface together instead of failing one at a time.
//! - **Arena graph**: the build-output reference graph stores nodes in a
//!   table addressed by index, so diamonds and cycles cannot form
//!   ownership loops.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.parcel/
//! └── store/              # Default install base
//!     └── <name>/
//!         └── <version>/  # Install root for one package
//! ```

pub mod core;
pub mod io;
pub mod types;

// Re-exports for convenience
pub use self::core::assembler::{Archive, AssembleError, Assembler, MergeOutcome};
pub use self::core::graph::{BuildOutput, NodeId, ReferenceGraph};
pub use self::core::manifest::Manifest;
pub use self::core::path::ArchivePath;
pub use self::core::resolver::InstallLayout;
pub use self::core::savemode::SaveMode;
pub use self::io::archive::Parcel;
pub use self::io::extract::extract;
pub use self::types::{CancelToken, PackageIdentity, PackageName, Version};

use std::path::PathBuf;

use dirs::home_dir;

/// File extension for package archives.
pub const ARCHIVE_EXT: &str = "parcel";

/// Returns the primary configuration directory, or None if the user's home
/// cannot be resolved.
pub fn try_parcel_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("PARCEL_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".parcel"))
}

/// Returns the canonical parcel home directory (`~/.parcel`).
///
/// # Panics
/// Panics if the home directory cannot be determined.
pub fn parcel_home() -> PathBuf {
    try_parcel_home().expect("Could not determine home directory")
}

/// Default install base: ~/.parcel/store
pub fn store_path() -> PathBuf {
    parcel_home().join("store")
}
