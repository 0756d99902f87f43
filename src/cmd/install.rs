//! Install a package archive into the store.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use parcel::{CancelToken, InstallLayout, Parcel, SaveMode, extract};

/// Extract `archive` beneath `<root>/<name>/<version>`.
pub fn install(
    archive: &Path,
    root: Option<PathBuf>,
    metadata_only: bool,
    keep_archive: bool,
) -> Result<()> {
    let mut parcel_file = Parcel::open(archive)
        .with_context(|| format!("failed to open archive {}", archive.display()))?;
    let identity = parcel_file.identity();

    let layout = InstallLayout::new(root.unwrap_or_else(parcel::store_path));
    let install_root = layout.root_for(&identity);

    let mut mode = if metadata_only {
        SaveMode::MANIFEST
    } else {
        SaveMode::install_default()
    };
    if keep_archive {
        mode |= SaveMode::RAW_ARCHIVE;
    }

    let written = extract(&mut parcel_file, &install_root, mode, &CancelToken::new())?;
    println!(
        "Installed {identity} ({} files) into {}",
        written.len(),
        install_root.display()
    );
    Ok(())
}
