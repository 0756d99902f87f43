//! List the members of a package archive.

use std::path::Path;

use anyhow::{Context, Result};

use parcel::Parcel;

/// Print the member list of `archive`, reserved members marked with `*`.
pub fn inspect(archive: &Path) -> Result<()> {
    let parcel_file = Parcel::open(archive)
        .with_context(|| format!("failed to open archive {}", archive.display()))?;

    println!(
        "{} ({} members)",
        parcel_file.identity(),
        parcel_file.entries().len()
    );
    for entry in parcel_file.entries() {
        let marker = if entry.is_reserved() { '*' } else { ' ' };
        println!("  {marker} {:>9}  {}", entry.size(), entry.path());
    }
    Ok(())
}
