//! parcel - package archive CLI

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "parcel")]
#[command(author, version, about = "parcel - assemble and install package archives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a package archive from a manifest
    Pack {
        /// Path to the package manifest (parcel.toml)
        manifest: PathBuf,
        /// Fold referenced projects' build outputs into the archive
        #[arg(long)]
        include_references: bool,
        /// Override the manifest version
        #[arg(long)]
        version: Option<String>,
        /// Directory the archive is written to
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Install a package archive into the store
    Install {
        /// Path to the .parcel archive
        archive: PathBuf,
        /// Install base directory (defaults to ~/.parcel/store)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Write only the package metadata
        #[arg(long)]
        metadata_only: bool,
        /// Also copy the archive file into the install root
        #[arg(long)]
        keep_archive: bool,
    },
    /// List the members of a package archive
    Inspect {
        /// Path to the .parcel archive
        archive: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Pack {
            manifest,
            include_references,
            version,
            output,
        } => cmd::pack::pack(&manifest, include_references, version.as_deref(), &output),
        Commands::Install {
            archive,
            root,
            metadata_only,
            keep_archive,
        } => cmd::install::install(&archive, root, metadata_only, keep_archive),
        Commands::Inspect { archive } => cmd::inspect::inspect(&archive),
    }
}
