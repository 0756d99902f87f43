//! Assemble a package archive from a manifest.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use parcel::core::graph::{BuildOutput, NodeId, ReferenceGraph};
use parcel::{Assembler, CancelToken, Manifest};

/// Pack a manifest into a `.parcel` archive in `output_dir`.
pub fn pack(
    manifest_path: &Path,
    include_references: bool,
    version: Option<&str>,
    output_dir: &Path,
) -> Result<()> {
    let mut manifest = Manifest::load(manifest_path)
        .with_context(|| format!("failed to load manifest {}", manifest_path.display()))?;
    if let Some(version) = version {
        manifest.set_version(version)?;
    }
    let identity = manifest.identity();
    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    let mut assembler = Assembler::new(manifest.clone());
    for member in manifest.collect_entries(base)? {
        assembler.add_entry(member)?;
    }

    if manifest.build.as_ref().is_some_and(|b| b.output.is_some()) {
        let (graph, root) = load_reference_graph(manifest_path, include_references)?;
        assembler.add_outputs(graph.collect_outputs(root))?;
    } else if include_references {
        bail!(
            "{} declares no [build] output; nothing to fold references into",
            manifest_path.display()
        );
    }

    let archive = assembler.finish()?;
    let member_count = archive.members().len();
    let out = archive
        .write_file(output_dir, &CancelToken::new())
        .with_context(|| format!("failed to write archive into {}", output_dir.display()))?;

    println!(
        "Packed {identity} ({member_count} members) -> {}",
        out.display()
    );
    Ok(())
}

/// Construct the reference graph by walking manifests on disk.
///
/// Each project's manifest is loaded once (keyed by canonical path), so
/// diamonds and reference cycles terminate.
fn load_reference_graph(
    root_manifest: &Path,
    follow_references: bool,
) -> Result<(ReferenceGraph, NodeId)> {
    let mut graph = ReferenceGraph::new();
    let mut memo = HashMap::new();
    let root = load_project(&mut graph, &mut memo, root_manifest, follow_references)?;
    Ok((graph, root))
}

fn load_project(
    graph: &mut ReferenceGraph,
    memo: &mut HashMap<PathBuf, NodeId>,
    manifest_path: &Path,
    follow_references: bool,
) -> Result<NodeId> {
    let key = manifest_path
        .canonicalize()
        .with_context(|| format!("cannot resolve manifest {}", manifest_path.display()))?;
    if let Some(&id) = memo.get(&key) {
        return Ok(id);
    }

    let manifest = Manifest::load(manifest_path)
        .with_context(|| format!("failed to load manifest {}", manifest_path.display()))?;
    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let Some(build) = manifest.build.as_ref() else {
        bail!("{} has no [build] section", manifest_path.display());
    };
    let Some(output) = build.output.as_ref() else {
        bail!("{} declares no build output", manifest_path.display());
    };

    let id = graph.add_node(
        key.to_string_lossy(),
        manifest.package.name.as_str(),
        BuildOutput {
            file: base.join(output),
            subtree: build.subtree.clone(),
        },
    );
    memo.insert(key, id);

    if follow_references {
        for reference in &build.references {
            let target = load_project(graph, memo, &base.join(&reference.manifest), true)?;
            graph.add_edge(id, target, reference.include);
        }
    }
    Ok(id)
}
