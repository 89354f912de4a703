use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::{ChunkIndexRecord, ChunkRunManifest, SourceInventoryManifest};

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.output_dir.join("manifests");
    let inventory_path = manifest_dir.join("source_inventory.json");

    info!(output_dir = %args.output_dir.display(), "status requested");

    if inventory_path.exists() {
        let raw = fs::read(&inventory_path)
            .with_context(|| format!("failed to read {}", inventory_path.display()))?;
        let inventory: SourceInventoryManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", inventory_path.display()))?;

        info!(
            generated_at = %inventory.generated_at,
            document_count = inventory.document_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    match latest_run_manifest(&manifest_dir)? {
        Some(path) => {
            let raw = fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let manifest: ChunkRunManifest = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;

            info!(
                run_id = %manifest.run_id,
                status = %manifest.status,
                updated_at = %manifest.updated_at,
                documents_processed = manifest.counts.documents_processed,
                documents_failed = manifest.counts.documents_failed,
                chunks_total = manifest.counts.chunks_total,
                oversized_chunks = manifest.counts.oversized_chunks,
                "loaded latest run manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no chunk run manifest found"),
    }

    let (documents, chunks) = count_indexed_output(&args.output_dir)?;
    info!(
        path = %args.output_dir.display(),
        documents,
        chunks,
        "indexed output on disk"
    );

    Ok(())
}

/// Run manifests carry a sortable compact timestamp in their filename, so
/// the lexicographically last one is the most recent.
fn latest_run_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.is_dir() {
        return Ok(None);
    }

    let mut candidates = Vec::new();
    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?;
        let path = entry.path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("chunk_run_") && name.ends_with(".json"))
            .unwrap_or(false);
        if is_run_manifest {
            candidates.push(path);
        }
    }

    candidates.sort();
    Ok(candidates.pop())
}

/// Counts per-document index files and their records under the output tree.
fn count_indexed_output(output_dir: &Path) -> Result<(usize, usize)> {
    let mut documents = 0;
    let mut chunks = 0;

    if !output_dir.is_dir() {
        return Ok((0, 0));
    }

    for index_path in find_index_files(output_dir)? {
        let raw = fs::read(&index_path)
            .with_context(|| format!("failed to read {}", index_path.display()))?;
        let records: Vec<ChunkIndexRecord> = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", index_path.display()))?;

        documents += 1;
        chunks += records.len();
    }

    Ok((documents, chunks))
}

fn find_index_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries =
            fs::read_dir(&dir).with_context(|| format!("failed to read {}", dir.display()))?;

        for entry in entries {
            let entry =
                entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
            let path = entry.path();

            if path.is_dir() {
                if path.file_name().is_some_and(|name| name != "manifests") {
                    stack.push(path);
                }
            } else if path.file_name().is_some_and(|name| name == "metadata.json") {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}
