use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::InventoryArgs;
use crate::model::{DocumentEntry, DocumentSource, SourceInventoryManifest};
use crate::util::{char_count, now_utc_string, sha256_file, write_json_pretty};

/// Source format subdirectories produced by the external format readers.
const FILE_TYPES: [&str; 3] = ["txt", "pdf", "docx"];

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.input_dir)?;

    if args.dry_run {
        info!(
            document_count = manifest.document_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args.manifest_path.unwrap_or_else(|| {
        args.output_dir
            .join("manifests")
            .join("source_inventory.json")
    });

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(document_count = manifest.document_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(input_dir: &Path) -> Result<SourceInventoryManifest> {
    let documents = discover_documents(input_dir)?;

    let mut entries = Vec::with_capacity(documents.len());
    for doc in &documents {
        let text = fs::read_to_string(&doc.path)
            .with_context(|| format!("failed to read {}", doc.path.display()))?;

        let filename = doc
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", doc.path.display()))?;

        entries.push(DocumentEntry {
            filename,
            file_type: doc.file_type.clone(),
            sha256: sha256_file(&doc.path)?,
            char_count: char_count(&text),
        });
    }

    Ok(SourceInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: input_dir.display().to_string(),
        document_count: entries.len(),
        documents: entries,
    })
}

/// Finds extracted `.txt` documents under the input directory, either at the
/// top level or grouped in per-format subdirectories (txt/pdf/docx).
pub fn discover_documents(input_dir: &Path) -> Result<Vec<DocumentSource>> {
    let mut documents = Vec::new();

    for file_type in FILE_TYPES {
        let type_dir = input_dir.join(file_type);
        if type_dir.is_dir() {
            collect_text_files(&type_dir, file_type, &mut documents)?;
        }
    }

    collect_text_files(input_dir, "txt", &mut documents)?;

    if documents.is_empty() {
        bail!("no .txt documents found in {}", input_dir.display());
    }

    documents.sort_by(|a, b| {
        a.file_type
            .cmp(&b.file_type)
            .then_with(|| a.original_name.cmp(&b.original_name))
    });

    // Two sources mapping to the same (file_type, name) would share one
    // output directory and race in the worker pool.
    for pair in documents.windows(2) {
        if pair[0].file_type == pair[1].file_type && pair[0].original_name == pair[1].original_name
        {
            bail!(
                "duplicate document {}/{}: {} and {}",
                pair[0].file_type,
                pair[0].original_name,
                pair[0].path.display(),
                pair[1].path.display()
            );
        }
    }

    Ok(documents)
}

fn collect_text_files(dir: &Path, file_type: &str, out: &mut Vec<DocumentSource>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if !is_text {
            continue;
        }

        let original_name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        out.push(DocumentSource {
            path,
            file_type: file_type.to_string(),
            original_name,
        });
    }

    Ok(())
}
