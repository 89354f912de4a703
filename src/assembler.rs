use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::chunker::ChunkDraft;
use crate::model::{ChunkIndexRecord, DocumentSource};
use crate::util::ensure_directory;

/// Writes chunk bodies to the output sink and produces the index records
/// that describe them.
///
/// Ids are 1-based in emission order, scoped to one document. Any write
/// failure aborts the whole document; the caller discards partial output and
/// retries the document rather than patching it.
#[derive(Debug)]
pub struct MetadataAssembler {
    blank_runs: Regex,
}

impl MetadataAssembler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            blank_runs: Regex::new(r"\n{2,}")
                .context("failed to compile blank-run regex")?,
        })
    }

    pub fn assemble(
        &self,
        drafts: &[ChunkDraft],
        doc: &DocumentSource,
        output_dir: &Path,
    ) -> Result<Vec<ChunkIndexRecord>> {
        ensure_directory(output_dir)?;

        let mut records = Vec::with_capacity(drafts.len());

        for (index, draft) in drafts.iter().enumerate() {
            let chunk_id = index + 1;
            let chunk_path = output_dir.join(format!("chunk_{chunk_id}.txt"));

            let cleaned = self.blank_runs.replace_all(&draft.body, "\n\n");
            fs::write(&chunk_path, cleaned.as_bytes())
                .with_context(|| format!("failed to write chunk body: {}", chunk_path.display()))?;

            let hierarchy = &draft.hierarchy;
            records.push(ChunkIndexRecord {
                chunk_id: chunk_id.to_string(),
                source_path: doc.path.display().to_string(),
                chunk_path: chunk_path.display().to_string(),
                file_type: doc.file_type.clone(),
                original_name: doc.original_name.clone(),
                title: hierarchy.title.clone().unwrap_or_default(),
                part: hierarchy.part.clone().unwrap_or_default(),
                chapter: hierarchy.chapter.clone().unwrap_or_default(),
                section: hierarchy.section.clone().unwrap_or_default(),
                subsection: hierarchy.subsection.clone().unwrap_or_default(),
                content_kind: draft.kind,
                char_count: draft.char_count,
            });
        }

        Ok(records)
    }
}
