use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::chunker::ContentKind;

/// One source document discovered under the input directory.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub path: PathBuf,
    /// Format the text was extracted from (txt/pdf/docx subdirectory name).
    pub file_type: String,
    /// Source file stem, used to name the per-document output directory.
    pub original_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub filename: String,
    pub file_type: String,
    pub sha256: String,
    pub char_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub document_count: usize,
    pub documents: Vec<DocumentEntry>,
}

/// One line of the per-document index, in chunk emission order. Downstream
/// retrieval loads chunk bodies through exactly these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkIndexRecord {
    pub chunk_id: String,
    pub source_path: String,
    pub chunk_path: String,
    pub file_type: String,
    pub original_name: String,
    pub title: String,
    pub part: String,
    pub chapter: String,
    pub section: String,
    pub subsection: String,
    pub content_kind: ContentKind,
    pub char_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPaths {
    pub input_dir: String,
    pub output_dir: String,
    pub manifest_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCounts {
    pub documents_total: usize,
    pub documents_processed: usize,
    pub documents_failed: usize,
    pub chunks_total: usize,
    pub toc_chunks: usize,
    pub law_chunks: usize,
    pub oversized_chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub max_chunk_chars: usize,
    pub paths: RunPaths,
    pub counts: RunCounts,
    pub warnings: Vec<String>,
}
