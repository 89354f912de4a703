use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::assembler::MetadataAssembler;
use crate::chunker::{ChunkBuilder, ContentKind};
use crate::cli::ChunkArgs;
use crate::commands::inventory;
use crate::model::{ChunkRunManifest, DocumentSource, RunCounts, RunPaths};
use crate::tagger::StructuralTagger;
use crate::util::{now_utc_string, read_document_lines, utc_compact_string, write_json_pretty};

#[derive(Debug, Default)]
struct DocumentOutcome {
    chunks_total: usize,
    toc_chunks: usize,
    law_chunks: usize,
    oversized_chunks: usize,
}

pub fn run(args: ChunkArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let manifest_dir = args.output_dir.join("manifests");
    let manifest_path = args
        .manifest_path
        .clone()
        .unwrap_or_else(|| manifest_dir.join(format!("chunk_run_{}.json", utc_compact_string(started_ts))));

    info!(
        input_dir = %args.input_dir.display(),
        output_dir = %args.output_dir.display(),
        run_id = %run_id,
        "starting chunk run"
    );

    let documents = inventory::discover_documents(&args.input_dir)?;

    let tagger = StructuralTagger::new(&args.title_phrase)?;
    let builder = ChunkBuilder::new(args.max_chunk_chars);
    let assembler = MetadataAssembler::new()?;

    // One worker per document; the pipeline shares nothing mutable across
    // documents, so the pool needs no coordination beyond collecting results.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.workers.max(1))
        .build()
        .context("failed to build worker pool")?;

    let results: Vec<(String, Result<DocumentOutcome>)> = pool.install(|| {
        documents
            .par_iter()
            .map(|doc| {
                let label = format!("{}/{}", doc.file_type, doc.original_name);
                let outcome = process_document(
                    doc,
                    &tagger,
                    &builder,
                    &assembler,
                    &args.output_dir,
                    args.max_chunk_chars,
                );
                (label, outcome)
            })
            .collect()
    });

    let mut counts = RunCounts {
        documents_total: documents.len(),
        ..RunCounts::default()
    };
    let mut warnings = Vec::new();

    for (label, result) in results {
        match result {
            Ok(outcome) => {
                counts.documents_processed += 1;
                counts.chunks_total += outcome.chunks_total;
                counts.toc_chunks += outcome.toc_chunks;
                counts.law_chunks += outcome.law_chunks;
                counts.oversized_chunks += outcome.oversized_chunks;
                info!(document = %label, chunks = outcome.chunks_total, "document chunked");
            }
            Err(err) => {
                counts.documents_failed += 1;
                let warning = format!("failed to process {label}: {err:#}");
                warn!(warning = %warning, "document failed");
                warnings.push(warning);
            }
        }
    }

    let manifest = ChunkRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: if counts.documents_failed == 0 {
            "completed".to_string()
        } else {
            "completed_with_failures".to_string()
        },
        started_at,
        updated_at: now_utc_string(),
        command: render_chunk_command(&args),
        max_chunk_chars: args.max_chunk_chars,
        paths: RunPaths {
            input_dir: args.input_dir.display().to_string(),
            output_dir: args.output_dir.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
        },
        counts,
        warnings,
    };

    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote chunk run manifest");
    info!(
        documents = manifest.counts.documents_processed,
        failed = manifest.counts.documents_failed,
        chunks = manifest.counts.chunks_total,
        "chunk run completed"
    );

    Ok(())
}

/// Runs one document through tag → build → assemble and persists its chunk
/// files plus `metadata.json`. On any failure the document's output
/// directory is removed, so a failed document leaves nothing behind.
fn process_document(
    doc: &DocumentSource,
    tagger: &StructuralTagger,
    builder: &ChunkBuilder,
    assembler: &MetadataAssembler,
    output_root: &Path,
    max_chunk_chars: usize,
) -> Result<DocumentOutcome> {
    let doc_dir = document_output_dir(output_root, doc);

    let result = (|| {
        let lines = read_document_lines(&doc.path)?;
        let tokens = tagger.tag(&lines);
        let drafts = builder.build(&tokens);

        let records = assembler.assemble(&drafts, doc, &doc_dir)?;
        write_json_pretty(&doc_dir.join("metadata.json"), &records)?;

        let mut outcome = DocumentOutcome {
            chunks_total: drafts.len(),
            ..DocumentOutcome::default()
        };
        for draft in &drafts {
            match draft.kind {
                ContentKind::TableOfContents => outcome.toc_chunks += 1,
                ContentKind::LawChunk => {
                    outcome.law_chunks += 1;
                    if draft.char_count > max_chunk_chars {
                        outcome.oversized_chunks += 1;
                    }
                }
            }
        }

        Ok(outcome)
    })();

    if result.is_err() {
        let _ = fs::remove_dir_all(&doc_dir);
    }

    result
}

fn document_output_dir(output_root: &Path, doc: &DocumentSource) -> PathBuf {
    output_root.join(&doc.file_type).join(&doc.original_name)
}

fn render_chunk_command(args: &ChunkArgs) -> String {
    let mut command = vec![
        "lawchunk".to_string(),
        "chunk".to_string(),
        "--input-dir".to_string(),
        args.input_dir.display().to_string(),
        "--output-dir".to_string(),
        args.output_dir.display().to_string(),
        "--max-chunk-chars".to_string(),
        args.max_chunk_chars.to_string(),
        "--title-phrase".to_string(),
        args.title_phrase.clone(),
        "--workers".to_string(),
        args.workers.to_string(),
    ];

    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }

    command.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChunkIndexRecord;

    fn temp_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lawchunk-{test}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn pipeline() -> (StructuralTagger, ChunkBuilder, MetadataAssembler) {
        (
            StructuralTagger::new("中华人民共和国劳动法").unwrap(),
            ChunkBuilder::new(1000),
            MetadataAssembler::new().unwrap(),
        )
    }

    fn source(path: PathBuf) -> DocumentSource {
        DocumentSource {
            path,
            file_type: "txt".to_string(),
            original_name: "劳动法".to_string(),
        }
    }

    #[test]
    fn two_chapter_document_yields_two_chunks() {
        let root = temp_dir("chunk-two-chapters");
        let input = root.join("劳动法.txt");
        fs::write(
            &input,
            "第一章 总则\n第一条 内容甲。\n第二条 内容乙。\n第二章 细则\n第三条 内容丙。\n",
        )
        .unwrap();

        let (tagger, builder, assembler) = pipeline();
        let doc = source(input);
        let output_root = root.join("out");

        let outcome =
            process_document(&doc, &tagger, &builder, &assembler, &output_root, 1000).unwrap();
        assert_eq!(outcome.chunks_total, 2);
        assert_eq!(outcome.law_chunks, 2);
        assert_eq!(outcome.oversized_chunks, 0);

        let doc_dir = output_root.join("txt").join("劳动法");
        let raw = fs::read(doc_dir.join("metadata.json")).unwrap();
        let records: Vec<ChunkIndexRecord> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chapter, "第一章 总则");
        assert_eq!(records[1].chapter, "第二章 细则");
        assert_eq!(records[1].section, "");

        let first = fs::read_to_string(doc_dir.join("chunk_1.txt")).unwrap();
        assert_eq!(first, "【章】第一章 总则\n第一条 内容甲。\n第二条 内容乙。");
        let second = fs::read_to_string(doc_dir.join("chunk_2.txt")).unwrap();
        assert_eq!(second, "【章】第二章 细则\n第三条 内容丙。");

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn reruns_produce_identical_output() {
        let root = temp_dir("chunk-determinism");
        let input = root.join("劳动法.txt");
        fs::write(
            &input,
            "中华人民共和国劳动法\n目　　录\n第一章 总则\n第二章 细则\n第一章 总则\n第一条 内容甲。\n第二章 细则\n第二条 内容乙。\n",
        )
        .unwrap();

        let (tagger, builder, assembler) = pipeline();
        let doc = source(input);

        let out_a = root.join("out-a");
        let out_b = root.join("out-b");
        process_document(&doc, &tagger, &builder, &assembler, &out_a, 1000).unwrap();
        process_document(&doc, &tagger, &builder, &assembler, &out_b, 1000).unwrap();

        let dir_a = out_a.join("txt").join("劳动法");
        let dir_b = out_b.join("txt").join("劳动法");
        for name in ["chunk_1.txt", "chunk_2.txt", "chunk_3.txt"] {
            assert_eq!(
                fs::read_to_string(dir_a.join(name)).unwrap(),
                fs::read_to_string(dir_b.join(name)).unwrap()
            );
        }

        let records_a: Vec<ChunkIndexRecord> =
            serde_json::from_slice(&fs::read(dir_a.join("metadata.json")).unwrap()).unwrap();
        let records_b: Vec<ChunkIndexRecord> =
            serde_json::from_slice(&fs::read(dir_b.join("metadata.json")).unwrap()).unwrap();
        assert_eq!(records_a.len(), 3);
        for (a, b) in records_a.iter().zip(&records_b) {
            assert_eq!(a.chunk_id, b.chunk_id);
            assert_eq!(a.content_kind, b.content_kind);
            assert_eq!(a.char_count, b.char_count);
            assert_eq!(a.chapter, b.chapter);
        }

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn failed_document_leaves_no_partial_output() {
        let root = temp_dir("chunk-failure");
        let missing = source(root.join("missing.txt"));
        let (tagger, builder, assembler) = pipeline();
        let output_root = root.join("out");

        let result =
            process_document(&missing, &tagger, &builder, &assembler, &output_root, 1000);
        assert!(result.is_err());
        assert!(!output_root.join("txt").join("劳动法").exists());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn article_text_is_preserved_across_chunk_bodies() {
        let root = temp_dir("chunk-preservation");
        let articles: Vec<String> = (1..=9)
            .map(|i| format!("第{}条 条文内容{}。", ["一", "二", "三", "四", "五", "六", "七", "八", "九"][i - 1], "正文".repeat(i * 9)))
            .collect();

        let mut text = String::from("第一章 总则\n");
        for article in &articles {
            text.push_str(article);
            text.push('\n');
        }
        let input = root.join("劳动法.txt");
        fs::write(&input, &text).unwrap();

        let (tagger, _, assembler) = pipeline();
        let builder = ChunkBuilder::new(200);
        let doc = source(input);
        let output_root = root.join("out");

        let outcome =
            process_document(&doc, &tagger, &builder, &assembler, &output_root, 200).unwrap();
        assert!(outcome.chunks_total > 1);

        let doc_dir = output_root.join("txt").join("劳动法");
        let mut combined = String::new();
        for id in 1..=outcome.chunks_total {
            combined.push_str(&fs::read_to_string(doc_dir.join(format!("chunk_{id}.txt"))).unwrap());
            combined.push('\n');
        }
        for article in &articles {
            assert_eq!(combined.matches(article.as_str()).count(), 1);
        }

        let _ = fs::remove_dir_all(&root);
    }
}
