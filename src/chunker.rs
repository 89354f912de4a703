use serde::{Deserialize, Serialize};

use crate::tagger::StructuralToken;
use crate::util::char_count;

/// The four nested heading levels above an article, broadest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyLevel {
    Part,
    Chapter,
    Section,
    SubSection,
}

impl HierarchyLevel {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Part => "编",
            Self::Chapter => "章",
            Self::Section => "节",
            Self::SubSection => "小节",
        }
    }
}

/// Position of a chunk in the document hierarchy, snapshotted at emission.
///
/// Updated only by heading tokens. Setting a level clears every deeper
/// level, so a fresh chapter never inherits the previous chapter's section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyCursor {
    pub title: Option<String>,
    pub part: Option<String>,
    pub chapter: Option<String>,
    pub section: Option<String>,
    pub subsection: Option<String>,
}

impl HierarchyCursor {
    pub fn set(&mut self, level: HierarchyLevel, text: String) {
        self.reset_below(level);
        match level {
            HierarchyLevel::Part => self.part = Some(text),
            HierarchyLevel::Chapter => self.chapter = Some(text),
            HierarchyLevel::Section => self.section = Some(text),
            HierarchyLevel::SubSection => self.subsection = Some(text),
        }
    }

    pub fn reset_below(&mut self, level: HierarchyLevel) {
        match level {
            HierarchyLevel::Part => {
                self.chapter = None;
                self.section = None;
                self.subsection = None;
            }
            HierarchyLevel::Chapter => {
                self.section = None;
                self.subsection = None;
            }
            HierarchyLevel::Section => self.subsection = None,
            HierarchyLevel::SubSection => {}
        }
    }

    /// Header lines synthesized into every chunk body, fixed label order.
    fn header(&self) -> String {
        let labels = [
            ("【标题】", &self.title),
            ("【编】", &self.part),
            ("【章】", &self.chapter),
            ("【节】", &self.section),
            ("【小节】", &self.subsection),
        ];

        let mut header = String::new();
        for (label, field) in labels {
            if let Some(text) = field {
                header.push_str(label);
                header.push_str(text);
                header.push('\n');
            }
        }
        header
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    TableOfContents,
    LawChunk,
}

/// A chunk body plus the context it was emitted under, before ids and
/// output paths are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    pub body: String,
    pub hierarchy: HierarchyCursor,
    pub kind: ContentKind,
    pub char_count: usize,
}

/// Walks the token stream and emits size-bounded, structure-complete chunks.
///
/// Articles are never split: a run of articles under one heading is packed
/// greedily under the char budget, and a single article over budget goes out
/// alone in an oversized chunk.
#[derive(Debug)]
pub struct ChunkBuilder {
    max_chunk_chars: usize,
}

impl ChunkBuilder {
    pub fn new(max_chunk_chars: usize) -> Self {
        Self { max_chunk_chars }
    }

    pub fn build(&self, tokens: &[StructuralToken]) -> Vec<ChunkDraft> {
        let mut cursor = HierarchyCursor::default();
        let mut pending: Vec<String> = Vec::new();
        let mut chunks = Vec::new();

        for token in tokens {
            match token {
                StructuralToken::Title(text) => {
                    cursor.title = Some(text.clone());
                }
                StructuralToken::TableOfContents(text) => {
                    let body = match &cursor.title {
                        Some(title) => format!("{title}\n{text}"),
                        None => text.clone(),
                    };
                    chunks.push(ChunkDraft {
                        char_count: char_count(&body),
                        body,
                        hierarchy: cursor.clone(),
                        kind: ContentKind::TableOfContents,
                    });
                }
                StructuralToken::Part(text) => {
                    self.flush(&cursor, &mut pending, &mut chunks);
                    cursor.set(HierarchyLevel::Part, text.clone());
                }
                StructuralToken::Chapter(text) => {
                    self.flush(&cursor, &mut pending, &mut chunks);
                    cursor.set(HierarchyLevel::Chapter, text.clone());
                }
                StructuralToken::Section(text) => {
                    self.flush(&cursor, &mut pending, &mut chunks);
                    cursor.set(HierarchyLevel::Section, text.clone());
                }
                StructuralToken::SubSection(text) => {
                    self.flush(&cursor, &mut pending, &mut chunks);
                    cursor.set(HierarchyLevel::SubSection, text.clone());
                }
                StructuralToken::Article(text) => {
                    pending.push(text.clone());
                }
                StructuralToken::PlainText(_) => {}
            }
        }

        self.flush(&cursor, &mut pending, &mut chunks);
        chunks
    }

    /// Packs the pending articles into one or more chunks, each re-prefixed
    /// with the hierarchy header, then clears the pending list.
    fn flush(
        &self,
        cursor: &HierarchyCursor,
        pending: &mut Vec<String>,
        chunks: &mut Vec<ChunkDraft>,
    ) {
        if pending.is_empty() {
            return;
        }

        let header = cursor.header();
        let header_chars = char_count(&header);

        let mut body = header.clone();
        let mut body_chars = header_chars;

        for article in pending.iter() {
            let article_chars = char_count(article);

            // The joining newline counts against the budget too; only a
            // chunk holding a single article may run over.
            if body_chars > header_chars && body_chars + 1 + article_chars > self.max_chunk_chars {
                chunks.push(draft(body, cursor));
                body = header.clone();
                body_chars = header_chars;
            }

            if body_chars == header_chars {
                body.push_str(article);
                body_chars += article_chars;
            } else {
                body.push('\n');
                body.push_str(article);
                body_chars += article_chars + 1;
            }
        }

        if body_chars > header_chars {
            chunks.push(draft(body, cursor));
        }

        pending.clear();
    }
}

fn draft(body: String, cursor: &HierarchyCursor) -> ChunkDraft {
    ChunkDraft {
        char_count: char_count(&body),
        hierarchy: cursor.clone(),
        kind: ContentKind::LawChunk,
        body,
    }
}
