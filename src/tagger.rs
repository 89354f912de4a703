use anyhow::{Context, Result};
use regex::Regex;

use crate::chunker::HierarchyLevel;
use crate::numeral;

/// Table-of-contents marker line as printed in official statute texts, with
/// full-width padding spaces between the two characters.
pub const TOC_MARKER: &str = "目　　录";

/// One classified line (or accumulated run of lines) of a legal code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralToken {
    Title(String),
    TableOfContents(String),
    Part(String),
    Chapter(String),
    Section(String),
    SubSection(String),
    Article(String),
    PlainText(String),
}

/// Recognizes the structural grammar of a statute: title, table of contents,
/// the four heading levels (编/章/节/小节), and numbered articles (条).
///
/// Heading matches are anchored at line start and require the full
/// ordinal-plus-keyword prefix, so a keyword buried in prose never
/// reclassifies a line.
#[derive(Debug)]
pub struct StructuralTagger {
    title_phrase: String,
    heading_patterns: Vec<(HierarchyLevel, Regex)>,
    article_pattern: Regex,
    toc_chapter_entry: Regex,
}

impl StructuralTagger {
    pub fn new(title_phrase: &str) -> Result<Self> {
        // Priority order matters: broader levels first, article last. The
        // zero digit is legitimate only in article ordinals (第一百零五条);
        // chapter and section numbering never starts from zero.
        let heading_patterns = vec![
            (
                HierarchyLevel::Part,
                Regex::new(r"^第([一二三四五六七八九十百千]+)编\s*(.*)$")
                    .context("failed to compile part heading regex")?,
            ),
            (
                HierarchyLevel::Chapter,
                Regex::new(r"^第([一二三四五六七八九十百千]+)章\s*(.*)$")
                    .context("failed to compile chapter heading regex")?,
            ),
            (
                HierarchyLevel::Section,
                Regex::new(r"^第([一二三四五六七八九十百千]+)节\s*(.*)$")
                    .context("failed to compile section heading regex")?,
            ),
            (
                HierarchyLevel::SubSection,
                Regex::new(r"^第([一二三四五六七八九十百千]+)小节\s*(.*)$")
                    .context("failed to compile subsection heading regex")?,
            ),
        ];

        Ok(Self {
            title_phrase: title_phrase.to_string(),
            heading_patterns,
            article_pattern: Regex::new(r"^(第[零一二三四五六七八九十百千]+条)\s*(.*)$")
                .context("failed to compile article regex")?,
            toc_chapter_entry: Regex::new(r"^第([一二三四五六七八九十百千]+)章")
                .context("failed to compile toc chapter entry regex")?,
        })
    }

    /// Tags an ordered sequence of trimmed, non-empty lines. Total: every
    /// line ends up in exactly one token, unclassifiable lines fall through
    /// to `PlainText`.
    pub fn tag(&self, lines: &[String]) -> Vec<StructuralToken> {
        let mut tokens = Vec::new();
        let mut index = 0;

        if let Some(first) = lines.first() {
            if first.contains(&self.title_phrase) {
                tokens.push(StructuralToken::Title(self.title_phrase.clone()));
                index = 1;
            }
        }

        if let Some((toc_start, toc_end)) = self.detect_toc_range(&lines[index..]) {
            for line in &lines[index..index + toc_start] {
                tokens.push(StructuralToken::PlainText(line.clone()));
            }
            let toc_text = lines[index + toc_start..index + toc_end].join("\n");
            tokens.push(StructuralToken::TableOfContents(toc_text));
            index += toc_end;
        }

        let mut current_article: Vec<String> = Vec::new();

        for line in &lines[index..] {
            if let Some(token) = self.match_heading(line) {
                flush_article(&mut current_article, &mut tokens);
                tokens.push(token);
                continue;
            }

            if let Some(captures) = self.article_pattern.captures(line) {
                flush_article(&mut current_article, &mut tokens);
                let marker = &captures[1];
                let rest = captures[2].trim();
                current_article.push(join_heading(marker, rest));
                continue;
            }

            if current_article.is_empty() {
                tokens.push(StructuralToken::PlainText(line.clone()));
            } else {
                current_article.push(line.clone());
            }
        }

        flush_article(&mut current_article, &mut tokens);
        tokens
    }

    fn match_heading(&self, line: &str) -> Option<StructuralToken> {
        for (level, pattern) in &self.heading_patterns {
            let Some(captures) = pattern.captures(line) else {
                continue;
            };

            let keyword = level.keyword();
            let marker = format!("第{}{keyword}", &captures[1]);
            let text = join_heading(&marker, captures[2].trim());

            return Some(match level {
                HierarchyLevel::Part => StructuralToken::Part(text),
                HierarchyLevel::Chapter => StructuralToken::Chapter(text),
                HierarchyLevel::Section => StructuralToken::Section(text),
                HierarchyLevel::SubSection => StructuralToken::SubSection(text),
            });
        }

        None
    }

    /// Finds the table-of-contents range as `(marker_index, end_index)`
    /// relative to `lines`, marker line included.
    ///
    /// The range ends at the first chapter entry whose ordinal is not exactly
    /// one past the previous entry, or at the first non-chapter line once at
    /// least one entry has been seen. The consecutive-ordinal heuristic can
    /// mis-terminate on codes whose listing skips levels; that behavior is
    /// kept as is because the listing is advisory for chunk emission.
    fn detect_toc_range(&self, lines: &[String]) -> Option<(usize, usize)> {
        let marker = lines.iter().position(|line| line.contains(TOC_MARKER))?;
        let mut last_chapter = 0_u32;

        for (offset, line) in lines[marker + 1..].iter().enumerate() {
            let position = marker + 1 + offset;

            if let Some(captures) = self.toc_chapter_entry.captures(line) {
                let ordinal = numeral::resolve(&captures[1]);
                if ordinal == last_chapter + 1 {
                    last_chapter = ordinal;
                    continue;
                }
                return Some((marker, position));
            }

            if last_chapter > 0 {
                return Some((marker, position));
            }
        }

        // Listing runs to end of input.
        Some((marker, lines.len()))
    }
}

fn flush_article(current: &mut Vec<String>, tokens: &mut Vec<StructuralToken>) {
    if !current.is_empty() {
        tokens.push(StructuralToken::Article(current.join(" ")));
        current.clear();
    }
}

fn join_heading(marker: &str, rest: &str) -> String {
    if rest.is_empty() {
        marker.to_string()
    } else {
        format!("{marker} {rest}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagger() -> StructuralTagger {
        StructuralTagger::new("中华人民共和国劳动法").unwrap()
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tags_title_on_first_line_only() {
        let tokens = tagger().tag(&lines(&["中华人民共和国劳动法", "第一条 规定。"]));
        assert_eq!(
            tokens[0],
            StructuralToken::Title("中华人民共和国劳动法".to_string())
        );

        let tokens = tagger().tag(&lines(&["前言", "中华人民共和国劳动法"]));
        assert!(
            tokens
                .iter()
                .all(|t| !matches!(t, StructuralToken::Title(_)))
        );
    }

    #[test]
    fn tags_headings_at_every_level() {
        let tokens = tagger().tag(&lines(&[
            "第一编 总则",
            "第二章 劳动合同",
            "第三节 监察",
            "第一小节 程序",
        ]));
        assert_eq!(tokens[0], StructuralToken::Part("第一编 总则".to_string()));
        assert_eq!(
            tokens[1],
            StructuralToken::Chapter("第二章 劳动合同".to_string())
        );
        assert_eq!(tokens[2], StructuralToken::Section("第三节 监察".to_string()));
        assert_eq!(
            tokens[3],
            StructuralToken::SubSection("第一小节 程序".to_string())
        );
    }

    #[test]
    fn subsection_is_not_swallowed_by_section_pattern() {
        let tokens = tagger().tag(&lines(&["第二小节 特别规定"]));
        assert_eq!(
            tokens[0],
            StructuralToken::SubSection("第二小节 特别规定".to_string())
        );
    }

    #[test]
    fn heading_keyword_inside_prose_stays_prose() {
        let tokens = tagger().tag(&lines(&["本法第一章的规定适用于全体劳动者。"]));
        assert_eq!(
            tokens[0],
            StructuralToken::PlainText("本法第一章的规定适用于全体劳动者。".to_string())
        );
    }

    #[test]
    fn article_accumulates_continuation_lines() {
        let tokens = tagger().tag(&lines(&[
            "第八条 劳动者依照法律规定，",
            "参与民主管理。",
            "第九条 国务院劳动行政部门主管全国劳动工作。",
        ]));
        assert_eq!(
            tokens[0],
            StructuralToken::Article("第八条 劳动者依照法律规定， 参与民主管理。".to_string())
        );
        assert_eq!(
            tokens[1],
            StructuralToken::Article("第九条 国务院劳动行政部门主管全国劳动工作。".to_string())
        );
    }

    #[test]
    fn trailing_article_is_flushed_at_end_of_input() {
        let tokens = tagger().tag(&lines(&["第一条 内容。", "后续说明。"]));
        assert_eq!(
            tokens.last().unwrap(),
            &StructuralToken::Article("第一条 内容。 后续说明。".to_string())
        );
    }

    #[test]
    fn article_ordinal_may_contain_zero() {
        let tokens = tagger().tag(&lines(&["第一百零五条 违反本法规定。"]));
        assert_eq!(
            tokens[0],
            StructuralToken::Article("第一百零五条 违反本法规定。".to_string())
        );
    }

    #[test]
    fn toc_collects_consecutive_chapter_entries() {
        let tokens = tagger().tag(&lines(&[
            "目　　录",
            "第一章 总则",
            "第二章 促进就业",
            "第三章 劳动合同",
            "第一章 总则",
            "第一条 内容。",
        ]));

        assert_eq!(
            tokens[0],
            StructuralToken::TableOfContents(
                "目　　录\n第一章 总则\n第二章 促进就业\n第三章 劳动合同".to_string()
            )
        );
        assert_eq!(tokens[1], StructuralToken::Chapter("第一章 总则".to_string()));
        assert_eq!(tokens[2], StructuralToken::Article("第一条 内容。".to_string()));
    }

    #[test]
    fn toc_ends_on_non_heading_line_after_entries() {
        let tokens = tagger().tag(&lines(&["目　　录", "第一章 总则", "第一条 内容。"]));
        assert_eq!(
            tokens[0],
            StructuralToken::TableOfContents("目　　录\n第一章 总则".to_string())
        );
        assert_eq!(tokens[1], StructuralToken::Article("第一条 内容。".to_string()));
    }

    #[test]
    fn missing_toc_marker_skips_the_phase() {
        let tokens = tagger().tag(&lines(&["第一章 总则", "第一条 内容。"]));
        assert!(
            tokens
                .iter()
                .all(|t| !matches!(t, StructuralToken::TableOfContents(_)))
        );
    }

    #[test]
    fn lines_before_toc_marker_become_plain_text() {
        let tokens = tagger().tag(&lines(&[
            "中华人民共和国劳动法",
            "（1994年7月5日通过）",
            "目　　录",
            "第一章 总则",
            "第一条 内容。",
        ]));
        assert_eq!(
            tokens[1],
            StructuralToken::PlainText("（1994年7月5日通过）".to_string())
        );
        assert!(matches!(tokens[2], StructuralToken::TableOfContents(_)));
    }

    #[test]
    fn tagging_is_deterministic() {
        let input = lines(&[
            "中华人民共和国劳动法",
            "目　　录",
            "第一章 总则",
            "第二章 促进就业",
            "第一章 总则",
            "第一条 为了保护劳动者的合法权益。",
            "第二条 在中华人民共和国境内的企业。",
        ]);

        let first = tagger().tag(&input);
        let second = tagger().tag(&input);
        assert_eq!(first, second);
    }
}
