use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use denta_core::{BackendError, QaAnswer};
use regex::Regex;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::tokenize::tokenize;
use crate::QuestionAnswering;

const DEFAULT_MIN_CONFIDENCE: f32 = 0.3;
const DEFAULT_TOP: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct FaqRecord {
    pub questions: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone)]
struct IndexedEntry {
    answer: String,
    source_path: String,
    keywords: Vec<HashSet<String>>,
}

/// Question/answer pairs loaded from disk, ranked by keyword overlap.
#[derive(Debug, Clone)]
pub struct FaqKnowledgeBase {
    entries: Vec<IndexedEntry>,
    min_confidence: f32,
    top: usize,
}

impl FaqKnowledgeBase {
    pub fn from_records(records: Vec<FaqRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|record| index(record, "inline"))
            .collect();

        Self {
            entries,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            top: DEFAULT_TOP,
        }
    }

    /// Loads every `.json` and `.md` file below `root`. A missing directory yields an empty base.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let heading = Regex::new(r"(?m)^##\s+(.+)$")?;

        let mut entries = Vec::new();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
        {
            let path = entry.path();
            let extension = path.extension().and_then(|ext| ext.to_str());
            if !matches!(extension, Some("json") | Some("md")) {
                continue;
            }

            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed reading faq document: {}", path.display()))?;
            let rel_path = path
                .strip_prefix(root)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| path.to_string_lossy().to_string());

            let records = if extension == Some("json") {
                serde_json::from_str::<Vec<FaqRecord>>(&raw)
                    .with_context(|| format!("invalid faq json: {}", path.display()))?
            } else {
                markdown_records(&heading, &raw)
            };

            entries.extend(records.into_iter().map(|record| index(record, &rel_path)));
        }

        Ok(Self {
            entries,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            top: DEFAULT_TOP,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sources(&self) -> Vec<&str> {
        let mut sources = self
            .entries
            .iter()
            .map(|entry| entry.source_path.as_str())
            .collect::<Vec<_>>();
        sources.dedup();
        sources
    }

    pub fn search(&self, question: &str) -> Vec<QaAnswer> {
        let query = tokenize(question).into_iter().collect::<HashSet<_>>();

        let mut scored = self
            .entries
            .iter()
            .map(|entry| {
                let score = entry
                    .keywords
                    .iter()
                    .map(|keywords| overlap_score(&query, keywords))
                    .fold(0.0_f32, f32::max);
                (score, entry)
            })
            .filter(|(score, _)| *score >= self.min_confidence && *score > 0.0)
            .collect::<Vec<_>>();

        scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        scored
            .into_iter()
            .take(self.top)
            .map(|(score, entry)| QaAnswer::new(entry.answer.clone(), score))
            .collect()
    }
}

impl QuestionAnswering for FaqKnowledgeBase {
    async fn get_answers(&self, utterance: &str) -> Result<Vec<QaAnswer>, BackendError> {
        Ok(self.search(utterance))
    }
}

fn index(record: FaqRecord, source_path: &str) -> IndexedEntry {
    IndexedEntry {
        keywords: record
            .questions
            .iter()
            .map(|question| tokenize(question).into_iter().collect())
            .collect(),
        answer: record.answer.trim().to_string(),
        source_path: source_path.to_string(),
    }
}

fn markdown_records(heading: &Regex, body: &str) -> Vec<FaqRecord> {
    let headings = heading.captures_iter(body).collect::<Vec<_>>();

    headings
        .iter()
        .enumerate()
        .filter_map(|(idx, captures)| {
            let whole = captures.get(0)?;
            let question = captures.get(1)?.as_str().trim().to_string();
            let answer_end = headings
                .get(idx + 1)
                .and_then(|next| next.get(0))
                .map(|next| next.start())
                .unwrap_or(body.len());
            let answer = body[whole.end()..answer_end]
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");

            (!answer.is_empty()).then(|| FaqRecord {
                questions: vec![question],
                answer,
            })
        })
        .collect()
}

/// Share of the query's keywords found in the question.
fn overlap_score(query: &HashSet<String>, question: &HashSet<String>) -> f32 {
    if query.is_empty() || question.is_empty() {
        return 0.0;
    }

    let overlap = query.iter().filter(|token| question.contains(*token)).count() as f32;
    overlap / query.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge_base() -> FaqKnowledgeBase {
        FaqKnowledgeBase::from_records(vec![
            FaqRecord {
                questions: vec![
                    "What are your opening hours?".to_string(),
                    "When are you open?".to_string(),
                ],
                answer: "We are open 9-5".to_string(),
            },
            FaqRecord {
                questions: vec!["Do you accept insurance?".to_string()],
                answer: "We accept most major dental insurance plans.".to_string(),
            },
        ])
    }

    #[test]
    fn ranks_best_match_first() {
        let answers = knowledge_base().search("when are you open");
        assert_eq!(answers[0].answer, "We are open 9-5");
    }

    #[test]
    fn unrelated_questions_yield_nothing() {
        assert!(knowledge_base().search("can I park my spaceship").is_empty());
    }

    #[test]
    fn parses_markdown_sections() {
        let heading = Regex::new(r"(?m)^##\s+(.+)$").unwrap();
        let records = markdown_records(
            &heading,
            "# Services\n\n## Do you offer whitening?\nYes, in-office\nwhitening.\n\n## Empty?\n",
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].questions[0], "Do you offer whitening?");
        assert_eq!(records[0].answer, "Yes, in-office whitening.");
    }

    #[test]
    fn loads_json_and_markdown_from_dir() {
        let kb = FaqKnowledgeBase::from_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/../../kb")).unwrap();
        assert!(kb.len() >= 5);
        assert_eq!(kb.sources(), vec!["faq.json", "services.md"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let kb = FaqKnowledgeBase::from_dir("/definitely/not/here").unwrap();
        assert!(kb.is_empty());
    }
}
