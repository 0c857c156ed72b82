mod faq;
mod language_service;
mod tokenize;

use std::path::Path;

use anyhow::{Context, Result};
use denta_core::{BackendError, QaAnswer};
use tracing::info;

pub use faq::{FaqKnowledgeBase, FaqRecord};
pub use language_service::{LanguageServiceQa, LanguageServiceQaConfig};

/// Boundary to the question-answering backend. Answers come back best first.
pub trait QuestionAnswering: Send + Sync {
    async fn get_answers(&self, utterance: &str) -> Result<Vec<QaAnswer>, BackendError>;
}

#[derive(Clone)]
pub enum QaService {
    Local(FaqKnowledgeBase),
    LanguageService(LanguageServiceQa),
}

impl QaService {
    /// Hosted knowledge base when configured, the local FAQ directory otherwise.
    pub fn from_config(config: Option<LanguageServiceQaConfig>, kb_root: impl AsRef<Path>) -> Result<Self> {
        match config {
            Some(config) => Ok(Self::LanguageService(LanguageServiceQa::new(config)?)),
            None => {
                let kb_root = kb_root.as_ref();
                let faq = FaqKnowledgeBase::from_dir(kb_root).with_context(|| {
                    format!("failed loading knowledge base from {}", kb_root.display())
                })?;
                info!(
                    entries = faq.len(),
                    sources = ?faq.sources(),
                    root = %kb_root.display(),
                    "local faq loaded"
                );
                Ok(Self::Local(faq))
            }
        }
    }
}

impl QuestionAnswering for QaService {
    async fn get_answers(&self, utterance: &str) -> Result<Vec<QaAnswer>, BackendError> {
        match self {
            QaService::Local(kb) => kb.get_answers(utterance).await,
            QaService::LanguageService(qa) => qa.get_answers(utterance).await,
        }
    }
}
