mod language_service;
mod rules;

use std::time::Duration;

use denta_core::{ClassificationError, ClassificationResult, ConfigurationError};
use reqwest::Client;

pub use language_service::{LanguageServiceClassifier, LanguageServiceConfig};
pub use rules::RuleClassifier;

/// Boundary to the natural-language understanding service.
pub trait IntentClassifier: Send + Sync {
    async fn execute_query(&self, utterance: &str) -> Result<ClassificationResult, ClassificationError>;

    fn model_name(&self) -> &'static str;
}

#[derive(Clone)]
pub enum Classifier {
    LanguageService(LanguageServiceClassifier),
    Rules(RuleClassifier),
}

impl Classifier {
    /// Hosted classifier when configured, offline rules otherwise.
    pub fn from_config(config: Option<LanguageServiceConfig>) -> Result<Self, ConfigurationError> {
        match config {
            Some(config) => Ok(Self::LanguageService(LanguageServiceClassifier::new(
                config,
                http_client()?,
            )?)),
            None => Ok(Self::Rules(RuleClassifier::new())),
        }
    }
}

impl IntentClassifier for Classifier {
    async fn execute_query(&self, utterance: &str) -> Result<ClassificationResult, ClassificationError> {
        match self {
            Classifier::LanguageService(classifier) => classifier.execute_query(utterance).await,
            Classifier::Rules(classifier) => classifier.execute_query(utterance).await,
        }
    }

    fn model_name(&self) -> &'static str {
        match self {
            Classifier::LanguageService(classifier) => classifier.model_name(),
            Classifier::Rules(classifier) => classifier.model_name(),
        }
    }
}

fn http_client() -> Result<Client, ConfigurationError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(6))
        .timeout(Duration::from_secs(20))
        .build()
        .map_err(|err| ConfigurationError::Invalid {
            key: "http_client".to_string(),
            message: err.to_string(),
        })
}
