use std::collections::HashMap;

use denta_core::{
    ClassificationError, ClassificationResult, ConfigurationError, EntityOccurrence,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use crate::IntentClassifier;

const API_VERSION: &str = "2022-10-01-preview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageServiceConfig {
    pub endpoint: String,
    pub api_key: String,
    pub project_name: String,
    pub deployment_name: String,
}

/// Conversational language understanding deployment reached over HTTPS.
#[derive(Clone)]
pub struct LanguageServiceClassifier {
    client: Client,
    url: Url,
    config: LanguageServiceConfig,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    result: AnalyzeResult,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    prediction: Prediction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    top_intent: Option<String>,
    #[serde(default)]
    intents: Vec<PredictedIntent>,
    #[serde(default)]
    entities: Vec<PredictedEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictedIntent {
    category: String,
    confidence_score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictedEntity {
    category: String,
    text: String,
    offset: usize,
    length: usize,
}

impl LanguageServiceClassifier {
    pub fn new(config: LanguageServiceConfig, client: Client) -> Result<Self, ConfigurationError> {
        let invalid = |message: String| ConfigurationError::Invalid {
            key: "DENTA_CLU_ENDPOINT".to_string(),
            message,
        };

        let mut url = Url::parse(&config.endpoint)
            .and_then(|base| base.join("language/:analyze-conversations"))
            .map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        url.query_pairs_mut().append_pair("api-version", API_VERSION);

        Ok(Self {
            client,
            url,
            config,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl IntentClassifier for LanguageServiceClassifier {
    #[instrument(skip(self, utterance), fields(project = %self.config.project_name))]
    async fn execute_query(&self, utterance: &str) -> Result<ClassificationResult, ClassificationError> {
        let body = json!({
            "kind": "Conversation",
            "analysisInput": {
                "conversationItem": {
                    "id": "1",
                    "participantId": "user",
                    "text": utterance
                }
            },
            "parameters": {
                "projectName": self.config.project_name,
                "deploymentName": self.config.deployment_name,
                "stringIndexType": "TextElement_V8"
            }
        });

        let response = self
            .client
            .post(self.url.clone())
            .header("Ocp-Apim-Subscription-Key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ClassificationError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClassificationError::Auth(format!("status {status}")));
        }
        if !status.is_success() {
            return Err(ClassificationError::Transport(format!("status {status}")));
        }

        let parsed = response
            .json::<AnalyzeResponse>()
            .await
            .map_err(|err| ClassificationError::Malformed(err.to_string()))?;

        let result = into_classification(parsed.result.prediction)?;
        debug!(?result, "classification received");
        Ok(result)
    }

    fn model_name(&self) -> &'static str {
        "language-service"
    }
}

fn into_classification(prediction: Prediction) -> Result<ClassificationResult, ClassificationError> {
    let top_intent = prediction
        .top_intent
        .map(|intent| intent.trim().to_string())
        .filter(|intent| !intent.is_empty())
        .ok_or_else(|| ClassificationError::Malformed("prediction has no top intent".to_string()))?;

    let intent_scores = prediction
        .intents
        .into_iter()
        .map(|intent| {
            let score = if intent.confidence_score.is_finite() {
                intent.confidence_score.clamp(0.0, 1.0)
            } else {
                0.0
            };
            (intent.category, score)
        })
        .collect::<HashMap<_, _>>();

    let mut entities: HashMap<String, Vec<EntityOccurrence>> = HashMap::new();
    for entity in prediction.entities {
        let end = entity.offset.checked_add(entity.length).ok_or_else(|| {
            ClassificationError::Malformed(format!(
                "entity {} span overflows (offset {}, length {})",
                entity.category, entity.offset, entity.length
            ))
        })?;
        entities
            .entry(entity.category)
            .or_default()
            .push(EntityOccurrence::new(entity.text, entity.offset, end));
    }
    for occurrences in entities.values_mut() {
        occurrences.sort_by_key(|occurrence| occurrence.span.start);
    }

    Ok(ClassificationResult {
        top_intent,
        intent_scores,
        entities,
    })
}
