use std::time::Duration;

use denta_core::{BackendError, ConfigurationError, QaAnswer};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use crate::QuestionAnswering;

const SERVICE: &str = "question answering";
const API_VERSION: &str = "2021-10-01";
const TOP_ANSWERS: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageServiceQaConfig {
    pub endpoint: String,
    pub api_key: String,
    pub project_name: String,
    pub deployment_name: String,
}

/// Custom question answering project reached over HTTPS.
#[derive(Clone)]
pub struct LanguageServiceQa {
    client: Client,
    url: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    answers: Vec<RawAnswer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnswer {
    answer: String,
    confidence_score: f32,
    id: Option<i64>,
}

impl LanguageServiceQa {
    pub fn new(config: LanguageServiceQaConfig) -> Result<Self, ConfigurationError> {
        let invalid = |message: String| ConfigurationError::Invalid {
            key: "DENTA_QA_ENDPOINT".to_string(),
            message,
        };

        let mut url = Url::parse(&config.endpoint)
            .and_then(|base| base.join("language/:query-knowledgebases"))
            .map_err(|err| invalid(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("projectName", &config.project_name)
            .append_pair("deploymentName", &config.deployment_name)
            .append_pair("api-version", API_VERSION);

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|err| invalid(err.to_string()))?;

        Ok(Self {
            client,
            url,
            api_key: config.api_key,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl QuestionAnswering for LanguageServiceQa {
    #[instrument(skip(self, utterance))]
    async fn get_answers(&self, utterance: &str) -> Result<Vec<QaAnswer>, BackendError> {
        let response = self
            .client
            .post(self.url.clone())
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .json(&json!({ "question": utterance, "top": TOP_ANSWERS }))
            .send()
            .await
            .map_err(|err| BackendError::unavailable(SERVICE, err.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(BackendError::unavailable(SERVICE, format!("status {status}")));
        }
        if !status.is_success() {
            return Err(BackendError::rejected(SERVICE, format!("status {status}")));
        }

        let parsed = response
            .json::<QueryResponse>()
            .await
            .map_err(|err| BackendError::malformed(SERVICE, err.to_string()))?;

        let answers = into_answers(parsed);
        debug!(answers = answers.len(), "knowledge base answered");
        Ok(answers)
    }
}

/// The service reports "no match" as a default answer with id -1.
fn into_answers(response: QueryResponse) -> Vec<QaAnswer> {
    response
        .answers
        .into_iter()
        .filter(|answer| answer.id != Some(-1))
        .filter(|answer| !answer.answer.trim().is_empty())
        .map(|answer| QaAnswer::new(answer.answer, answer.confidence_score))
        .collect()
}
