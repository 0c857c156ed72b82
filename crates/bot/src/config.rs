use std::env;
use std::path::PathBuf;

use denta_core::{ConfigurationError, MissingDatePolicy, RoutingPolicy, RoutingThresholds};
use denta_nlu::LanguageServiceConfig;
use denta_qa::LanguageServiceQaConfig;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub policy: RoutingPolicy,
    pub bot_id: String,
    pub classifier: Option<LanguageServiceConfig>,
    pub qa: Option<LanguageServiceQaConfig>,
    pub scheduler_url: Option<String>,
    pub kb_root: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            policy: RoutingPolicy::default(),
            bot_id: "denta-bot".to_string(),
            classifier: None,
            qa: None,
            scheduler_url: None,
            kb_root: PathBuf::from("kb"),
        }
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let thresholds = RoutingThresholds::new(
            parse_f32(get("DENTA_AVAILABILITY_THRESHOLD"), "DENTA_AVAILABILITY_THRESHOLD")?
                .unwrap_or(defaults.policy.thresholds.availability),
            parse_f32(get("DENTA_SCHEDULE_THRESHOLD"), "DENTA_SCHEDULE_THRESHOLD")?
                .unwrap_or(defaults.policy.thresholds.schedule),
        )?;

        let missing_date = match get("DENTA_MISSING_DATE_POLICY") {
            Some(value) => {
                MissingDatePolicy::parse(&value).ok_or_else(|| ConfigurationError::Invalid {
                    key: "DENTA_MISSING_DATE_POLICY".to_string(),
                    message: format!("expected default_today or require_entity, got {value}"),
                })?
            }
            None => defaults.policy.missing_date,
        };

        let classifier = service_group(
            &get,
            [
                "DENTA_CLU_ENDPOINT",
                "DENTA_CLU_KEY",
                "DENTA_CLU_PROJECT",
                "DENTA_CLU_DEPLOYMENT",
            ],
        )?
        .map(|[endpoint, api_key, project_name, deployment_name]| LanguageServiceConfig {
            endpoint,
            api_key,
            project_name,
            deployment_name,
        });

        let qa = service_group(
            &get,
            [
                "DENTA_QA_ENDPOINT",
                "DENTA_QA_KEY",
                "DENTA_QA_PROJECT",
                "DENTA_QA_DEPLOYMENT",
            ],
        )?
        .map(|[endpoint, api_key, project_name, deployment_name]| LanguageServiceQaConfig {
            endpoint,
            api_key,
            project_name,
            deployment_name,
        });

        Ok(Self {
            policy: RoutingPolicy {
                thresholds,
                missing_date,
            },
            bot_id: get("DENTA_BOT_ID").unwrap_or(defaults.bot_id),
            classifier,
            qa,
            scheduler_url: get("DENTA_SCHEDULER_URL"),
            kb_root: get("DENTA_KB_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.kb_root),
        })
    }
}

fn parse_f32(value: Option<String>, key: &str) -> Result<Option<f32>, ConfigurationError> {
    value
        .map(|raw| {
            raw.parse::<f32>().map_err(|err| ConfigurationError::Invalid {
                key: key.to_string(),
                message: err.to_string(),
            })
        })
        .transpose()
}

/// All keys set, or none; a partial group is a credentials mistake.
fn service_group<F>(get: &F, keys: [&str; 4]) -> Result<Option<[String; 4]>, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    let values = keys.map(get);
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }

    if let Some(missing) = keys
        .iter()
        .zip(values.iter())
        .find(|(_, value)| value.is_none())
        .map(|(key, _)| key)
    {
        return Err(ConfigurationError::Missing(missing.to_string()));
    }

    Ok(Some(values.map(Option::unwrap_or_default)))
}
