use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;

pub const GET_AVAILABILITY: &str = "GetAvailability";
pub const SCHEDULE_APPOINTMENT: &str = "ScheduleAppointment";
pub const NO_INTENT: &str = "None";

pub const DATE_ENTITY: &str = "Date";
pub const TIME_ENTITY: &str = "Time";

/// Half-open range of an entity inside the utterance, as reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityOccurrence {
    pub text: String,
    pub span: Span,
}

impl EntityOccurrence {
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            span: Span { start, end },
        }
    }
}

/// Output of the intent classifier for a single utterance.
///
/// Built fresh per message by a classifier adapter and consumed by exactly
/// one routing call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub top_intent: String,
    pub intent_scores: HashMap<String, f32>,
    pub entities: HashMap<String, Vec<EntityOccurrence>>,
}

impl ClassificationResult {
    pub fn new(top_intent: impl Into<String>) -> Self {
        Self {
            top_intent: top_intent.into(),
            ..Self::default()
        }
    }

    pub fn with_score(mut self, intent: impl Into<String>, score: f32) -> Self {
        self.intent_scores.insert(intent.into(), score);
        self
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, occurrence: EntityOccurrence) -> Self {
        self.entities
            .entry(entity_type.into())
            .or_default()
            .push(occurrence);
        self
    }

    /// Missing scores count as zero confidence.
    pub fn score(&self, intent: &str) -> f32 {
        self.intent_scores.get(intent).copied().unwrap_or(0.0)
    }

    pub fn top_score(&self) -> f32 {
        self.score(&self.top_intent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoutingDecision {
    CheckAvailability { date: String },
    ScheduleAppointment { time: String },
    AnswerQuestion,
    Fallback,
}

impl RoutingDecision {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CheckAvailability { .. } => "check_availability",
            Self::ScheduleAppointment { .. } => "schedule_appointment",
            Self::AnswerQuestion => "answer_question",
            Self::Fallback => "fallback",
        }
    }
}

/// What to do when an availability query carries no Date entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDatePolicy {
    #[default]
    DefaultToday,
    RequireEntity,
}

impl MissingDatePolicy {
    pub const DEFAULT_DATE: &'static str = "today";

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "default_today" | "today" => Some(Self::DefaultToday),
            "require_entity" | "strict" => Some(Self::RequireEntity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutingThresholds {
    pub availability: f32,
    pub schedule: f32,
}

impl RoutingThresholds {
    pub fn new(availability: f32, schedule: f32) -> Result<Self, ConfigurationError> {
        for (name, value) in [(GET_AVAILABILITY, availability), (SCHEDULE_APPOINTMENT, schedule)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::InvalidThreshold {
                    intent: name.to_string(),
                    value,
                });
            }
        }

        Ok(Self {
            availability,
            schedule,
        })
    }
}

impl Default for RoutingThresholds {
    fn default() -> Self {
        Self {
            availability: 0.7,
            schedule: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingPolicy {
    pub thresholds: RoutingThresholds,
    pub missing_date: MissingDatePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaAnswer {
    pub answer: String,
    pub confidence: f32,
}

impl QaAnswer {
    pub fn new(answer: impl Into<String>, confidence: f32) -> Self {
        Self {
            answer: answer.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}
