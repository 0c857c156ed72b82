use denta_core::{
    ClassificationError, ClassificationResult, EntityOccurrence, DATE_ENTITY, GET_AVAILABILITY,
    NO_INTENT, SCHEDULE_APPOINTMENT, TIME_ENTITY,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::IntentClassifier;

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(today|tomorrow|tonight|monday|tuesday|wednesday|thursday|friday|saturday|sunday|\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2})\b",
    )
    .expect("valid date regex")
});

static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}(?::\d{2})?\s?(?:am|pm)|\d{1,2}:\d{2}|noon)\b")
        .expect("valid time regex")
});

static SCHEDULE_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(book(?:ing)?|schedul(?:e|ing)|reserve|make an appointment|set up an appointment)\b",
    )
    .expect("valid schedule keyword regex")
});

static AVAILABILITY_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(available|availability|what times|open slots?|openings|free slots?|times are open)\b",
    )
    .expect("valid availability keyword regex")
});

const MATCH_CONFIDENCE: f32 = 0.85;
const NO_MATCH_CONFIDENCE: f32 = 0.5;

/// Offline keyword classifier used when no hosted service is configured.
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, utterance: &str) -> ClassificationResult {
        let top_intent = if SCHEDULE_KEYWORDS.is_match(utterance) {
            SCHEDULE_APPOINTMENT
        } else if AVAILABILITY_KEYWORDS.is_match(utterance) {
            GET_AVAILABILITY
        } else {
            NO_INTENT
        };

        let confidence = if top_intent == NO_INTENT {
            NO_MATCH_CONFIDENCE
        } else {
            MATCH_CONFIDENCE
        };

        let mut result = ClassificationResult::new(top_intent).with_score(top_intent, confidence);
        if top_intent != NO_INTENT {
            result = result.with_score(NO_INTENT, 1.0 - confidence);
        }

        for found in DATE_PATTERN.find_iter(utterance) {
            result = result.with_entity(
                DATE_ENTITY,
                EntityOccurrence::new(found.as_str(), found.start(), found.end()),
            );
        }
        for found in TIME_PATTERN.find_iter(utterance) {
            result = result.with_entity(
                TIME_ENTITY,
                EntityOccurrence::new(found.as_str(), found.start(), found.end()),
            );
        }

        result
    }
}

impl IntentClassifier for RuleClassifier {
    async fn execute_query(&self, utterance: &str) -> Result<ClassificationResult, ClassificationError> {
        Ok(self.classify(utterance))
    }

    fn model_name(&self) -> &'static str {
        "rules"
    }
}
