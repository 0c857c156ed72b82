use crate::models::{QaAnswer, RoutingDecision};

pub const NO_ANSWER_TEXT: &str = "I'm not sure I can answer your question";

/// Top-ranked answer text; the backend's ordering is trusted as-is.
pub fn resolve_answer(results: &[QaAnswer]) -> String {
    resolve_answer_or_fallback(results).0
}

/// Same as [`resolve_answer`], also reporting whether the fixed fallback was used.
pub fn resolve_answer_or_fallback(results: &[QaAnswer]) -> (String, RoutingDecision) {
    match results.first() {
        Some(top) => (top.answer.clone(), RoutingDecision::AnswerQuestion),
        None => (NO_ANSWER_TEXT.to_string(), RoutingDecision::Fallback),
    }
}
