use tracing::debug;

use crate::entities::extract_first;
use crate::models::{
    ClassificationResult, MissingDatePolicy, RoutingDecision, RoutingPolicy,
    DATE_ENTITY, GET_AVAILABILITY, SCHEDULE_APPOINTMENT, TIME_ENTITY,
};

/// Turns one classification result into exactly one action.
///
/// Only the classifier's top intent is consulted. Secondary intents are never
/// promoted, whatever their score. Specific actions require the score to be
/// strictly above the configured threshold and, for scheduling, a Time entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentRouter {
    policy: RoutingPolicy,
}

impl IntentRouter {
    pub fn new(policy: RoutingPolicy) -> Self {
        Self { policy }
    }

    pub fn route(&self, result: &ClassificationResult) -> RoutingDecision {
        let decision = self.decide(result);
        debug!(
            top_intent = %result.top_intent,
            score = result.top_score(),
            decision = decision.label(),
            "routed message"
        );
        decision
    }

    fn decide(&self, result: &ClassificationResult) -> RoutingDecision {
        let thresholds = &self.policy.thresholds;

        if result.top_intent == GET_AVAILABILITY
            && result.score(GET_AVAILABILITY) > thresholds.availability
        {
            match extract_first(&result.entities, DATE_ENTITY) {
                Some(date) => {
                    return RoutingDecision::CheckAvailability {
                        date: date.to_string(),
                    }
                }
                None if self.policy.missing_date == MissingDatePolicy::DefaultToday => {
                    return RoutingDecision::CheckAvailability {
                        date: MissingDatePolicy::DEFAULT_DATE.to_string(),
                    }
                }
                None => {}
            }
        } else if result.top_intent == SCHEDULE_APPOINTMENT
            && result.score(SCHEDULE_APPOINTMENT) > thresholds.schedule
        {
            if let Some(time) = extract_first(&result.entities, TIME_ENTITY) {
                return RoutingDecision::ScheduleAppointment {
                    time: time.to_string(),
                };
            }
        }

        RoutingDecision::AnswerQuestion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityOccurrence, RoutingThresholds, NO_INTENT};

    fn availability(score: f32, date: Option<&str>) -> ClassificationResult {
        let result = ClassificationResult::new(GET_AVAILABILITY).with_score(GET_AVAILABILITY, score);
        match date {
            Some(date) => result.with_entity(DATE_ENTITY, EntityOccurrence::new(date, 0, date.len())),
            None => result,
        }
    }

    fn schedule(score: f32, time: Option<&str>) -> ClassificationResult {
        let result =
            ClassificationResult::new(SCHEDULE_APPOINTMENT).with_score(SCHEDULE_APPOINTMENT, score);
        match time {
            Some(time) => result.with_entity(TIME_ENTITY, EntityOccurrence::new(time, 0, time.len())),
            None => result,
        }
    }

    fn strict() -> IntentRouter {
        IntentRouter::new(RoutingPolicy {
            missing_date: MissingDatePolicy::RequireEntity,
            ..RoutingPolicy::default()
        })
    }

    #[test]
    fn availability_with_date_uses_exact_text() {
        let decision = IntentRouter::default().route(&availability(0.85, Some("tomorrow")));
        assert_eq!(
            decision,
            RoutingDecision::CheckAvailability {
                date: "tomorrow".to_string()
            }
        );
    }

    #[test]
    fn availability_without_date_defaults_to_today() {
        let decision = IntentRouter::default().route(&availability(0.85, None));
        assert_eq!(
            decision,
            RoutingDecision::CheckAvailability {
                date: "today".to_string()
            }
        );
    }

    #[test]
    fn availability_without_date_falls_through_when_strict() {
        assert_eq!(
            strict().route(&availability(0.85, None)),
            RoutingDecision::AnswerQuestion
        );
        assert_eq!(
            strict().route(&availability(0.85, Some("monday"))),
            RoutingDecision::CheckAvailability {
                date: "monday".to_string()
            }
        );
    }

    #[test]
    fn schedule_with_time_books_that_time() {
        let decision = IntentRouter::default().route(&schedule(0.75, Some("3pm")));
        assert_eq!(
            decision,
            RoutingDecision::ScheduleAppointment {
                time: "3pm".to_string()
            }
        );
    }

    #[test]
    fn schedule_without_time_never_books() {
        for router in [IntentRouter::default(), strict()] {
            assert_eq!(
                router.route(&schedule(0.99, None)),
                RoutingDecision::AnswerQuestion
            );
        }
    }

    #[test]
    fn scores_at_or_below_threshold_answer_questions() {
        let router = IntentRouter::default();
        for score in [0.0, 0.3, 0.7] {
            assert_eq!(
                router.route(&availability(score, Some("tomorrow"))),
                RoutingDecision::AnswerQuestion
            );
            assert_eq!(
                router.route(&schedule(score, Some("3pm"))),
                RoutingDecision::AnswerQuestion
            );
        }
    }

    #[test]
    fn custom_thresholds_are_respected() {
        let router = IntentRouter::new(RoutingPolicy {
            thresholds: RoutingThresholds::new(0.6, 0.9).unwrap(),
            missing_date: MissingDatePolicy::DefaultToday,
        });
        assert!(matches!(
            router.route(&availability(0.65, Some("friday"))),
            RoutingDecision::CheckAvailability { .. }
        ));
        assert_eq!(
            router.route(&schedule(0.85, Some("3pm"))),
            RoutingDecision::AnswerQuestion
        );
    }

    #[test]
    fn secondary_intents_are_never_promoted() {
        let result = ClassificationResult::new(NO_INTENT)
            .with_score(NO_INTENT, 0.2)
            .with_score(SCHEDULE_APPOINTMENT, 0.95)
            .with_entity(TIME_ENTITY, EntityOccurrence::new("3pm", 0, 3));
        assert_eq!(
            IntentRouter::default().route(&result),
            RoutingDecision::AnswerQuestion
        );
    }

    #[test]
    fn missing_top_score_counts_as_zero() {
        let result = ClassificationResult::new(GET_AVAILABILITY)
            .with_entity(DATE_ENTITY, EntityOccurrence::new("today", 0, 5));
        assert_eq!(
            IntentRouter::default().route(&result),
            RoutingDecision::AnswerQuestion
        );
    }

    #[test]
    fn time_entity_does_not_satisfy_availability_date() {
        let result = availability(0.9, None).with_entity(TIME_ENTITY, EntityOccurrence::new("3pm", 0, 3));
        assert_eq!(strict().route(&result), RoutingDecision::AnswerQuestion);
    }
}
