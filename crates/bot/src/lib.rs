mod config;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use denta_core::{
    normalize_text, resolve_answer_or_fallback, welcome_recipients, BackendError,
    ClassificationError, ClassificationResult, IntentRouter, Participant, RoutingDecision,
    NO_ANSWER_TEXT, WELCOME_TEXT,
};
use denta_nlu::{Classifier, IntentClassifier};
use denta_observability::BotMetrics;
use denta_qa::{QaService, QuestionAnswering};
use denta_scheduler::{Scheduler, SchedulerBackend};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

pub use config::BotConfig;

pub const UNABLE_TO_PROCESS_TEXT: &str =
    "Sorry, I was unable to process your message right now. Please try again.";
pub const SCHEDULER_UNAVAILABLE_TEXT: &str =
    "Sorry, our scheduling system is unavailable at the moment. Please try again later.";
pub const ANSWERS_UNAVAILABLE_TEXT: &str =
    "Sorry, I can't look up answers right now. Please try again later.";

/// Outbound side of a conversation turn.
pub trait TurnContext: Send + Sync {
    async fn send_activity(&self, text: &str);
}

/// Collects outbound messages instead of delivering them.
#[derive(Debug, Default)]
pub struct CollectedActivities {
    sent: Mutex<Vec<String>>,
}

impl CollectedActivities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn into_messages(self) -> Vec<String> {
        self.sent.into_inner()
    }
}

impl TurnContext for CollectedActivities {
    async fn send_activity(&self, text: &str) {
        self.sent.lock().push(text.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub decision: RoutingDecision,
    pub reply: String,
    pub degraded: bool,
}

impl TurnOutcome {
    fn ok(decision: RoutingDecision, reply: String) -> Self {
        Self {
            decision,
            reply,
            degraded: false,
        }
    }

    fn degraded(decision: RoutingDecision, reply: &str) -> Self {
        Self {
            decision,
            reply: reply.to_string(),
            degraded: true,
        }
    }
}

pub type ConfiguredBot = DentaBot<Classifier, Scheduler, QaService>;

/// Conversation shell: classify, route, call one handler, answer once.
pub struct DentaBot<C, S, Q> {
    classifier: C,
    scheduler: S,
    qa: Q,
    router: IntentRouter,
    metrics: Arc<BotMetrics>,
}

impl<C, S, Q> DentaBot<C, S, Q>
where
    C: IntentClassifier,
    S: SchedulerBackend,
    Q: QuestionAnswering,
{
    pub fn new(classifier: C, scheduler: S, qa: Q, router: IntentRouter, metrics: Arc<BotMetrics>) -> Self {
        Self {
            classifier,
            scheduler,
            qa,
            router,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<BotMetrics> {
        &self.metrics
    }

    pub async fn classify_and_route(
        &self,
        utterance: &str,
    ) -> Result<(ClassificationResult, RoutingDecision), ClassificationError> {
        let classification = self.classifier.execute_query(utterance).await?;
        debug!(?classification, model = self.classifier.model_name(), "classification result");
        let decision = self.router.route(&classification);
        Ok((classification, decision))
    }

    /// Handles one inbound message. Exactly one activity is sent, even on failure.
    #[instrument(skip(self, ctx, text))]
    pub async fn on_message<T: TurnContext>(&self, ctx: &T, text: &str) -> TurnOutcome {
        let started = Instant::now();
        self.metrics.inc_message();

        let utterance = normalize_text(text);
        let outcome = if utterance.is_empty() {
            TurnOutcome::ok(RoutingDecision::Fallback, NO_ANSWER_TEXT.to_string())
        } else {
            self.respond(&utterance).await
        };

        self.metrics.record_decision(&outcome.decision);
        ctx.send_activity(&outcome.reply).await;
        self.metrics.observe_latency(started.elapsed());

        info!(
            decision = outcome.decision.label(),
            degraded = outcome.degraded,
            latency_ms = started.elapsed().as_millis() as u64,
            "message handled"
        );
        outcome
    }

    /// Greets every added member except the bot itself; returns how many were greeted.
    pub async fn on_members_added<T: TurnContext>(
        &self,
        ctx: &T,
        recipient_id: &str,
        members_added: &[Participant],
    ) -> usize {
        let mut greeted = 0;
        for member in welcome_recipients(recipient_id, members_added) {
            debug!(member = %member.id, "welcoming member");
            ctx.send_activity(WELCOME_TEXT).await;
            greeted += 1;
        }
        self.metrics.add_welcomes(greeted);
        greeted
    }

    async fn respond(&self, utterance: &str) -> TurnOutcome {
        let decision = match self.classify_and_route(utterance).await {
            Ok((_, decision)) => decision,
            Err(err) => {
                warn!(error = %err, "classification failed");
                self.metrics.inc_classifier_failure();
                return TurnOutcome::degraded(RoutingDecision::Fallback, UNABLE_TO_PROCESS_TEXT);
            }
        };

        match &decision {
            RoutingDecision::CheckAvailability { date } => {
                match self.scheduler.get_availability().await {
                    Ok(slots) => {
                        let reply = format!("{} for {}", slots, date);
                        TurnOutcome::ok(decision.clone(), reply)
                    }
                    Err(err) => self.backend_failed(decision.clone(), err, SCHEDULER_UNAVAILABLE_TEXT),
                }
            }
            RoutingDecision::ScheduleAppointment { time } => {
                match self.scheduler.schedule_appointment(time).await {
                    Ok(confirmation) => TurnOutcome::ok(decision.clone(), confirmation),
                    Err(err) => self.backend_failed(decision.clone(), err, SCHEDULER_UNAVAILABLE_TEXT),
                }
            }
            RoutingDecision::AnswerQuestion | RoutingDecision::Fallback => {
                match self.qa.get_answers(utterance).await {
                    Ok(answers) => {
                        let (reply, decision) = resolve_answer_or_fallback(&answers);
                        TurnOutcome::ok(decision, reply)
                    }
                    Err(err) => self.backend_failed(
                        RoutingDecision::AnswerQuestion,
                        err,
                        ANSWERS_UNAVAILABLE_TEXT,
                    ),
                }
            }
        }
    }

    fn backend_failed(&self, decision: RoutingDecision, err: BackendError, reply: &str) -> TurnOutcome {
        warn!(error = %err, service = err.service(), decision = decision.label(), "handler failed");
        self.metrics.inc_backend_failure();
        TurnOutcome::degraded(decision, reply)
    }
}

impl ConfiguredBot {
    /// Builds every collaborator once from `config`.
    pub fn from_config(config: &BotConfig, metrics: Arc<BotMetrics>) -> Result<Self> {
        let classifier = Classifier::from_config(config.classifier.clone())?;
        let scheduler = Scheduler::from_config(config.scheduler_url.as_deref())?;
        let qa = QaService::from_config(config.qa.clone(), &config.kb_root)?;

        info!(
            classifier = classifier.model_name(),
            hosted_qa = config.qa.is_some(),
            remote_scheduler = config.scheduler_url.is_some(),
            missing_date = ?config.policy.missing_date,
            "bot collaborators ready"
        );

        Ok(Self::new(
            classifier,
            scheduler,
            qa,
            IntentRouter::new(config.policy),
            metrics,
        ))
    }
}
