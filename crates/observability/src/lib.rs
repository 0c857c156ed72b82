use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use denta_core::RoutingDecision;
use metrics::counter;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct BotMetrics {
    messages_total: AtomicU64,
    availability_total: AtomicU64,
    schedule_total: AtomicU64,
    answered_total: AtomicU64,
    fallback_total: AtomicU64,
    classifier_failures_total: AtomicU64,
    backend_failures_total: AtomicU64,
    welcomes_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub messages_total: u64,
    pub availability_total: u64,
    pub schedule_total: u64,
    pub answered_total: u64,
    pub fallback_total: u64,
    pub classifier_failures_total: u64,
    pub backend_failures_total: u64,
    pub welcomes_total: u64,
    pub avg_latency_millis: f64,
}

impl BotMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_message(&self) {
        self.messages_total.fetch_add(1, Ordering::Relaxed);
        counter!("denta_messages_total").increment(1);
    }

    pub fn record_decision(&self, decision: &RoutingDecision) {
        let slot = match decision {
            RoutingDecision::CheckAvailability { .. } => &self.availability_total,
            RoutingDecision::ScheduleAppointment { .. } => &self.schedule_total,
            RoutingDecision::AnswerQuestion => &self.answered_total,
            RoutingDecision::Fallback => &self.fallback_total,
        };
        slot.fetch_add(1, Ordering::Relaxed);
        counter!("denta_decisions_total", "decision" => decision.label()).increment(1);
    }

    pub fn inc_classifier_failure(&self) {
        self.classifier_failures_total.fetch_add(1, Ordering::Relaxed);
        counter!("denta_classifier_failures_total").increment(1);
    }

    pub fn inc_backend_failure(&self) {
        self.backend_failures_total.fetch_add(1, Ordering::Relaxed);
        counter!("denta_backend_failures_total").increment(1);
    }

    pub fn add_welcomes(&self, count: usize) {
        self.welcomes_total.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let messages = self.messages_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            messages_total: messages,
            availability_total: self.availability_total.load(Ordering::Relaxed),
            schedule_total: self.schedule_total.load(Ordering::Relaxed),
            answered_total: self.answered_total.load(Ordering::Relaxed),
            fallback_total: self.fallback_total.load(Ordering::Relaxed),
            classifier_failures_total: self.classifier_failures_total.load(Ordering::Relaxed),
            backend_failures_total: self.backend_failures_total.load(Ordering::Relaxed),
            welcomes_total: self.welcomes_total.load(Ordering::Relaxed),
            avg_latency_millis: if messages == 0 {
                0.0
            } else {
                latency as f64 / messages as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}=info,denta_bot=info", service_name))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_counts_decisions() {
        let metrics = BotMetrics::default();
        metrics.inc_message();
        metrics.inc_message();
        metrics.record_decision(&RoutingDecision::AnswerQuestion);
        metrics.record_decision(&RoutingDecision::ScheduleAppointment {
            time: "3pm".to_string(),
        });
        metrics.observe_latency(Duration::from_millis(10));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_total, 2);
        assert_eq!(snapshot.answered_total, 1);
        assert_eq!(snapshot.schedule_total, 1);
        assert_eq!(snapshot.avg_latency_millis, 5.0);
    }
}
