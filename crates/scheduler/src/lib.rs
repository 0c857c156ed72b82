use std::sync::Arc;
use std::time::Duration;

use denta_core::{BackendError, ConfigurationError};
use parking_lot::RwLock;
use reqwest::Client;
use serde_json::json;
use tracing::{info, instrument};
use url::Url;

const SERVICE: &str = "scheduler";

pub const DEFAULT_SLOTS: [&str; 8] = ["8am", "9am", "10am", "11am", "1pm", "2pm", "3pm", "4pm"];

/// Boundary to the appointment backend.
pub trait SchedulerBackend: Send + Sync {
    /// Human-readable summary of the currently open slots.
    async fn get_availability(&self) -> Result<String, BackendError>;

    /// Confirmation or rejection text for booking `time`.
    async fn schedule_appointment(&self, time: &str) -> Result<String, BackendError>;
}

/// In-process slot book for local runs and tests. Nothing is persisted.
#[derive(Clone)]
pub struct MemorySchedule {
    open_slots: Arc<RwLock<Vec<String>>>,
}

impl Default for MemorySchedule {
    fn default() -> Self {
        Self::with_slots(DEFAULT_SLOTS)
    }
}

impl MemorySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slots<I, S>(slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            open_slots: Arc::new(RwLock::new(slots.into_iter().map(Into::into).collect())),
        }
    }

    pub fn open_slots(&self) -> Vec<String> {
        self.open_slots.read().clone()
    }
}

impl SchedulerBackend for MemorySchedule {
    async fn get_availability(&self) -> Result<String, BackendError> {
        let slots = self.open_slots.read();
        if slots.is_empty() {
            return Ok("There are no time slots available".to_string());
        }
        Ok(format!("Current time slots available: {}", slots.join(", ")))
    }

    async fn schedule_appointment(&self, time: &str) -> Result<String, BackendError> {
        let wanted = slot_key(time);
        let mut slots = self.open_slots.write();

        match slots.iter().position(|slot| slot_key(slot) == wanted) {
            Some(index) => {
                let slot = slots.remove(index);
                info!(slot = %slot, "appointment booked");
                Ok(format!("An appointment is set for {}.", slot))
            }
            None => Ok(format!("Sorry, {} is not available.", time.trim())),
        }
    }
}

/// Remote scheduler API: `GET /availability`, `POST /schedule`.
#[derive(Clone)]
pub struct HttpScheduler {
    client: Client,
    base_url: Url,
}

impl HttpScheduler {
    pub fn new(base_url: &str) -> Result<Self, ConfigurationError> {
        let invalid = |message: String| ConfigurationError::Invalid {
            key: "DENTA_SCHEDULER_URL".to_string(),
            message,
        };

        let mut base_url = Url::parse(base_url).map_err(|err| invalid(err.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|err| invalid(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|err| BackendError::malformed(SERVICE, err.to_string()))
    }

    async fn read_text(response: reqwest::Response) -> Result<String, BackendError> {
        let status = response.status();
        if status.is_server_error() {
            return Err(BackendError::unavailable(SERVICE, format!("status {status}")));
        }
        if !status.is_success() {
            return Err(BackendError::rejected(SERVICE, format!("status {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|err| BackendError::malformed(SERVICE, err.to_string()))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(BackendError::malformed(SERVICE, "empty response body"));
        }
        Ok(text.to_string())
    }
}

impl SchedulerBackend for HttpScheduler {
    #[instrument(skip(self))]
    async fn get_availability(&self) -> Result<String, BackendError> {
        let response = self
            .client
            .get(self.endpoint("availability")?)
            .send()
            .await
            .map_err(|err| BackendError::unavailable(SERVICE, err.to_string()))?;
        Self::read_text(response).await
    }

    #[instrument(skip(self))]
    async fn schedule_appointment(&self, time: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.endpoint("schedule")?)
            .json(&json!({ "time": time }))
            .send()
            .await
            .map_err(|err| BackendError::unavailable(SERVICE, err.to_string()))?;
        Self::read_text(response).await
    }
}

#[derive(Clone)]
pub enum Scheduler {
    Memory(MemorySchedule),
    Http(HttpScheduler),
}

impl Scheduler {
    pub fn memory() -> Self {
        Self::Memory(MemorySchedule::new())
    }

    pub fn http(base_url: &str) -> Result<Self, ConfigurationError> {
        Ok(Self::Http(HttpScheduler::new(base_url)?))
    }

    pub fn from_config(base_url: Option<&str>) -> Result<Self, ConfigurationError> {
        match base_url {
            Some(url) => Self::http(url),
            None => Ok(Self::memory()),
        }
    }
}

impl SchedulerBackend for Scheduler {
    async fn get_availability(&self) -> Result<String, BackendError> {
        match self {
            Scheduler::Memory(scheduler) => scheduler.get_availability().await,
            Scheduler::Http(scheduler) => scheduler.get_availability().await,
        }
    }

    async fn schedule_appointment(&self, time: &str) -> Result<String, BackendError> {
        match self {
            Scheduler::Memory(scheduler) => scheduler.schedule_appointment(time).await,
            Scheduler::Http(scheduler) => scheduler.schedule_appointment(time).await,
        }
    }
}

fn slot_key(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_open_slots() {
        let schedule = MemorySchedule::with_slots(["9am", "3pm"]);
        assert_eq!(
            schedule.get_availability().await.unwrap(),
            "Current time slots available: 9am, 3pm"
        );
    }

    #[tokio::test]
    async fn booking_removes_the_slot() {
        let schedule = MemorySchedule::with_slots(["9am", "3pm"]);
        assert_eq!(
            schedule.schedule_appointment("3 PM").await.unwrap(),
            "An appointment is set for 3pm."
        );
        assert_eq!(schedule.open_slots(), vec!["9am".to_string()]);
        assert_eq!(
            schedule.schedule_appointment("3pm").await.unwrap(),
            "Sorry, 3pm is not available."
        );
    }

    #[tokio::test]
    async fn empty_book_reports_no_slots() {
        let schedule = MemorySchedule::with_slots(Vec::<String>::new());
        assert_eq!(
            schedule.get_availability().await.unwrap(),
            "There are no time slots available"
        );
    }

    #[test]
    fn http_scheduler_normalizes_base_path() {
        let scheduler = HttpScheduler::new("http://localhost:7071/api").unwrap();
        assert_eq!(
            scheduler.endpoint("availability").unwrap().as_str(),
            "http://localhost:7071/api/availability"
        );
        assert!(HttpScheduler::new("::nope").is_err());
    }
}
