use thiserror::Error;

/// Startup-time failure; the process should not start serving.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("missing configuration value {0}")]
    Missing(String),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
    #[error("threshold for {intent} must be within [0, 1], got {value}")]
    InvalidThreshold { intent: String, value: f32 },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("classifier transport failure: {0}")]
    Transport(String),
    #[error("classifier rejected credentials: {0}")]
    Auth(String),
    #[error("classifier returned an unusable result: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },
    #[error("{service} rejected the request: {message}")]
    Rejected { service: String, message: String },
    #[error("{service} returned an unusable response: {message}")]
    Malformed { service: String, message: String },
}

impl BackendError {
    pub fn unavailable(service: &str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn rejected(service: &str, message: impl Into<String>) -> Self {
        Self::Rejected {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn malformed(service: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn service(&self) -> &str {
        match self {
            Self::Unavailable { service, .. }
            | Self::Rejected { service, .. }
            | Self::Malformed { service, .. } => service,
        }
    }
}
