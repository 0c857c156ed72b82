pub mod answer;
pub mod entities;
pub mod errors;
pub mod models;
pub mod router;
pub mod text;
pub mod welcome;

pub use answer::{resolve_answer, resolve_answer_or_fallback, NO_ANSWER_TEXT};
pub use entities::extract_first;
pub use errors::{BackendError, ClassificationError, ConfigurationError};
pub use models::*;
pub use router::IntentRouter;
pub use text::normalize_text;
pub use welcome::{welcome_recipients, WELCOME_TEXT};
