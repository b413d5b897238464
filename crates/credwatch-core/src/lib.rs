//! credwatch-core - Session lifecycle, polling pipeline and alert dispatch.

pub mod dispatch;
pub mod error;
pub mod manager;
pub mod memory;
pub mod pipeline;
pub mod token;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

pub use dispatch::{DispatchConfig, NotificationDispatcher};
pub use error::{
    ApiError, AuthenticationError, Error, NotificationError, StorageError, TransformError,
};
pub use manager::{SessionConfig, SessionManager, SessionState, SessionStatus};
pub use memory::{MemoryCreditCache, MemoryTokenStore};
pub use pipeline::{CreditsReport, PipelineConfig, PollingPipeline, TemplatesReport};
pub use token::AccessToken;
pub use traits::{ApiCaller, Authenticator, Clock, CreditCache, Notifier, SystemClock, TokenStore};
pub use types::{AlertEvent, CreditReading, Session, TemplateRecord};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
