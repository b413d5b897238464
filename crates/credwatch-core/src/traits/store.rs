//! Persisted state traits.

use crate::Result;
use crate::types::{CreditReading, Session};

/// Durable backing for the single dashboard session.
///
/// Only the session manager writes through this trait.
pub trait TokenStore: Send + Sync {
    /// Read the persisted session.
    ///
    /// Fails soft: a missing, unreadable or malformed record is `None`.
    fn load(&self) -> Option<Session>;

    /// Persist `session`, replacing any previous one.
    ///
    /// A concurrent [`load`](Self::load) never observes a partial record.
    fn save(&self, session: &Session) -> Result<()>;

    /// Remove the persisted session. A no-op when nothing is stored.
    fn clear(&self) -> Result<()>;
}

/// Cache of the last successful credit reading.
pub trait CreditCache: Send + Sync {
    /// The most recent reading, if any. Fails soft like [`TokenStore::load`].
    fn latest(&self) -> Option<CreditReading>;

    /// Replace the cached reading.
    fn record(&self, reading: &CreditReading) -> Result<()>;
}
