//! In-memory implementations of the persisted-state traits.
//!
//! Useful for one-shot runs that should not touch disk, and as test doubles.

use std::sync::{Mutex, PoisonError};

use crate::Result;
use crate::traits::{CreditCache, TokenStore};
use crate::types::{CreditReading, Session};

/// A [`TokenStore`] that keeps the session in process memory.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    session: Mutex<Option<Session>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `session`.
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

/// A [`CreditCache`] that keeps the last reading in process memory.
#[derive(Debug, Default)]
pub struct MemoryCreditCache {
    reading: Mutex<Option<CreditReading>>,
}

impl MemoryCreditCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CreditCache for MemoryCreditCache {
    fn latest(&self) -> Option<CreditReading> {
        self.reading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, reading: &CreditReading) -> Result<()> {
        *self.reading.lock().unwrap_or_else(PoisonError::into_inner) = Some(reading.clone());
        Ok(())
    }
}
