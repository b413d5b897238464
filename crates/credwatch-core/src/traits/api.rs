//! Downstream API trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::{AccessToken, Result};

/// A single authenticated call to the dashboard backend.
///
/// HTTP 401 must surface as [`Error::AuthFailed`](crate::Error::AuthFailed);
/// every other failure as [`Error::Api`](crate::Error::Api). No retries.
#[async_trait]
pub trait ApiCaller: Send + Sync {
    /// POST `payload` to `endpoint` with `token` attached.
    async fn call(&self, endpoint: &str, token: &AccessToken, payload: &Value) -> Result<Value>;
}
