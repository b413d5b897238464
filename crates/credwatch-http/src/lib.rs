//! credwatch-http - reqwest-backed dashboard client and alert transports.

mod client;
mod notifier;

pub use client::{ApiConfig, DEFAULT_BASE_URL, DEFAULT_ORIGIN, HttpApiClient};
pub use notifier::{LogNotifier, WebhookNotifier};

/// User agent sent with every outbound request.
pub(crate) const USER_AGENT: &str = concat!("credwatch/", env!("CARGO_PKG_VERSION"));
