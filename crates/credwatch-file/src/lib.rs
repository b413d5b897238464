//! credwatch-file - Filesystem-backed persisted state.

mod cache;
mod store;
mod write;

pub use cache::FileCreditCache;
pub use store::FileTokenStore;

/// File name of the persisted session inside a state directory.
pub const SESSION_FILE: &str = "session.json";

/// File name of the cached credit reading inside a state directory.
pub const CREDIT_FILE: &str = "latest-credit.json";
