//! Traits at the boundaries between the core and its collaborators.

mod api;
mod authenticator;
mod clock;
mod notifier;
mod store;

pub use api::ApiCaller;
pub use authenticator::Authenticator;
pub use clock::{Clock, SystemClock};
pub use notifier::Notifier;
pub use store::{CreditCache, TokenStore};
