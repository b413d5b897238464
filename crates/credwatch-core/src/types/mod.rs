//! Domain types shared by the session, pipeline and dispatcher.

mod alert;
mod record;
mod session;

pub use alert::AlertEvent;
pub use record::{CreditReading, TemplateRecord};
pub use session::Session;
