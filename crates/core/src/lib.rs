//! Domain layer shared by the storage crate and the HTTP application.
//!
//! Nothing in here touches the database or the network: the types describe
//! persisted records, the rules validate drafts before they are written, and
//! the message helpers produce the copy for notifications and emails.

pub mod actor;
pub mod inputs;
pub mod messages;
pub mod provisioning;
pub mod rules;
pub mod types;

pub use actor::{AccessError, Actor, RecordScope, Role};
pub use rules::{FieldError, ValidationErrors};
