//! Conversation stream module.
//!
//! History plus a single live subscription per conversation, merged into one
//! duplicate-free sequence.
//!
//! # Module Structure
//!
//! - `log`: merge-by-identifier message sequence (`MessageLog`)
//! - `view`: subscription lifecycle and send path (`ConversationView`)

mod log;
mod view;

pub use log::MessageLog;
pub use view::{ConversationView, Notice};
