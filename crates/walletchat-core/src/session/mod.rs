//! Session domain module.
//!
//! One long-lived protocol client per wallet identity, its cache, and the
//! lifecycle state machine around it.
//!
//! # Module Structure
//!
//! - `model`: `Session`, `SessionState`, `InitOutcome`
//! - `store`: identity-keyed session cache (`SessionStore`)
//! - `manager`: lifecycle management (`SessionManager`)

mod manager;
mod model;
mod store;

pub use manager::SessionManager;
pub use model::{InitOutcome, Session, SessionState};
pub use store::SessionStore;
