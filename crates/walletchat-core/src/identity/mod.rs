//! Identity domain module.
//!
//! Wallet addresses, name resolution, and the observable resolution pair a
//! target input field binds to.
//!
//! # Module Structure
//!
//! - `address`: canonical address type (`Address`)
//! - `resolver`: name-resolution collaborator and `IdentityResolver`
//! - `tracker`: input-driven, stale-safe resolution state (`IdentityTracker`)

mod address;
mod resolver;
mod tracker;

pub use address::{Address, display_label};
pub use resolver::{IdentityResolver, NameResolver, ResolvedIdentity, Target};
pub use tracker::{IdentityTracker, ResolutionState};
