//! Application layer for walletchat.
//!
//! This crate provides the use case that coordinates the core session,
//! identity and stream components for one connected wallet.

pub mod chat_usecase;

pub use chat_usecase::{ChatUseCase, StartedConversation};
