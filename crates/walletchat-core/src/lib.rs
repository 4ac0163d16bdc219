pub mod config;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod session;
pub mod stream;
pub mod wallet;

#[cfg(test)]
mod test_support;

// Re-export common error type
pub use error::{ChatError, ErrorKind, Result};
