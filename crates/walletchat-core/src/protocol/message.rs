use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Address;

/// A message observed in a conversation.
///
/// `id` is unique within its conversation and is the merge key between
/// history and live delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub topic: String,
    pub sender: Address,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_from(&self, address: &Address) -> bool {
        &self.sender == address
    }
}
