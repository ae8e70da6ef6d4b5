use crate::notification_queue::priority::MessagePriority;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
  citizen_name: String,
  text: String,
  priority: MessagePriority,
  enqueued_at: DateTime<Utc>,
  /// Breaks ties between messages enqueued within the same clock tick.
  sequence: u64,
  mentions_owner: bool,
  resolved_target_id: Option<u32>,
}

impl QueuedMessage {
  pub fn new(
    citizen_name: String,
    text: String,
    priority: MessagePriority,
    sequence: u64,
    mentions_owner: bool,
  ) -> Self {
    Self {
      citizen_name,
      text,
      priority,
      enqueued_at: Utc::now(),
      sequence,
      mentions_owner,
      resolved_target_id: None,
    }
  }

  pub fn citizen_name(&self) -> &str {
    &self.citizen_name
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn priority(&self) -> MessagePriority {
    self.priority
  }

  pub fn enqueued_at(&self) -> &DateTime<Utc> {
    &self.enqueued_at
  }

  pub fn sequence(&self) -> u64 {
    self.sequence
  }

  pub fn mentions_owner(&self) -> bool {
    self.mentions_owner
  }

  pub fn resolved_target_id(&self) -> Option<u32> {
    self.resolved_target_id
  }

  pub fn set_resolved_target_id(&mut self, target_id: u32) {
    self.resolved_target_id = Some(target_id);
  }
}
