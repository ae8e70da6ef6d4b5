use crate::errors::AppError;
use crate::notification_queue::priority::PriorityOrder;
use app_config::AppConfig;
use regex::Regex;

/// One author allowed to use a marker hashtag, which is stripped from everyone else's messages.
#[derive(Debug, Clone)]
pub struct ReservedIdentity {
  author: String,
  marker_pattern: Regex,
}

impl ReservedIdentity {
  pub fn new(author: &str, marker: &str) -> Result<Self, AppError> {
    let marker = marker.trim();

    if marker.is_empty() {
      return Err(AppError::EmptyReservedMarker);
    }

    let marker_pattern = Regex::new(&format!("(?i){}", regex::escape(marker)))?;

    Ok(Self {
      author: author.trim().to_lowercase(),
      marker_pattern,
    })
  }

  pub fn author(&self) -> &str {
    &self.author
  }

  /// Expects an already lowercased name.
  pub fn is_reserved_author(&self, citizen_name: &str) -> bool {
    !self.author.is_empty() && citizen_name == self.author
  }

  pub fn has_marker(&self, text: &str) -> bool {
    self.marker_pattern.is_match(text)
  }

  pub fn strip_marker(&self, text: &str) -> String {
    self.marker_pattern.replace_all(text, "").into_owned()
  }
}

/// Filters, limits and ordering used by the message queue.
#[derive(Debug, Clone)]
pub struct QueueSettings {
  pub max_message_length: usize,
  pub prioritize_mentions: bool,
  pub show_general_chat: bool,
  pub show_subscriber_chat: bool,
  pub show_moderator_chat: bool,
  pub max_general_chat_backlog: usize,
  pub max_subscriber_backlog: usize,
  pub max_moderator_backlog: usize,
  pub priority_order: PriorityOrder,
  pub reserved_identity: ReservedIdentity,
}

impl QueueSettings {
  /// Every other value is set to its configuration default.
  pub fn new(reserved_identity: ReservedIdentity) -> Self {
    Self {
      max_message_length: 140,
      prioritize_mentions: true,
      show_general_chat: true,
      show_subscriber_chat: true,
      show_moderator_chat: true,
      max_general_chat_backlog: 20,
      max_subscriber_backlog: 100,
      max_moderator_backlog: 100,
      priority_order: PriorityOrder::default(),
      reserved_identity,
    }
  }

  pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
    let reserved_identity = ReservedIdentity::new(config.reserved_author(), config.reserved_marker())?;

    Ok(Self {
      max_message_length: config.maximum_message_size(),
      prioritize_mentions: config.prioritize_personally_addressed_messages(),
      show_general_chat: config.show_general_chat_messages(),
      show_subscriber_chat: config.show_subscriber_chat_messages(),
      show_moderator_chat: config.show_moderator_chat_messages(),
      max_general_chat_backlog: config.maximum_general_chat_message_queue(),
      max_subscriber_backlog: config.maximum_subscriber_chat_message_queue(),
      max_moderator_backlog: config.maximum_moderator_chat_message_queue(),
      priority_order: PriorityOrder::new(config.followers_rank_above_subscribers()),
      reserved_identity,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn marker_is_matched_and_stripped_case_insensitively() {
    let reserved = ReservedIdentity::new("RabidCrabGT", "#moddev").unwrap();

    assert_eq!(reserved.author(), "rabidcrabgt");
    assert!(reserved.has_marker("hi #ModDev"));
    assert_eq!(reserved.strip_marker("hi #MODDEV there"), "hi  there");
  }

  #[test]
  fn marker_is_treated_literally() {
    let reserved = ReservedIdentity::new("someone", "a.b").unwrap();

    assert!(!reserved.has_marker("axb"));
    assert!(reserved.has_marker("A.B"));
  }

  #[test]
  fn an_empty_marker_is_rejected() {
    assert!(matches!(
      ReservedIdentity::new("someone", " "),
      Err(AppError::EmptyReservedMarker)
    ));
  }

  #[test]
  fn an_empty_author_reserves_nobody() {
    let reserved = ReservedIdentity::new("", "#moddev").unwrap();

    assert!(!reserved.is_reserved_author(""));
  }
}
