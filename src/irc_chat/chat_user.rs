use chrono::{DateTime, Utc};
use std::hash::{Hash, Hasher};

/// A chat participant. Two users are the same user if their usernames match,
/// regardless of subscription or follow data.
#[derive(Debug, Clone)]
pub struct ChatUser {
  username: String,
  subscribed_since: Option<DateTime<Utc>>,
  months_subscribed: u32,
  followed_since: Option<DateTime<Utc>>,
}

impl ChatUser {
  pub fn new<S: AsRef<str>>(username: S) -> Self {
    Self {
      username: username.as_ref().trim().to_lowercase(),
      subscribed_since: None,
      months_subscribed: 1,
      followed_since: None,
    }
  }

  pub fn new_subscriber<S: AsRef<str>>(username: S, months_subscribed: u32) -> Self {
    let mut user = Self::new(username);
    user.subscribed_since = Some(Utc::now());
    user.set_months_subscribed(months_subscribed);

    user
  }

  pub fn new_follower<S: AsRef<str>>(username: S, followed_since: Option<DateTime<Utc>>) -> Self {
    let mut user = Self::new(username);
    user.followed_since = followed_since;

    user
  }

  pub fn username(&self) -> &str {
    &self.username
  }

  pub fn subscribed_since(&self) -> Option<&DateTime<Utc>> {
    self.subscribed_since.as_ref()
  }

  pub fn months_subscribed(&self) -> u32 {
    self.months_subscribed
  }

  /// Clamped to at least 1.
  pub fn set_months_subscribed(&mut self, months_subscribed: u32) {
    self.months_subscribed = months_subscribed.max(1);
  }

  pub fn followed_since(&self) -> Option<&DateTime<Utc>> {
    self.followed_since.as_ref()
  }
}

impl PartialEq for ChatUser {
  fn eq(&self, other: &Self) -> bool {
    self.username == other.username
  }
}

impl Eq for ChatUser {}

impl Hash for ChatUser {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.username.hash(state);
  }
}

impl std::fmt::Display for ChatUser {
  fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    formatter.write_str(&self.username)
  }
}
