use crate::irc_chat::chat_user::ChatUser;
use std::collections::HashMap;

/// The role a chat message's author had when the message was parsed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenderRole {
  /// The account the client is logged in as.
  Owner,
  Moderator,
  Subscriber,
  #[default]
  Viewer,
}

/// Users seen in the channel, keyed by lowercase username.
///
/// Moderators and subscribers don't have to be in `logged_in_users`. Twitch batches
/// its join lists, so a user can speak or be modded before they've "joined".
#[derive(Debug, Clone, Default)]
pub struct UserRegistry {
  logged_in_users: HashMap<String, ChatUser>,
  moderators: HashMap<String, ChatUser>,
  subscribers: HashMap<String, ChatUser>,
}

impl UserRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds the user to `logged_in_users` if they aren't already there.
  ///
  /// Returns true if the user was new.
  pub fn register_logged_in(&mut self, username: &str) -> bool {
    let user = ChatUser::new(username);

    if user.username().is_empty() || self.logged_in_users.contains_key(user.username()) {
      return false;
    }

    self
      .logged_in_users
      .insert(user.username().to_owned(), user);

    true
  }

  /// Returns the logged in user, registering them first if needed.
  pub fn get_or_register(&mut self, username: &str) -> ChatUser {
    let user = ChatUser::new(username);

    self
      .logged_in_users
      .entry(user.username().to_owned())
      .or_insert(user)
      .clone()
  }

  /// Removing someone who isn't logged in does nothing.
  pub fn remove_logged_in(&mut self, username: &str) -> Option<ChatUser> {
    self.logged_in_users.remove(&username.to_lowercase())
  }

  pub fn add_moderator(&mut self, username: &str) -> bool {
    let user = ChatUser::new(username);

    if user.username().is_empty() || self.moderators.contains_key(user.username()) {
      return false;
    }

    self.moderators.insert(user.username().to_owned(), user);

    true
  }

  /// Inserts a new subscriber, or updates the month count of an existing one.
  pub fn upsert_subscriber(&mut self, username: &str, months_subscribed: u32) -> ChatUser {
    let new_subscriber = ChatUser::new_subscriber(username, months_subscribed);

    let subscriber = self
      .subscribers
      .entry(new_subscriber.username().to_owned())
      .and_modify(|existing| existing.set_months_subscribed(months_subscribed))
      .or_insert(new_subscriber);

    subscriber.clone()
  }

  pub fn is_logged_in(&self, username: &str) -> bool {
    self.logged_in_users.contains_key(&username.to_lowercase())
  }

  pub fn is_moderator(&self, username: &str) -> bool {
    self.moderators.contains_key(&username.to_lowercase())
  }

  pub fn is_subscriber(&self, username: &str) -> bool {
    self.subscribers.contains_key(&username.to_lowercase())
  }

  /// Owner takes precedence over moderator, which takes precedence over subscriber.
  pub fn role_of(&self, username: &str, own_username: &str) -> SenderRole {
    if username.eq_ignore_ascii_case(own_username) {
      SenderRole::Owner
    } else if self.is_moderator(username) {
      SenderRole::Moderator
    } else if self.is_subscriber(username) {
      SenderRole::Subscriber
    } else {
      SenderRole::Viewer
    }
  }

  pub fn logged_in_users(&self) -> &HashMap<String, ChatUser> {
    &self.logged_in_users
  }

  pub fn moderators(&self) -> &HashMap<String, ChatUser> {
    &self.moderators
  }

  pub fn subscribers(&self) -> &HashMap<String, ChatUser> {
    &self.subscribers
  }

  pub fn clear(&mut self) {
    self.logged_in_users.clear();
    self.moderators.clear();
    self.subscribers.clear();
  }

  pub fn is_empty(&self) -> bool {
    self.logged_in_users.is_empty() && self.moderators.is_empty() && self.subscribers.is_empty()
  }
}
