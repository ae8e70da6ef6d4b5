use crate::irc_chat::chat_user::ChatUser;
use crate::irc_chat::user_registry::SenderRole;

/// A parsed `PRIVMSG`, or a status line the client generated for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
  user: ChatUser,
  channel: String,
  text: String,
  is_user_feedback: bool,
  mentions_owner: bool,
  sender_role: SenderRole,
}

impl ChatMessage {
  pub fn new(
    user: ChatUser,
    channel: impl Into<String>,
    text: impl Into<String>,
    mentions_owner: bool,
    sender_role: SenderRole,
  ) -> Self {
    Self {
      user,
      channel: channel.into(),
      text: text.into(),
      is_user_feedback: false,
      mentions_owner,
      sender_role,
    }
  }

  /// Status text authored by the synthetic `twitch` user.
  pub fn user_feedback(channel: impl Into<String>, text: impl Into<String>) -> Self {
    Self {
      user: ChatUser::new(super::TWITCH_SYSTEM_USER),
      channel: channel.into(),
      text: text.into(),
      is_user_feedback: true,
      mentions_owner: false,
      sender_role: SenderRole::Viewer,
    }
  }

  pub fn user(&self) -> &ChatUser {
    &self.user
  }

  pub fn channel(&self) -> &str {
    &self.channel
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn is_user_feedback(&self) -> bool {
    self.is_user_feedback
  }

  pub fn mentions_owner(&self) -> bool {
    self.mentions_owner
  }

  pub fn sender_role(&self) -> SenderRole {
    self.sender_role
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
  /// The server refused the nickname/token pair. Retrying won't help.
  LoginRejected,
  Failure(String),
}

impl std::fmt::Display for DisconnectReason {
  fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::LoginRejected => formatter.write_str("login rejected"),
      Self::Failure(reason) => formatter.write_str(reason),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
  Connected,
  /// `reason` is `None` when the client was told to stop.
  Disconnected { reason: Option<DisconnectReason> },
  ChatMessageReceived(ChatMessage),
  NewSubscriber(ChatUser),
}
