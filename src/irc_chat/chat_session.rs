use crate::errors::AppError;
use crate::irc_chat::chat_event::{ChatMessage, DisconnectReason, IrcEvent};
use crate::irc_chat::irc_line::ServerLine;
use crate::irc_chat::user_registry::UserRegistry;
use crate::irc_chat::TWITCH_SYSTEM_USER;
use parking_lot::RwLock;
use regex::Regex;
use std::sync::Arc;

const SUBSCRIPTION_NOTIFIER: &str = "twitchnotify";
const SUBSCRIPTION_KEYWORD: &str = "subscribed";
const RESUBSCRIPTION_KEYWORD: &str = "months in a row";
const LOGIN_FAILURE_PHRASES: [&str; 2] = ["Login unsuccessful", "Login authentication failed"];
const LOGIN_FAILURE_FEEDBACK: &str =
  "Login failed! Are you sure you have the right username and oauth key?";

/// What the connection should do after a line has been processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
  /// A line to write to the socket, without the trailing CRLF.
  Send(String),
  Emit(IrcEvent),
  Close(DisconnectReason),
}

/// The per-line protocol logic of one connection.
///
/// Owns no socket. Lines go in, registry mutations happen, and the actions the
/// connection has to carry out come back out.
pub struct ChatSession {
  own_username: String,
  channel: String,
  registry: Arc<RwLock<UserRegistry>>,
  mention_pattern: Regex,
}

impl ChatSession {
  pub fn new(
    own_username: &str,
    channel: &str,
    registry: Arc<RwLock<UserRegistry>>,
  ) -> Result<Self, AppError> {
    let own_username = own_username.trim().to_lowercase();
    let mention_pattern = Regex::new(&format!("(?i)@{}", regex::escape(&own_username)))?;

    Ok(Self {
      own_username,
      channel: channel.trim().trim_start_matches('#').to_lowercase(),
      registry,
      mention_pattern,
    })
  }

  pub fn own_username(&self) -> &str {
    &self.own_username
  }

  pub fn channel(&self) -> &str {
    &self.channel
  }

  /// The `PASS` and `NICK` lines sent right after the socket opens.
  pub fn login_lines(&self, irc_password: &str) -> [String; 2] {
    [
      format!("PASS {}", irc_password),
      format!("NICK {}", self.own_username),
    ]
  }

  pub fn chat_line(&self, text: &str) -> String {
    format!("PRIVMSG #{} :{}", self.channel, text)
  }

  pub fn process_line(&self, raw_line: &str) -> Vec<SessionAction> {
    match ServerLine::classify(raw_line) {
      ServerLine::Ping { payload } => vec![SessionAction::Send(format!("PONG {}", payload))],
      ServerLine::Welcome => self.on_welcome(),
      ServerLine::Notice { text } => self.on_notice(&text),
      ServerLine::NameList { names } => {
        let mut registry = self.registry.write();

        for name in names {
          registry.register_logged_in(&name);
        }

        vec![]
      }
      ServerLine::ModeratorGranted { username } => {
        self.registry.write().add_moderator(&username);

        vec![]
      }
      ServerLine::Join { username } => {
        if !username.eq_ignore_ascii_case(&self.own_username) {
          self.registry.write().register_logged_in(&username);
        }

        vec![]
      }
      ServerLine::Part { username } => {
        self.registry.write().remove_logged_in(&username);

        vec![]
      }
      ServerLine::PrivMsg {
        sender,
        channel,
        text,
      } => self.on_private_message(&sender, &channel, &text),
      ServerLine::Unrecognized => {
        tracing::trace!("Ignoring line: {:?}", raw_line);

        vec![]
      }
    }
  }

  fn on_welcome(&self) -> Vec<SessionAction> {
    self.registry.write().register_logged_in(TWITCH_SYSTEM_USER);

    let feedback = format!(
      "Login successful! Currently logged in as {} and listening to {}",
      self.own_username, self.channel
    );

    vec![
      SessionAction::Send(format!("JOIN #{}", self.channel)),
      SessionAction::Emit(IrcEvent::ChatMessageReceived(ChatMessage::user_feedback(
        &self.channel,
        feedback,
      ))),
    ]
  }

  fn on_notice(&self, text: &str) -> Vec<SessionAction> {
    if !LOGIN_FAILURE_PHRASES
      .iter()
      .any(|phrase| text.contains(phrase))
    {
      tracing::debug!("Server notice: {}", text);

      return vec![];
    }

    tracing::error!("The server rejected the login: {}", text);

    vec![
      SessionAction::Emit(IrcEvent::ChatMessageReceived(ChatMessage::user_feedback(
        &self.channel,
        LOGIN_FAILURE_FEEDBACK,
      ))),
      SessionAction::Close(DisconnectReason::LoginRejected),
    ]
  }

  fn on_private_message(&self, sender: &str, channel: &str, text: &str) -> Vec<SessionAction> {
    if sender.eq_ignore_ascii_case(SUBSCRIPTION_NOTIFIER) && text.contains(SUBSCRIPTION_KEYWORD) {
      return self.on_subscription_notice(text);
    }

    let (user, sender_role) = {
      let mut registry = self.registry.write();
      let user = registry.get_or_register(sender);
      let sender_role = registry.role_of(user.username(), &self.own_username);

      (user, sender_role)
    };

    let mentions_owner = self.mention_pattern.is_match(text);
    let message = ChatMessage::new(user, channel, text, mentions_owner, sender_role);

    vec![SessionAction::Emit(IrcEvent::ChatMessageReceived(message))]
  }

  /// `<name> just subscribed!` or `<name> subscribed for <n> months in a row!`
  fn on_subscription_notice(&self, text: &str) -> Vec<SessionAction> {
    let Some(subscriber_name) = text.split_whitespace().next() else {
      return vec![];
    };

    let months_subscribed = if text.contains(RESUBSCRIPTION_KEYWORD) {
      text
        .split_whitespace()
        .nth(3)
        .and_then(|months| months.parse::<u32>().ok())
        .unwrap_or(1)
    } else {
      1
    };

    let subscriber = self
      .registry
      .write()
      .upsert_subscriber(subscriber_name, months_subscribed);

    tracing::info!(
      "{} subscribed. Months: {}",
      subscriber,
      subscriber.months_subscribed()
    );

    vec![SessionAction::Emit(IrcEvent::NewSubscriber(subscriber))]
  }
}
