use crate::log_level_wrapper::*;
use crate::rolling_appender_rotation::*;
use crate::secret_string::Secret;
use anyhow::anyhow;
use schematic::{Config, ConfigLoader};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_PATH_ENV_VAR: &str = "CONFIG_PATH";
const DEFAULT_CONFIG_FILEPATH: &str = "./config/config.yml";
const MINIMUM_MESSAGE_DELAY_MS: u64 = 100;

#[derive(Debug, Config, serde::Serialize, serde::Deserialize)]
pub struct AppConfig {
  log_level: Option<LoggingConfigLevel>,
  logging_dir: Option<PathBuf>,
  #[setting(default = "twitch_chat_notifier")]
  logging_filename_prefix: String,
  #[setting(default = "daily")]
  logging_roll_appender: RollingAppenderRotation,

  #[setting(required, env = "TWITCH_NICKNAME")]
  twitch_nickname: Option<String>,
  #[setting(required, env = "TWITCH_ACCESS_TOKEN")]
  access_token: Option<Secret>,
  /// Only needed for the follower watcher. Follower polling is off without it.
  #[setting(env = "TWITCH_CLIENT_ID")]
  client_id: Option<Secret>,
  #[setting(required, env = "TWITCH_CHANNEL")]
  channel: Option<String>,

  #[setting(default = "irc.chat.twitch.tv")]
  irc_server_address: String,
  #[setting(default = 6667)]
  irc_port: u16,
  #[setting(default = 10)]
  connect_timeout_seconds: u64,
  #[setting(default = 10)]
  reconnect_attempts: usize,

  #[setting(default = 9000)]
  delay_between_messages_ms: u64,
  /// Messages containing `@<twitch_nickname>` are shown before others of the same priority.
  #[setting(default = true)]
  prioritize_personally_addressed_messages: bool,
  #[setting(default = 140)]
  maximum_message_size: usize,

  #[setting(default = true)]
  show_general_chat_messages: bool,
  #[setting(default = true)]
  show_subscriber_chat_messages: bool,
  #[setting(default = true)]
  show_moderator_chat_messages: bool,

  #[setting(default = 20)]
  maximum_general_chat_message_queue: usize,
  #[setting(default = 100)]
  maximum_subscriber_chat_message_queue: usize,
  #[setting(default = 100)]
  maximum_moderator_chat_message_queue: usize,
  #[setting(default = true)]
  followers_rank_above_subscribers: bool,

  #[setting(default = true)]
  show_subscriber_messages: bool,
  #[setting(default = "Just subscribed to the channel! #NewSub")]
  new_subscriber_message: String,
  #[setting(default = "Subscribed for {} months in a row! #Resub")]
  repeat_subscriber_message: String,
  #[setting(default = "A loyal subscriber for {} months in a row! #Veteran")]
  senior_subscriber_message: String,

  #[setting(default = true)]
  show_new_followers_message: bool,
  #[setting(default = "Welcome to our newest followers: {}")]
  new_followers_message: String,
  #[setting(default = 120)]
  follower_poll_interval_seconds: u64,

  /// Author allowed to keep `reserved_marker` in their messages, which also raises their priority.
  #[setting(default = "rabidcrabgt")]
  reserved_author: String,
  #[setting(default = "#moddev")]
  reserved_marker: String,
}

impl AppConfig {
  /// Loads the config from `config_path`, falling back to the `CONFIG_PATH` environment
  /// variable and then `./config/config.yml`. A missing file is fine as long as the required
  /// values come from the environment.
  pub fn load(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
    let config_path = config_path.unwrap_or_else(get_config_path);
    let mut loader = ConfigLoader::<AppConfig>::new();

    loader.file_optional(config_path)?;

    let mut config = loader.load()?.config;

    config.validate()?;

    Ok(config)
  }

  fn validate(&mut self) -> anyhow::Result<()> {
    let nickname = self.twitch_nickname.as_deref().unwrap_or_default();
    self.twitch_nickname = Some(normalize_nickname(nickname)?);

    let channel = self.channel.as_deref().unwrap_or_default();
    self.channel = Some(normalize_channel(channel)?);

    match self.access_token.as_ref() {
      Some(access_token) => validate_access_token(access_token)?,
      None => return Err(anyhow!("No Twitch access token was configured.")),
    }

    if self.maximum_message_size == 0 {
      return Err(anyhow!("maximum_message_size must be greater than 0."));
    }

    validate_poll_interval(self.follower_poll_interval_seconds)?;
    validate_reserved_marker(&self.reserved_marker)?;

    Ok(())
  }

  pub fn log_level(&self) -> Option<LoggingConfigLevel> {
    self.log_level
  }

  pub fn logging_dir(&self) -> Option<&Path> {
    self.logging_dir.as_deref()
  }

  pub fn logging_filename_prefix(&self) -> &str {
    &self.logging_filename_prefix
  }

  pub fn logging_file_roll_appender(&self) -> &RollingAppenderRotation {
    &self.logging_roll_appender
  }

  pub fn twitch_nickname(&self) -> &str {
    self.twitch_nickname.as_deref().unwrap_or_default()
  }

  pub fn access_token(&self) -> Option<&Secret> {
    self.access_token.as_ref()
  }

  pub fn client_id(&self) -> Option<&Secret> {
    self.client_id.as_ref()
  }

  /// Lowercase channel name without the leading `#`.
  pub fn channel(&self) -> &str {
    self.channel.as_deref().unwrap_or_default()
  }

  pub fn irc_server_address(&self) -> &str {
    &self.irc_server_address
  }

  pub fn irc_port(&self) -> u16 {
    self.irc_port
  }

  pub fn connect_timeout(&self) -> Duration {
    Duration::from_secs(self.connect_timeout_seconds)
  }

  pub fn reconnect_attempts(&self) -> usize {
    self.reconnect_attempts
  }

  /// Never shorter than 100ms.
  pub fn delay_between_messages(&self) -> Duration {
    Duration::from_millis(self.delay_between_messages_ms.max(MINIMUM_MESSAGE_DELAY_MS))
  }

  pub fn prioritize_personally_addressed_messages(&self) -> bool {
    self.prioritize_personally_addressed_messages
  }

  pub fn maximum_message_size(&self) -> usize {
    self.maximum_message_size
  }

  pub fn show_general_chat_messages(&self) -> bool {
    self.show_general_chat_messages
  }

  pub fn show_subscriber_chat_messages(&self) -> bool {
    self.show_subscriber_chat_messages
  }

  pub fn show_moderator_chat_messages(&self) -> bool {
    self.show_moderator_chat_messages
  }

  pub fn maximum_general_chat_message_queue(&self) -> usize {
    self.maximum_general_chat_message_queue
  }

  pub fn maximum_subscriber_chat_message_queue(&self) -> usize {
    self.maximum_subscriber_chat_message_queue
  }

  pub fn maximum_moderator_chat_message_queue(&self) -> usize {
    self.maximum_moderator_chat_message_queue
  }

  pub fn followers_rank_above_subscribers(&self) -> bool {
    self.followers_rank_above_subscribers
  }

  pub fn show_subscriber_messages(&self) -> bool {
    self.show_subscriber_messages
  }

  pub fn new_subscriber_message(&self) -> &str {
    &self.new_subscriber_message
  }

  pub fn repeat_subscriber_message(&self) -> &str {
    &self.repeat_subscriber_message
  }

  pub fn senior_subscriber_message(&self) -> &str {
    &self.senior_subscriber_message
  }

  pub fn show_new_followers_message(&self) -> bool {
    self.show_new_followers_message
  }

  pub fn new_followers_message(&self) -> &str {
    &self.new_followers_message
  }

  pub fn follower_poll_interval(&self) -> Duration {
    Duration::from_secs(self.follower_poll_interval_seconds)
  }

  pub fn reserved_author(&self) -> &str {
    &self.reserved_author
  }

  pub fn reserved_marker(&self) -> &str {
    &self.reserved_marker
  }
}

fn get_config_path() -> PathBuf {
  let Some((_, config_path)) = std::env::vars().find(|(key, _)| key == CONFIG_PATH_ENV_VAR) else {
    return PathBuf::from(DEFAULT_CONFIG_FILEPATH);
  };

  PathBuf::from(config_path)
}

/// Twitch logins are lowercase and can't contain spaces.
fn normalize_nickname(nickname: &str) -> anyhow::Result<String> {
  let nickname = nickname.trim();

  if nickname.is_empty() {
    return Err(anyhow!("No Twitch nickname was configured."));
  }

  if nickname.contains(char::is_whitespace) {
    return Err(anyhow!(
      "The Twitch nickname `{}` cannot contain spaces.",
      nickname
    ));
  }

  Ok(nickname.to_lowercase())
}

fn normalize_channel(channel: &str) -> anyhow::Result<String> {
  let channel = channel.trim().trim_start_matches('#');

  if channel.is_empty() || channel.contains(char::is_whitespace) {
    return Err(anyhow!(
      "Invalid channel `{}`. Use the streamer's login name, such as `manvsgame`.",
      channel
    ));
  }

  Ok(channel.to_lowercase())
}

fn validate_access_token(access_token: &Secret) -> anyhow::Result<()> {
  if access_token.is_empty() {
    return Err(anyhow!("The Twitch access token is empty."));
  }

  if !access_token.has_oauth_prefix() {
    return Err(anyhow!(
      "Input the whole oauth token including `oauth:`. It should look something like oauth:0aaa000aa0aaa00"
    ));
  }

  Ok(())
}

fn validate_poll_interval(follower_poll_interval_seconds: u64) -> anyhow::Result<()> {
  if follower_poll_interval_seconds == 0 {
    return Err(anyhow!(
      "follower_poll_interval_seconds must be greater than 0."
    ));
  }

  Ok(())
}

/// An empty marker would match every message.
fn validate_reserved_marker(reserved_marker: &str) -> anyhow::Result<()> {
  if reserved_marker.trim().is_empty() {
    return Err(anyhow!("reserved_marker cannot be empty."));
  }

  Ok(())
}
