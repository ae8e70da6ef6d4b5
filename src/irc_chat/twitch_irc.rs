use crate::errors::AppError;
use crate::irc_chat::chat_event::{DisconnectReason, IrcEvent};
use crate::irc_chat::chat_session::{ChatSession, SessionAction};
use crate::irc_chat::user_registry::UserRegistry;
use app_config::{secret_string::Secret, AppConfig};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::{sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{tcp::OwnedWriteHalf, TcpStream};
use tokio::{sync::mpsc, task::JoinHandle, time::timeout};
use tokio_stream::{wrappers::SplitStream, StreamExt};

/// How long the read loop waits for a line before checking the stop flag again.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

type SharedWriter = Arc<tokio::sync::Mutex<Option<OwnedWriteHalf>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
  Idle,
  Connecting,
  LoggedIn,
  Disconnecting,
  Disconnected,
}

#[derive(Debug, Clone)]
pub struct IrcCredentials {
  username: String,
  oauth_token: Secret,
  channel: String,
}

impl IrcCredentials {
  pub fn new(username: impl Into<String>, oauth_token: Secret, channel: impl Into<String>) -> Self {
    Self {
      username: username.into(),
      oauth_token,
      channel: channel.into(),
    }
  }

  pub fn from_config(config: &AppConfig) -> Self {
    Self::new(
      config.twitch_nickname(),
      config.access_token().cloned().unwrap_or_default(),
      config.channel(),
    )
  }

  pub fn username(&self) -> &str {
    &self.username
  }

  pub fn channel(&self) -> &str {
    &self.channel
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
  server_address: String,
  port: u16,
  connect_timeout: Duration,
}

impl ConnectionSettings {
  pub fn new(server_address: impl Into<String>, port: u16, connect_timeout: Duration) -> Self {
    Self {
      server_address: server_address.into(),
      port,
      connect_timeout,
    }
  }

  pub fn from_config(config: &AppConfig) -> Self {
    Self::new(
      config.irc_server_address(),
      config.irc_port(),
      config.connect_timeout(),
    )
  }

  fn address(&self) -> String {
    format!("{}:{}", self.server_address, self.port)
  }
}

/// A single connection to a Twitch chat channel.
///
/// The socket is owned by a read loop running on its own task. Everything the
/// loop observes is reported through the event sender handed to [`TwitchIrc::new`].
pub struct TwitchIrc {
  settings: ConnectionSettings,
  credentials: Option<IrcCredentials>,
  session: Option<Arc<ChatSession>>,
  status: Arc<Mutex<ConnectionStatus>>,
  registry: Arc<RwLock<UserRegistry>>,
  writer: SharedWriter,
  stop_flag: Arc<AtomicBool>,
  read_loop: Option<JoinHandle<()>>,
  event_sender: mpsc::UnboundedSender<IrcEvent>,
}

impl TwitchIrc {
  pub fn new(settings: ConnectionSettings, event_sender: mpsc::UnboundedSender<IrcEvent>) -> Self {
    Self {
      settings,
      credentials: None,
      session: None,
      status: Arc::new(Mutex::new(ConnectionStatus::Idle)),
      registry: Arc::new(RwLock::new(UserRegistry::new())),
      writer: Arc::new(tokio::sync::Mutex::new(None)),
      stop_flag: Arc::new(AtomicBool::new(false)),
      read_loop: None,
      event_sender,
    }
  }

  /// Starts the read loop and returns without waiting for the login to finish.
  ///
  /// # Errors
  /// - The client isn't idle.
  /// - The mention pattern for the username couldn't be built.
  pub fn connect(&mut self, credentials: IrcCredentials) -> Result<(), AppError> {
    let status = self.status();

    if status != ConnectionStatus::Idle {
      return Err(AppError::AlreadyConnected(status));
    }

    let session = Arc::new(ChatSession::new(
      credentials.username(),
      credentials.channel(),
      self.registry.clone(),
    )?);

    tracing::info!(
      "Connecting to {} as {} for channel {}.",
      self.settings.address(),
      session.own_username(),
      session.channel()
    );

    *self.status.lock() = ConnectionStatus::Connecting;
    self.stop_flag = Arc::new(AtomicBool::new(false));

    let read_loop = ReadLoop {
      settings: self.settings.clone(),
      oauth_token: credentials.oauth_token.clone(),
      session: session.clone(),
      status: self.status.clone(),
      writer: self.writer.clone(),
      stop_flag: self.stop_flag.clone(),
      event_sender: self.event_sender.clone(),
    };

    self.read_loop = Some(tokio::spawn(read_loop.run()));
    self.session = Some(session);
    self.credentials = Some(credentials);

    Ok(())
  }

  /// Stops the running loop, waits for it to exit, clears every known user and connects again.
  ///
  /// Uses the previous credentials when none are passed in.
  ///
  /// # Errors
  /// - No credentials were passed in and the client was never connected.
  pub async fn reconnect(&mut self, credentials: Option<IrcCredentials>) -> Result<(), AppError> {
    tracing::warn!("Reconnecting the IRC client.");

    let Some(credentials) = credentials.or_else(|| self.credentials.clone()) else {
      return Err(AppError::MissingCredentials);
    };

    self.stop_read_loop().await;
    self.registry.write().clear();
    *self.status.lock() = ConnectionStatus::Idle;

    self.connect(credentials)
  }

  /// Stops the read loop, which sends `QUIT` on its way out.
  pub async fn shutdown(&mut self) {
    tracing::info!("Shutting down the IRC client.");

    self.stop_read_loop().await;
  }

  /// Writes a chat line to the channel. Does nothing unless logged in.
  pub async fn send_message(&self, text: &str) {
    let Some(session) = self.session.as_ref() else {
      return;
    };

    if self.status() != ConnectionStatus::LoggedIn {
      tracing::debug!("Not sending {:?}, the client isn't logged in.", text);
      return;
    }

    if let Err(error) = write_line(&self.writer, &session.chat_line(text)).await {
      tracing::error!("Failed to send a chat message. Reason: {}", error);
    }
  }

  pub fn status(&self) -> ConnectionStatus {
    *self.status.lock()
  }

  /// A copy of the users seen on the current connection.
  pub fn registry(&self) -> UserRegistry {
    self.registry.read().clone()
  }

  pub fn credentials(&self) -> Option<&IrcCredentials> {
    self.credentials.as_ref()
  }

  async fn stop_read_loop(&mut self) {
    self.stop_flag.store(true, Ordering::Release);

    let Some(read_loop) = self.read_loop.take() else {
      return;
    };

    if let Err(error) = read_loop.await {
      tracing::error!("{}", AppError::ReadLoopPanicked(error.to_string()));
      *self.status.lock() = ConnectionStatus::Disconnected;
    }
  }
}

struct ReadLoop {
  settings: ConnectionSettings,
  oauth_token: Secret,
  session: Arc<ChatSession>,
  status: Arc<Mutex<ConnectionStatus>>,
  writer: SharedWriter,
  stop_flag: Arc<AtomicBool>,
  event_sender: mpsc::UnboundedSender<IrcEvent>,
}

impl ReadLoop {
  async fn run(self) {
    let reason = match self.read_lines().await {
      Ok(reason) => reason,
      Err(error) => {
        tracing::error!("The IRC connection failed. Reason: {}", error);

        Some(DisconnectReason::Failure(error.to_string()))
      }
    };

    self.writer.lock().await.take();
    *self.status.lock() = ConnectionStatus::Disconnected;

    tracing::info!("The IRC read loop has exited.");
    self.emit(IrcEvent::Disconnected { reason });
  }

  /// Returns the reason the server ended the session, or `None` if the stop flag was set.
  async fn read_lines(&self) -> Result<Option<DisconnectReason>, AppError> {
    let address = self.settings.address();
    let stream = timeout(self.settings.connect_timeout, TcpStream::connect(&address))
      .await
      .map_err(|_| AppError::ConnectTimeout {
        address: address.clone(),
        timeout: self.settings.connect_timeout,
      })??;
    let (read_half, write_half) = stream.into_split();

    *self.writer.lock().await = Some(write_half);
    self.emit(IrcEvent::Connected);

    for line in self.session.login_lines(&self.oauth_token.irc_password()) {
      write_line(&self.writer, &line).await?;
    }

    *self.status.lock() = ConnectionStatus::LoggedIn;

    let mut lines = SplitStream::new(BufReader::new(read_half).split(b'\n'));

    loop {
      if self.stop_flag.load(Ordering::Acquire) {
        self.quit().await;

        return Ok(None);
      }

      let Ok(next_line) = timeout(READ_POLL_INTERVAL, lines.next()).await else {
        continue;
      };
      let Some(line) = next_line else {
        return Err(AppError::ConnectionClosedByServer);
      };
      let line = decode_line(&line?);

      for action in self.session.process_line(&line) {
        match action {
          SessionAction::Send(outbound) => write_line(&self.writer, &outbound).await?,
          SessionAction::Emit(event) => self.emit(event),
          SessionAction::Close(reason) => {
            self.quit().await;

            return Ok(Some(reason));
          }
        }
      }
    }
  }

  async fn quit(&self) {
    *self.status.lock() = ConnectionStatus::Disconnecting;

    if let Err(error) = write_line(&self.writer, "QUIT").await {
      tracing::debug!("Failed to send QUIT: {}", error);
    }
  }

  fn emit(&self, event: IrcEvent) {
    if let Err(error) = self.event_sender.send(event) {
      tracing::warn!(
        "{}",
        AppError::MpscConnectionClosed {
          error: error.to_string()
        }
      );
    }
  }
}

/// Invalid UTF-8 is replaced rather than ending the connection.
fn decode_line(raw_line: &[u8]) -> String {
  let raw_line = raw_line.strip_suffix(b"\r").unwrap_or(raw_line);

  String::from_utf8_lossy(raw_line).into_owned()
}

async fn write_line(writer: &SharedWriter, line: &str) -> Result<(), AppError> {
  let mut writer = writer.lock().await;

  let Some(writer) = writer.as_mut() else {
    return Err(AppError::ConnectionClosedByServer);
  };

  writer.write_all(format!("{}\r\n", line).as_bytes()).await?;
  writer.flush().await?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn credentials() -> IrcCredentials {
    IrcCredentials::new("bot", Secret::from("oauth:abc"), "chan")
  }

  #[test]
  fn lines_are_decoded_lossily() {
    assert_eq!(decode_line(b"PING :tmi.twitch.tv\r"), "PING :tmi.twitch.tv");
    assert_eq!(decode_line(b":m!m@m PRIVMSG #chan :caf\xe9"), ":m!m@m PRIVMSG #chan :caf\u{FFFD}");
  }

  #[tokio::test]
  async fn connect_is_only_valid_from_idle() {
    let (sender, _receiver) = mpsc::unbounded_channel();
    let settings = ConnectionSettings::new("127.0.0.1", 1, Duration::from_millis(200));
    let mut client = TwitchIrc::new(settings, sender);

    client.connect(credentials()).unwrap();

    let result = client.connect(credentials());

    assert!(matches!(result, Err(AppError::AlreadyConnected(_))));

    client.shutdown().await;
  }

  #[tokio::test]
  async fn failed_connection_reports_a_disconnect_with_a_reason() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let settings = ConnectionSettings::new("127.0.0.1", port, Duration::from_secs(2));
    let mut client = TwitchIrc::new(settings, sender);

    client.connect(credentials()).unwrap();

    let event = timeout(Duration::from_secs(5), receiver.recv())
      .await
      .unwrap()
      .unwrap();

    assert!(matches!(
      event,
      IrcEvent::Disconnected {
        reason: Some(DisconnectReason::Failure(_))
      }
    ));

    client.shutdown().await;

    assert_eq!(client.status(), ConnectionStatus::Disconnected);
  }

  #[tokio::test]
  async fn reconnect_without_credentials_fails() {
    let (sender, _receiver) = mpsc::unbounded_channel();
    let settings = ConnectionSettings::new("127.0.0.1", 1, Duration::from_millis(200));
    let mut client = TwitchIrc::new(settings, sender);

    assert!(matches!(
      client.reconnect(None).await,
      Err(AppError::MissingCredentials)
    ));
  }

  #[tokio::test]
  async fn send_message_before_connecting_is_a_no_op() {
    let (sender, _receiver) = mpsc::unbounded_channel();
    let settings = ConnectionSettings::new("127.0.0.1", 1, Duration::from_millis(200));
    let client = TwitchIrc::new(settings, sender);

    client.send_message("hello").await;

    assert_eq!(client.status(), ConnectionStatus::Idle);
  }
}
