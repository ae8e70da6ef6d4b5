#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("{}", .0)]
  UrlParseError(#[from] url::ParseError),

  #[error("{}", .0)]
  ReqwestError(#[from] reqwest::Error),

  #[error("{}", .0)]
  SerdeError(#[from] serde_json::Error),

  #[error("Failed to build a message pattern. Reason: `{}`", .0)]
  RegexError(#[from] regex::Error),

  #[error("Encountered a Tokio IO error: `{:?}`", .0)]
  TokioIOError(#[from] tokio::io::Error),

  #[error("Attempted to connect the IRC client while it was {:?}. Use reconnect instead.", .0)]
  AlreadyConnected(crate::irc_chat::ConnectionStatus),

  #[error("Timed out after {:?} when connecting to {}.", timeout, address)]
  ConnectTimeout {
    address: String,
    timeout: std::time::Duration,
  },

  #[error("Attempted to reconnect the IRC client before it was ever given credentials.")]
  MissingCredentials,

  #[error("The reserved marker cannot be empty.")]
  EmptyReservedMarker,

  #[error("The IRC server closed the connection.")]
  ConnectionClosedByServer,

  #[error("Gave up reconnecting to IRC after {} failed attempts.", .0)]
  RanOutOfReconnectAttempts(usize),

  #[error("The IRC read loop stopped unexpectedly: {}", .0)]
  ReadLoopPanicked(String),

  #[error("Received an unknown response body structure when querying. Body location: {:?}", .0)]
  UnknownResponseBody(&'static str),

  #[error("Received a failed response from {}. Code: {}", location, code)]
  FailedResponse { location: &'static str, code: u16 },

  #[error("Failed to query helix data for the channel {:?}", .0)]
  UserDoesNotExist(String),

  #[error(
    "Failed to get a response from {} after {} attempts.",
    request,
    attempts
  )]
  RanOutOfGetRequestAttempts { request: String, attempts: usize },

  #[error("Attempted to repeat a GET request for a request that could not be cloned. Request: `{}`", .0)]
  RequestCouldNotBeCloned(String),

  #[error("The notification sink rejected a message from {}. Reason: {}", sender, reason)]
  SinkRejected { sender: String, reason: String },

  #[error("A drain tick panicked: {}", .0)]
  DrainTickPanicked(String),

  #[error("Failed to forward an event, the receiver was closed: {}", error)]
  MpscConnectionClosed { error: String },
}
