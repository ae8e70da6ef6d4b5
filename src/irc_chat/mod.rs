pub mod chat_event;
pub mod chat_session;
pub mod chat_user;
pub mod irc_line;
pub mod twitch_irc;
pub mod user_registry;

pub use chat_event::{ChatMessage, DisconnectReason, IrcEvent};
pub use chat_user::ChatUser;
pub use twitch_irc::{ConnectionSettings, ConnectionStatus, IrcCredentials, TwitchIrc};
pub use user_registry::{SenderRole, UserRegistry};

/// The synthetic user that authors the client's own status messages.
pub const TWITCH_SYSTEM_USER: &str = "twitch";
