pub mod errors;
pub mod follower_watcher;
pub mod helper_methods;
pub mod irc_chat;
pub mod logging;
pub mod notification_queue;
pub mod processes;
