use crate::errors::AppError;
use crate::follower_watcher::{FollowerWatcher, HelixClient};
use crate::irc_chat::{ConnectionSettings, IrcCredentials, TwitchIrc};
use crate::notification_queue::{
  DrainScheduler, LoggingSink, MemoizedIdentityResolver, MessageQueue, PauseSwitch, QueueSettings,
};
use crate::processes::event_router::{EventRouter, MessageTemplates};
use app_config::AppConfig;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Builds the queue, drain timer, IRC client and follower watcher, then routes events
/// until the router stops.
pub async fn run_main_process(config: &AppConfig) -> Result<(), AppError> {
  tracing::info!("Starting main process.");

  let (irc_sender, irc_receiver) = mpsc::unbounded_channel();
  let (follower_sender, follower_receiver) = mpsc::unbounded_channel();

  let message_queue = Arc::new(MessageQueue::new(
    QueueSettings::from_config(config)?,
    PauseSwitch::new(),
    Arc::new(MemoizedIdentityResolver::new()),
    Arc::new(LoggingSink::new()?),
  ));
  let mut scheduler = DrainScheduler::new(message_queue.clone(), config.delay_between_messages());

  let mut irc_client = TwitchIrc::new(ConnectionSettings::from_config(config), irc_sender);
  irc_client.connect(IrcCredentials::from_config(config))?;

  match HelixClient::from_config(config)? {
    Some(helix_client) => {
      let follower_watcher = FollowerWatcher::new(
        helix_client,
        config.channel(),
        config.follower_poll_interval(),
      );

      tokio::spawn(follower_watcher.run(follower_sender));
    }
    None => {
      tracing::info!("No client id configured. Not watching for new followers.");

      drop(follower_sender);
    }
  }

  let event_router = EventRouter::new(
    irc_client,
    message_queue,
    MessageTemplates::from_config(config),
    config.channel(),
    config.reconnect_attempts(),
  );

  event_router.enqueue_welcome_message(scheduler.delay());
  scheduler.start();

  tracing::info!("Running main process.");

  let result = event_router.run(irc_receiver, follower_receiver).await;

  scheduler.stop().await;

  result
}
