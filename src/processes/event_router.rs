use crate::errors::AppError;
use crate::follower_watcher::NewFollowers;
use crate::irc_chat::{ChatMessage, ChatUser, DisconnectReason, IrcEvent, TwitchIrc};
use crate::notification_queue::{EnqueueRequest, MessagePriority, MessageQueue};
use app_config::AppConfig;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::mpsc;

const TEMPLATE_PLACEHOLDER: &str = "{}";
const RECONNECT_WAIT: Duration = Duration::from_secs(10);

/// The text used for subscription and follower announcements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplates {
  pub show_subscriber_messages: bool,
  pub new_subscriber: String,
  pub repeat_subscriber: String,
  pub senior_subscriber: String,
  pub show_new_followers: bool,
  pub new_followers: String,
}

impl MessageTemplates {
  pub fn from_config(config: &AppConfig) -> Self {
    Self {
      show_subscriber_messages: config.show_subscriber_messages(),
      new_subscriber: config.new_subscriber_message().to_string(),
      repeat_subscriber: config.repeat_subscriber_message().to_string(),
      senior_subscriber: config.senior_subscriber_message().to_string(),
      show_new_followers: config.show_new_followers_message(),
      new_followers: config.new_followers_message().to_string(),
    }
  }

  pub fn subscriber_message(&self, months_subscribed: u32) -> String {
    let template = match months_subscribed {
      0..=1 => &self.new_subscriber,
      2..=5 => &self.repeat_subscriber,
      _ => &self.senior_subscriber,
    };

    template.replace(TEMPLATE_PLACEHOLDER, &months_subscribed.to_string())
  }

  pub fn followers_message(&self, followers: &[ChatUser]) -> String {
    let names = followers
      .iter()
      .map(ChatUser::username)
      .collect::<Vec<&str>>()
      .join(", ");

    self.new_followers.replace(TEMPLATE_PLACEHOLDER, &names)
  }
}

/// Turns IRC and follower events into queued notifications, and keeps the IRC client connected.
pub struct EventRouter {
  irc_client: TwitchIrc,
  message_queue: Arc<MessageQueue>,
  templates: MessageTemplates,
  channel: String,
  reconnect_attempts: usize,
  reconnect_wait: Duration,
  failed_reconnects: usize,
}

impl EventRouter {
  pub fn new(
    irc_client: TwitchIrc,
    message_queue: Arc<MessageQueue>,
    templates: MessageTemplates,
    channel: &str,
    reconnect_attempts: usize,
  ) -> Self {
    Self {
      irc_client,
      message_queue,
      templates,
      channel: channel.to_lowercase(),
      reconnect_attempts,
      reconnect_wait: RECONNECT_WAIT,
      failed_reconnects: 0,
    }
  }

  pub fn with_reconnect_wait(mut self, reconnect_wait: Duration) -> Self {
    self.reconnect_wait = reconnect_wait;
    self
  }

  pub fn irc_client(&self) -> &TwitchIrc {
    &self.irc_client
  }

  /// Routes events until ctrl-c, or until reconnecting has failed too many times in a row.
  ///
  /// The IRC client is shut down before returning.
  pub async fn run(
    self,
    irc_receiver: mpsc::UnboundedReceiver<IrcEvent>,
    follower_receiver: mpsc::UnboundedReceiver<NewFollowers>,
  ) -> Result<(), AppError> {
    self
      .run_until(irc_receiver, follower_receiver, tokio::signal::ctrl_c())
      .await
  }

  /// Routes events until `shutdown` resolves.
  ///
  /// `shutdown` is created once, so a signal raised while an event is being handled
  /// still ends the loop afterwards.
  pub async fn run_until<F>(
    mut self,
    mut irc_receiver: mpsc::UnboundedReceiver<IrcEvent>,
    mut follower_receiver: mpsc::UnboundedReceiver<NewFollowers>,
    shutdown: F,
  ) -> Result<(), AppError>
  where
    F: Future,
  {
    let mut followers_open = true;

    tokio::pin!(shutdown);

    let result = loop {
      tokio::select! {
        irc_event = irc_receiver.recv() => {
          let Some(irc_event) = irc_event else {
            break Ok(());
          };

          if let Err(error) = self.handle_irc_event(irc_event).await {
            break Err(error);
          }
        }
        new_followers = follower_receiver.recv(), if followers_open => {
          match new_followers {
            Some(new_followers) => self.handle_new_followers(new_followers),
            None => followers_open = false,
          }
        }
        _ = &mut shutdown => {
          tracing::info!("Received the shutdown signal.");

          break Ok(());
        }
      }
    };

    self.irc_client.shutdown().await;

    result
  }

  pub async fn handle_irc_event(&mut self, irc_event: IrcEvent) -> Result<(), AppError> {
    match irc_event {
      IrcEvent::Connected => {
        tracing::info!("Connected to the IRC server.");
        self.failed_reconnects = 0;
      }
      IrcEvent::Disconnected { reason: None } => {
        tracing::info!("Disconnected from the IRC server.");
      }
      IrcEvent::Disconnected {
        reason: Some(DisconnectReason::LoginRejected),
      } => {
        tracing::error!("The IRC login was rejected. Not reconnecting.");
      }
      IrcEvent::Disconnected {
        reason: Some(DisconnectReason::Failure(reason)),
      } => {
        tracing::warn!("Lost the IRC connection. Reason: {}", reason);

        self.reconnect().await?;
      }
      IrcEvent::ChatMessageReceived(chat_message) => self.route_chat_message(chat_message),
      IrcEvent::NewSubscriber(subscriber) => self.route_new_subscriber(&subscriber),
    }

    Ok(())
  }

  async fn reconnect(&mut self) -> Result<(), AppError> {
    self.failed_reconnects += 1;

    if self.failed_reconnects > self.reconnect_attempts {
      return Err(AppError::RanOutOfReconnectAttempts(self.reconnect_attempts));
    }

    tracing::info!(
      "Reconnecting in {:?}. Attempt {} of {}.",
      self.reconnect_wait,
      self.failed_reconnects,
      self.reconnect_attempts
    );

    tokio::time::sleep(self.reconnect_wait).await;

    self.irc_client.reconnect(None).await
  }

  /// Feedback goes straight to the sink. Everything else is queued.
  pub fn route_chat_message(&self, chat_message: ChatMessage) {
    if !chat_message.is_user_feedback() {
      self.message_queue.enqueue(
        EnqueueRequest::new(chat_message.user().username(), chat_message.text())
          .with_mention(chat_message.mentions_owner())
          .with_sender_role(chat_message.sender_role()),
      );

      return;
    }

    let sender = chat_message.user().username();
    let Some(target_id) = self
      .message_queue
      .identity_resolver()
      .resolve_or_create(sender)
    else {
      tracing::warn!("Could not resolve an identity for feedback from {}.", sender);
      return;
    };

    if let Err(error) = self
      .message_queue
      .notification_sink()
      .emit(sender, chat_message.text(), target_id)
    {
      tracing::error!("Failed to show a feedback message. Reason: {}", error);
    }
  }

  pub fn route_new_subscriber(&self, subscriber: &ChatUser) {
    if !self.templates.show_subscriber_messages {
      return;
    }

    let text = self
      .templates
      .subscriber_message(subscriber.months_subscribed());

    self.message_queue.enqueue(
      EnqueueRequest::new(subscriber.username(), text).with_priority(MessagePriority::NewSubscriber),
    );
  }

  pub fn handle_new_followers(&self, NewFollowers(followers): NewFollowers) {
    if !self.templates.show_new_followers || followers.is_empty() {
      return;
    }

    tracing::info!("{} new followers.", followers.len());

    let text = self.templates.followers_message(&followers);

    self.message_queue.enqueue(
      EnqueueRequest::new(&self.channel, text).with_priority(MessagePriority::NewFollower),
    );
  }

  pub fn enqueue_welcome_message(&self, delay_between_messages: Duration) {
    let text = format!(
      "Now showing chat from {}. One message every {} seconds.",
      self.channel,
      delay_between_messages.as_secs_f32()
    );

    self.message_queue.enqueue(
      EnqueueRequest::new(&self.channel, text).with_priority(MessagePriority::Critical),
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::irc_chat::{ConnectionSettings, IrcCredentials, SenderRole};
  use app_config::secret_string::Secret;
  use tokio::sync::oneshot;
  use crate::notification_queue::message_queue::tests::{settings, RecordingSink};
  use crate::notification_queue::{MemoizedIdentityResolver, PauseSwitch};

  fn templates() -> MessageTemplates {
    MessageTemplates {
      show_subscriber_messages: true,
      new_subscriber: "new!".to_string(),
      repeat_subscriber: "{} months!".to_string(),
      senior_subscriber: "{} months, a veteran!".to_string(),
      show_new_followers: true,
      new_followers: "Welcome {}".to_string(),
    }
  }

  fn router() -> (EventRouter, Arc<MessageQueue>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let message_queue = Arc::new(MessageQueue::new(
      settings(),
      PauseSwitch::new(),
      Arc::new(MemoizedIdentityResolver::new()),
      sink.clone(),
    ));
    let (sender, _receiver) = mpsc::unbounded_channel();
    let irc_client = TwitchIrc::new(
      ConnectionSettings::new("127.0.0.1", 1, Duration::from_millis(100)),
      sender,
    );
    let router = EventRouter::new(irc_client, message_queue.clone(), templates(), "Chan", 2);

    (router, message_queue, sink)
  }

  #[test]
  fn subscriber_templates_follow_month_thresholds() {
    let templates = templates();

    assert_eq!(templates.subscriber_message(1), "new!");
    assert_eq!(templates.subscriber_message(2), "2 months!");
    assert_eq!(templates.subscriber_message(5), "5 months!");
    assert_eq!(templates.subscriber_message(6), "6 months, a veteran!");
  }

  #[test]
  fn followers_message_joins_names() {
    let followers = vec![
      ChatUser::new_follower("alice", None),
      ChatUser::new_follower("bob", None),
    ];

    assert_eq!(templates().followers_message(&followers), "Welcome alice, bob");
  }

  #[tokio::test]
  async fn chat_messages_are_queued_with_their_role() {
    let (router, message_queue, sink) = router();
    let message = ChatMessage::new(
      ChatUser::new("dave"),
      "chan",
      "hello @bot",
      true,
      SenderRole::Moderator,
    );

    router.route_chat_message(message);

    let pending = message_queue.pending_messages();

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].priority(), MessagePriority::Moderator);
    assert!(pending[0].mentions_owner());
    assert!(sink.emitted.lock().is_empty());
  }

  #[tokio::test]
  async fn feedback_bypasses_the_queue() {
    let (router, message_queue, sink) = router();
    message_queue.pause_switch().pause();

    router.route_chat_message(ChatMessage::user_feedback("chan", "Login successful!"));

    assert!(message_queue.is_empty());
    assert_eq!(sink.senders(), vec!["twitch"]);
  }

  #[tokio::test]
  async fn subscribers_and_followers_are_queued_with_their_priorities() {
    let (router, message_queue, _) = router();

    router.route_new_subscriber(&ChatUser::new_subscriber("carol", 3));
    router.handle_new_followers(NewFollowers(vec![ChatUser::new_follower("erin", None)]));

    let pending = message_queue.pending_messages();

    assert_eq!(pending[0].citizen_name(), "carol");
    assert_eq!(pending[0].text(), "3 months!");
    assert_eq!(pending[0].priority(), MessagePriority::NewSubscriber);
    assert_eq!(pending[1].citizen_name(), "chan");
    assert_eq!(pending[1].text(), "Welcome erin");
    assert_eq!(pending[1].priority(), MessagePriority::NewFollower);
  }

  #[tokio::test]
  async fn hidden_announcements_are_not_queued() {
    let (mut router, message_queue, _) = router();
    router.templates.show_subscriber_messages = false;
    router.templates.show_new_followers = false;

    router.route_new_subscriber(&ChatUser::new_subscriber("carol", 3));
    router.handle_new_followers(NewFollowers(vec![ChatUser::new_follower("erin", None)]));

    assert!(message_queue.is_empty());
  }

  #[tokio::test]
  async fn welcome_message_is_critical() {
    let (router, message_queue, _) = router();
    message_queue.pause_switch().pause();

    router.enqueue_welcome_message(Duration::from_secs(9));

    assert_eq!(
      message_queue.pending_messages()[0].priority(),
      MessagePriority::Critical
    );
  }

  #[tokio::test]
  async fn reconnecting_gives_up_after_the_configured_attempts() {
    let (router, _, _) = router();
    let mut router = router.with_reconnect_wait(Duration::from_millis(1));
    let failure = || IrcEvent::Disconnected {
      reason: Some(DisconnectReason::Failure("boom".to_string())),
    };

    router.failed_reconnects = 2;

    assert!(matches!(
      router.handle_irc_event(failure()).await,
      Err(AppError::RanOutOfReconnectAttempts(2))
    ));
  }

  #[tokio::test]
  async fn login_rejection_does_not_reconnect() {
    let (mut router, _, _) = router();

    router
      .handle_irc_event(IrcEvent::Disconnected {
        reason: Some(DisconnectReason::LoginRejected),
      })
      .await
      .unwrap();

    assert_eq!(router.failed_reconnects, 0);
  }

  #[tokio::test]
  async fn shutdown_during_a_reconnect_still_stops_the_router() {
    let (router, _, _) = router();
    let mut router = router.with_reconnect_wait(Duration::from_millis(300));
    router
      .irc_client
      .connect(IrcCredentials::new("bot", Secret::from("oauth:abc"), "chan"))
      .unwrap();

    let (irc_sender, irc_receiver) = mpsc::unbounded_channel();
    let (_follower_sender, follower_receiver) = mpsc::unbounded_channel();
    let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();

    irc_sender
      .send(IrcEvent::Disconnected {
        reason: Some(DisconnectReason::Failure("boom".to_string())),
      })
      .unwrap();

    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(50)).await;
      shutdown_sender.send(()).unwrap();
    });

    let result = tokio::time::timeout(
      Duration::from_secs(5),
      router.run_until(irc_receiver, follower_receiver, shutdown_receiver),
    )
    .await
    .expect("the router kept running after the shutdown signal");

    assert!(result.is_ok());
    drop(irc_sender);
  }
}
