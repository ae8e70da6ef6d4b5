use crate::errors::AppError;
use crate::irc_chat::SenderRole;
use crate::notification_queue::collaborators::{IdentityResolver, NotificationSink};
use crate::notification_queue::priority::MessagePriority;
use crate::notification_queue::queued_message::QueuedMessage;
use crate::notification_queue::settings::QueueSettings;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A message waiting to be classified and queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueRequest {
  pub citizen_name: String,
  pub text: String,
  /// Derived from the sender role and reserved marker when absent.
  pub priority: Option<MessagePriority>,
  pub mentions_owner: bool,
  pub sender_role: SenderRole,
}

impl EnqueueRequest {
  pub fn new(citizen_name: impl Into<String>, text: impl Into<String>) -> Self {
    Self {
      citizen_name: citizen_name.into(),
      text: text.into(),
      priority: None,
      mentions_owner: false,
      sender_role: SenderRole::Viewer,
    }
  }

  pub fn with_priority(mut self, priority: MessagePriority) -> Self {
    self.priority = Some(priority);
    self
  }

  pub fn with_mention(mut self, mentions_owner: bool) -> Self {
    self.mentions_owner = mentions_owner;
    self
  }

  pub fn with_sender_role(mut self, sender_role: SenderRole) -> Self {
    self.sender_role = sender_role;
    self
  }
}

/// Shared pause state. While paused, only [`MessagePriority::bypasses_pause`]
/// messages are accepted and nothing drains.
#[derive(Debug, Clone, Default)]
pub struct PauseSwitch(Arc<AtomicBool>);

impl PauseSwitch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn pause(&self) {
    self.0.store(true, Ordering::Release);
  }

  pub fn resume(&self) {
    self.0.store(false, Ordering::Release);
  }

  pub fn is_paused(&self) -> bool {
    self.0.load(Ordering::Acquire)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
  /// Paused, or nothing left to show.
  Idle,
  Emitted { citizen_name: String, target_id: u32 },
  /// No identity could be resolved, so the message was thrown away.
  Dropped { citizen_name: String },
}

#[derive(Debug, Default)]
struct PendingMessages {
  messages: Vec<QueuedMessage>,
  next_sequence: u64,
}

pub struct MessageQueue {
  pending: Mutex<PendingMessages>,
  settings: QueueSettings,
  pause_switch: PauseSwitch,
  identity_resolver: Arc<dyn IdentityResolver>,
  notification_sink: Arc<dyn NotificationSink>,
}

impl MessageQueue {
  pub fn new(
    settings: QueueSettings,
    pause_switch: PauseSwitch,
    identity_resolver: Arc<dyn IdentityResolver>,
    notification_sink: Arc<dyn NotificationSink>,
  ) -> Self {
    Self {
      pending: Mutex::new(PendingMessages::default()),
      settings,
      pause_switch,
      identity_resolver,
      notification_sink,
    }
  }

  /// Returns false if the message was rejected because the queue is paused.
  pub fn enqueue(&self, request: EnqueueRequest) -> bool {
    let citizen_name = request.citizen_name.to_lowercase();
    let priority = request
      .priority
      .unwrap_or_else(|| self.classify(&citizen_name, &request.text, request.sender_role));

    if self.pause_switch.is_paused() && !priority.bypasses_pause() {
      tracing::debug!(
        "Rejected a {} message from {} while paused.",
        priority,
        citizen_name
      );

      return false;
    }

    let mut text = request.text;

    if text.chars().count() > self.settings.max_message_length {
      text = text.chars().take(self.settings.max_message_length).collect();
    }

    let reserved_identity = &self.settings.reserved_identity;

    if !reserved_identity.is_reserved_author(&citizen_name) {
      text = reserved_identity.strip_marker(&text);
    }

    let mut pending = self.pending.lock();
    let sequence = pending.next_sequence;
    pending.next_sequence += 1;

    tracing::trace!("Queued a {} message from {}.", priority, citizen_name);

    pending.messages.push(QueuedMessage::new(
      citizen_name,
      text,
      priority,
      sequence,
      request.mentions_owner,
    ));

    true
  }

  fn classify(&self, citizen_name: &str, text: &str, sender_role: SenderRole) -> MessagePriority {
    let reserved_identity = &self.settings.reserved_identity;

    if reserved_identity.is_reserved_author(citizen_name) && reserved_identity.has_marker(text) {
      return MessagePriority::OwnerOrModUser;
    }

    match sender_role {
      SenderRole::Owner => MessagePriority::OwnerOrModUser,
      SenderRole::Moderator => MessagePriority::Moderator,
      SenderRole::Subscriber => MessagePriority::Subscriber,
      SenderRole::Viewer => MessagePriority::GeneralChat,
    }
  }

  /// Shows at most one message, then trims the backlog.
  ///
  /// The lock is held for the whole selection and removal.
  ///
  /// # Errors
  /// - The notification sink failed. The selected message stays queued.
  pub fn drain_tick(&self) -> Result<TickOutcome, AppError> {
    let mut pending = self.pending.lock();

    if self.pause_switch.is_paused() {
      return Ok(TickOutcome::Idle);
    }

    let index = loop {
      let Some(index) = self.select_next(&pending.messages) else {
        return Ok(TickOutcome::Idle);
      };

      if self.is_hidden(pending.messages[index].priority()) {
        pending.messages.remove(index);
        continue;
      }

      break index;
    };

    let message = &mut pending.messages[index];

    let target_id = match message.resolved_target_id() {
      Some(target_id) => target_id,
      None => match self.identity_resolver.resolve_or_create(message.citizen_name()) {
        Some(target_id) => {
          message.set_resolved_target_id(target_id);
          target_id
        }
        None => {
          let dropped = pending.messages.remove(index);
          tracing::warn!(
            "Dropped a message from {}, no identity could be resolved.",
            dropped.citizen_name()
          );

          self.evict_overflow(&mut pending.messages);

          return Ok(TickOutcome::Dropped {
            citizen_name: dropped.citizen_name().to_string(),
          });
        }
      },
    };

    self
      .notification_sink
      .emit(message.citizen_name(), message.text(), target_id)?;

    let emitted = pending.messages.remove(index);
    self.evict_overflow(&mut pending.messages);

    Ok(TickOutcome::Emitted {
      citizen_name: emitted.citizen_name().to_string(),
      target_id,
    })
  }

  fn select_next(&self, messages: &[QueuedMessage]) -> Option<usize> {
    let order = self.settings.priority_order;
    let prioritize_mentions = self.settings.prioritize_mentions;

    messages
      .iter()
      .enumerate()
      .min_by_key(|(_, message)| {
        (
          order.rank(message.priority()),
          Reverse(prioritize_mentions && message.mentions_owner()),
          *message.enqueued_at(),
          message.sequence(),
        )
      })
      .map(|(index, _)| index)
  }

  fn is_hidden(&self, priority: MessagePriority) -> bool {
    match priority {
      MessagePriority::GeneralChat => !self.settings.show_general_chat,
      MessagePriority::Subscriber => !self.settings.show_subscriber_chat,
      MessagePriority::Moderator => !self.settings.show_moderator_chat,
      _ => false,
    }
  }

  fn evict_overflow(&self, messages: &mut Vec<QueuedMessage>) {
    let caps = [
      (
        self.settings.max_general_chat_backlog,
        MessagePriority::GeneralChat,
      ),
      (
        self.settings.max_subscriber_backlog,
        MessagePriority::Subscriber,
      ),
      (
        self.settings.max_moderator_backlog,
        MessagePriority::Moderator,
      ),
    ];

    for (cap, priority) in caps {
      if messages.len() > cap {
        let before = messages.len();
        messages.retain(|message| message.priority() != priority);

        tracing::info!(
          "Backlog over {}. Evicted {} {} messages.",
          cap,
          before - messages.len(),
          priority
        );
      }
    }
  }

  pub fn len(&self) -> usize {
    self.pending.lock().messages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pending.lock().messages.is_empty()
  }

  /// A copy of the pending messages in insertion order.
  pub fn pending_messages(&self) -> Vec<QueuedMessage> {
    self.pending.lock().messages.clone()
  }

  pub fn pause_switch(&self) -> &PauseSwitch {
    &self.pause_switch
  }

  pub fn settings(&self) -> &QueueSettings {
    &self.settings
  }

  pub fn identity_resolver(&self) -> &Arc<dyn IdentityResolver> {
    &self.identity_resolver
  }

  pub fn notification_sink(&self) -> &Arc<dyn NotificationSink> {
    &self.notification_sink
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::notification_queue::collaborators::MemoizedIdentityResolver;
  use crate::notification_queue::settings::ReservedIdentity;
  use std::sync::atomic::AtomicUsize;

  #[derive(Default)]
  pub(crate) struct RecordingSink {
    pub emitted: Mutex<Vec<(String, String, u32)>>,
    pub failing: AtomicBool,
  }

  impl RecordingSink {
    pub fn senders(&self) -> Vec<String> {
      self
        .emitted
        .lock()
        .iter()
        .map(|(sender, _, _)| sender.clone())
        .collect()
    }
  }

  impl NotificationSink for RecordingSink {
    fn emit(&self, sender: &str, text: &str, target_id: u32) -> Result<(), AppError> {
      if self.failing.load(Ordering::Acquire) {
        return Err(AppError::SinkRejected {
          sender: sender.to_string(),
          reason: "sink is failing".to_string(),
        });
      }

      self
        .emitted
        .lock()
        .push((sender.to_string(), text.to_string(), target_id));

      Ok(())
    }
  }

  /// Resolves every name except `nobody`, counting calls.
  #[derive(Default)]
  struct CountingResolver {
    calls: AtomicUsize,
  }

  impl IdentityResolver for CountingResolver {
    fn resolve_or_create(&self, citizen_name: &str) -> Option<u32> {
      self.calls.fetch_add(1, Ordering::AcqRel);

      (citizen_name != "nobody").then_some(7)
    }
  }

  pub(crate) fn settings() -> QueueSettings {
    QueueSettings::new(ReservedIdentity::new("rabidcrabgt", "#moddev").unwrap())
  }

  fn queue_with(settings: QueueSettings) -> (MessageQueue, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let queue = MessageQueue::new(
      settings,
      PauseSwitch::new(),
      Arc::new(MemoizedIdentityResolver::new()),
      sink.clone(),
    );

    (queue, sink)
  }

  fn queue() -> (MessageQueue, Arc<RecordingSink>) {
    queue_with(settings())
  }

  #[test]
  fn one_message_per_tick() {
    let (queue, sink) = queue();

    queue.enqueue(EnqueueRequest::new("alice", "one"));
    queue.enqueue(EnqueueRequest::new("bob", "two"));

    queue.drain_tick().unwrap();

    assert_eq!(sink.emitted.lock().len(), 1);
    assert_eq!(queue.len(), 1);
  }

  #[test]
  fn empty_queue_is_idle() {
    let (queue, _) = queue();

    assert_eq!(queue.drain_tick().unwrap(), TickOutcome::Idle);
  }

  #[test]
  fn most_urgent_tier_drains_first() {
    let (queue, sink) = queue();

    queue.enqueue(EnqueueRequest::new("viewer", "hi"));
    queue.enqueue(EnqueueRequest::new("sub", "hi").with_sender_role(SenderRole::Subscriber));
    queue.enqueue(EnqueueRequest::new("mod", "hi").with_sender_role(SenderRole::Moderator));
    queue.enqueue(EnqueueRequest::new("system", "hi").with_priority(MessagePriority::Critical));

    for _ in 0..4 {
      queue.drain_tick().unwrap();
    }

    assert_eq!(sink.senders(), vec!["system", "mod", "sub", "viewer"]);
  }

  #[test]
  fn mentions_jump_ahead_only_when_enabled() {
    let (queue, sink) = queue();

    queue.enqueue(EnqueueRequest::new("first", "hi"));
    queue.enqueue(EnqueueRequest::new("second", "hi @bot").with_mention(true));
    queue.drain_tick().unwrap();

    assert_eq!(sink.senders(), vec!["second"]);

    let mut fifo_settings = settings();
    fifo_settings.prioritize_mentions = false;
    let (queue, sink) = queue_with(fifo_settings);

    queue.enqueue(EnqueueRequest::new("first", "hi"));
    queue.enqueue(EnqueueRequest::new("second", "hi @bot").with_mention(true));
    queue.drain_tick().unwrap();

    assert_eq!(sink.senders(), vec!["first"]);
  }

  #[test]
  fn general_chat_is_purged_when_over_capacity() {
    let mut small_settings = settings();
    small_settings.max_general_chat_backlog = 2;
    let (queue, _) = queue_with(small_settings);

    queue.enqueue(EnqueueRequest::new("mod", "hi").with_sender_role(SenderRole::Moderator));

    for index in 0..4 {
      queue.enqueue(EnqueueRequest::new(format!("viewer{index}"), "hi"));
    }

    queue.drain_tick().unwrap();

    let remaining = queue.pending_messages();

    assert!(remaining.is_empty());
  }

  #[test]
  fn capacity_rules_apply_in_order() {
    let mut small_settings = settings();
    small_settings.max_general_chat_backlog = 1;
    small_settings.max_subscriber_backlog = 1;
    let (queue, _) = queue_with(small_settings);

    queue.enqueue(EnqueueRequest::new("critical", "hi").with_priority(MessagePriority::Critical));
    queue.enqueue(EnqueueRequest::new("follower", "hi").with_priority(MessagePriority::NewFollower));
    queue.enqueue(EnqueueRequest::new("follower2", "hi").with_priority(MessagePriority::NewFollower));
    queue.enqueue(EnqueueRequest::new("sub", "hi").with_sender_role(SenderRole::Subscriber));
    queue.enqueue(EnqueueRequest::new("viewer", "hi"));

    queue.drain_tick().unwrap();

    let priorities: Vec<MessagePriority> = queue
      .pending_messages()
      .iter()
      .map(QueuedMessage::priority)
      .collect();

    assert_eq!(
      priorities,
      vec![MessagePriority::NewFollower, MessagePriority::NewFollower]
    );
  }

  #[test]
  fn moderator_chat_is_purged_when_over_its_own_capacity() {
    let mut small_settings = settings();
    small_settings.max_moderator_backlog = 2;
    let (queue, sink) = queue_with(small_settings);

    queue.enqueue(EnqueueRequest::new("critical", "hi").with_priority(MessagePriority::Critical));

    for index in 0..3 {
      queue.enqueue(EnqueueRequest::new(format!("mod{index}"), "hi").with_sender_role(SenderRole::Moderator));
    }

    queue.enqueue(EnqueueRequest::new("sub", "hi").with_sender_role(SenderRole::Subscriber));
    queue.enqueue(EnqueueRequest::new("viewer", "hi"));

    queue.drain_tick().unwrap();

    let remaining: Vec<(String, MessagePriority)> = queue
      .pending_messages()
      .iter()
      .map(|message| (message.citizen_name().to_string(), message.priority()))
      .collect();

    assert_eq!(sink.senders(), vec!["critical"]);
    assert_eq!(
      remaining,
      vec![
        ("sub".to_string(), MessagePriority::Subscriber),
        ("viewer".to_string(), MessagePriority::GeneralChat),
      ]
    );
  }

  #[test]
  fn paused_queue_only_accepts_bypassing_priorities() {
    let (queue, sink) = queue();
    queue.pause_switch().pause();

    assert!(!queue.enqueue(EnqueueRequest::new("viewer", "hi")));
    assert!(queue.enqueue(EnqueueRequest::new("system", "hi").with_priority(MessagePriority::Critical)));
    assert!(queue.enqueue(EnqueueRequest::new("bot", "hi").with_sender_role(SenderRole::Owner)));
    assert_eq!(queue.len(), 2);

    assert_eq!(queue.drain_tick().unwrap(), TickOutcome::Idle);
    assert!(sink.emitted.lock().is_empty());

    queue.pause_switch().resume();
    queue.drain_tick().unwrap();

    assert_eq!(sink.senders(), vec!["system"]);
  }

  #[test]
  fn text_is_truncated_to_the_maximum_length() {
    let mut short_settings = settings();
    short_settings.max_message_length = 5;
    let (queue, _) = queue_with(short_settings);

    queue.enqueue(EnqueueRequest::new("alice", "héllo world"));
    queue.enqueue(EnqueueRequest::new("bob", "hey"));

    let pending = queue.pending_messages();

    assert_eq!(pending[0].text(), "héllo");
    assert_eq!(pending[1].text(), "hey");
  }

  #[test]
  fn names_are_lowercased() {
    let (queue, _) = queue();

    queue.enqueue(EnqueueRequest::new("Alice", "hi"));

    assert_eq!(queue.pending_messages()[0].citizen_name(), "alice");
  }

  #[test]
  fn reserved_marker_is_only_kept_for_the_reserved_author() {
    let (queue, _) = queue();

    queue.enqueue(EnqueueRequest::new("RabidCrabGT", "hello #ModDev"));
    queue.enqueue(EnqueueRequest::new("imposter", "hello #moddev"));

    let pending = queue.pending_messages();

    assert_eq!(pending[0].text(), "hello #ModDev");
    assert_eq!(pending[0].priority(), MessagePriority::OwnerOrModUser);
    assert_eq!(pending[1].text(), "hello ");
    assert_eq!(pending[1].priority(), MessagePriority::GeneralChat);
  }

  #[test]
  fn hidden_categories_are_removed_and_the_next_message_is_shown() {
    let mut filtered_settings = settings();
    filtered_settings.show_moderator_chat = false;
    let (queue, sink) = queue_with(filtered_settings);

    queue.enqueue(EnqueueRequest::new("mod", "hi").with_sender_role(SenderRole::Moderator));
    queue.enqueue(EnqueueRequest::new("viewer", "hi"));

    let outcome = queue.drain_tick().unwrap();

    assert_eq!(
      outcome,
      TickOutcome::Emitted {
        citizen_name: "viewer".to_string(),
        target_id: 1
      }
    );
    assert_eq!(sink.senders(), vec!["viewer"]);
    assert!(queue.is_empty());
  }

  #[test]
  fn unresolvable_messages_are_dropped() {
    let sink = Arc::new(RecordingSink::default());
    let queue = MessageQueue::new(
      settings(),
      PauseSwitch::new(),
      Arc::new(CountingResolver::default()),
      sink.clone(),
    );

    queue.enqueue(EnqueueRequest::new("nobody", "hi"));

    assert_eq!(
      queue.drain_tick().unwrap(),
      TickOutcome::Dropped {
        citizen_name: "nobody".to_string()
      }
    );
    assert!(queue.is_empty());
    assert!(sink.emitted.lock().is_empty());
  }

  #[test]
  fn sink_errors_keep_the_message_and_its_resolved_id() {
    let resolver = Arc::new(CountingResolver::default());
    let sink = Arc::new(RecordingSink::default());
    let queue = MessageQueue::new(
      settings(),
      PauseSwitch::new(),
      resolver.clone(),
      sink.clone(),
    );

    queue.enqueue(EnqueueRequest::new("alice", "hi"));
    sink.failing.store(true, Ordering::Release);

    assert!(matches!(
      queue.drain_tick(),
      Err(AppError::SinkRejected { .. })
    ));
    assert_eq!(queue.pending_messages()[0].resolved_target_id(), Some(7));

    sink.failing.store(false, Ordering::Release);
    queue.drain_tick().unwrap();

    assert_eq!(sink.senders(), vec!["alice"]);
    assert_eq!(resolver.calls.load(Ordering::Acquire), 1);
  }
}
