/// How urgently a queued message should be shown.
///
/// Variants are listed from most to least urgent in their default order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessagePriority {
  Critical,
  /// The channel owner, or the reserved author using the reserved marker.
  OwnerOrModUser,
  NewSubscriber,
  Moderator,
  NewFollower,
  Subscriber,
  GeneralChat,
}

impl MessagePriority {
  /// Messages that are still accepted while the queue is paused.
  pub fn bypasses_pause(self) -> bool {
    matches!(self, Self::Critical | Self::OwnerOrModUser)
  }
}

impl std::fmt::Display for MessagePriority {
  fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Self::Critical => "critical",
      Self::OwnerOrModUser => "owner or mod user",
      Self::NewSubscriber => "new subscriber",
      Self::Moderator => "moderator",
      Self::NewFollower => "new follower",
      Self::Subscriber => "subscriber",
      Self::GeneralChat => "general chat",
    };

    formatter.write_str(name)
  }
}

/// Maps priorities to ranks, lowest rank drains first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityOrder {
  followers_above_subscribers: bool,
}

impl PriorityOrder {
  pub fn new(followers_above_subscribers: bool) -> Self {
    Self {
      followers_above_subscribers,
    }
  }

  pub fn rank(&self, priority: MessagePriority) -> u8 {
    match priority {
      MessagePriority::Critical => 0,
      MessagePriority::OwnerOrModUser => 1,
      MessagePriority::NewSubscriber => 2,
      MessagePriority::Moderator => 3,
      MessagePriority::NewFollower if self.followers_above_subscribers => 4,
      MessagePriority::NewFollower => 5,
      MessagePriority::Subscriber if self.followers_above_subscribers => 5,
      MessagePriority::Subscriber => 4,
      MessagePriority::GeneralChat => 6,
    }
  }
}

impl Default for PriorityOrder {
  fn default() -> Self {
    Self::new(true)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const CANONICAL_ORDER: [MessagePriority; 7] = [
    MessagePriority::Critical,
    MessagePriority::OwnerOrModUser,
    MessagePriority::NewSubscriber,
    MessagePriority::Moderator,
    MessagePriority::NewFollower,
    MessagePriority::Subscriber,
    MessagePriority::GeneralChat,
  ];

  #[test]
  fn default_order_is_canonical() {
    let order = PriorityOrder::default();
    let ranks: Vec<u8> = CANONICAL_ORDER.iter().map(|priority| order.rank(*priority)).collect();

    assert_eq!(ranks, vec![0, 1, 2, 3, 4, 5, 6]);
  }

  #[test]
  fn followers_can_rank_below_subscribers() {
    let order = PriorityOrder::new(false);

    assert!(order.rank(MessagePriority::Subscriber) < order.rank(MessagePriority::NewFollower));
    assert!(order.rank(MessagePriority::Moderator) < order.rank(MessagePriority::Subscriber));
    assert!(order.rank(MessagePriority::NewFollower) < order.rank(MessagePriority::GeneralChat));
  }

  #[test]
  fn only_critical_and_owner_bypass_pause() {
    let bypassing: Vec<MessagePriority> = CANONICAL_ORDER
      .into_iter()
      .filter(|priority| priority.bypasses_pause())
      .collect();

    assert_eq!(
      bypassing,
      vec![MessagePriority::Critical, MessagePriority::OwnerOrModUser]
    );
  }
}
