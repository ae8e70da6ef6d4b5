pub mod collaborators;
pub mod message_queue;
pub mod priority;
pub mod queued_message;
pub mod scheduler;
pub mod settings;

pub use collaborators::{IdentityResolver, LoggingSink, MemoizedIdentityResolver, NotificationSink};
pub use message_queue::{EnqueueRequest, MessageQueue, PauseSwitch, TickOutcome};
pub use priority::{MessagePriority, PriorityOrder};
pub use queued_message::QueuedMessage;
pub use scheduler::DrainScheduler;
pub use settings::{QueueSettings, ReservedIdentity};
