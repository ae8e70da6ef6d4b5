use crate::errors::AppError;
use crate::notification_queue::message_queue::{MessageQueue, TickOutcome};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Shorter delays are raised to this.
pub const MINIMUM_TIMER_DELAY: Duration = Duration::from_millis(100);

/// Drains one message from the queue on a fixed delay.
pub struct DrainScheduler {
  queue: Arc<MessageQueue>,
  delay: Duration,
  timer: Option<JoinHandle<()>>,
}

impl DrainScheduler {
  pub fn new(queue: Arc<MessageQueue>, delay: Duration) -> Self {
    Self {
      queue,
      delay: delay.max(MINIMUM_TIMER_DELAY),
      timer: None,
    }
  }

  /// Starts ticking. Does nothing if the timer is already running.
  pub fn start(&mut self) {
    if self.timer.is_some() {
      return;
    }

    tracing::info!("Starting the drain timer with a delay of {:?}.", self.delay);

    self.timer = Some(tokio::spawn(run_timer(self.queue.clone(), self.delay)));
  }

  /// Replaces the running timer with one at the new delay. Queued messages are kept.
  pub async fn change_timer_delay(&mut self, delay: Duration) {
    let delay = delay.max(MINIMUM_TIMER_DELAY);
    let was_running = self.timer.is_some();

    self.stop().await;
    self.delay = delay;

    if was_running {
      self.start();
    }
  }

  /// Waits for the timer task to finish before returning.
  pub async fn stop(&mut self) {
    let Some(timer) = self.timer.take() else {
      return;
    };

    timer.abort();

    match timer.await {
      Err(error) if !error.is_cancelled() => {
        tracing::error!("The drain timer stopped unexpectedly: {}", error)
      }
      _ => (),
    }
  }

  pub fn delay(&self) -> Duration {
    self.delay
  }

  pub fn is_running(&self) -> bool {
    self.timer.is_some()
  }

  pub fn queue(&self) -> &Arc<MessageQueue> {
    &self.queue
  }
}

async fn run_timer(queue: Arc<MessageQueue>, delay: Duration) {
  let mut interval = interval_at(Instant::now() + delay, delay);
  interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    interval.tick().await;

    run_tick(&queue);
  }
}

/// Runs one drain tick. Errors and panics are logged, never propagated.
pub fn run_tick(queue: &MessageQueue) -> Option<TickOutcome> {
  match catch_unwind(AssertUnwindSafe(|| queue.drain_tick())) {
    Ok(Ok(outcome)) => Some(outcome),
    Ok(Err(error)) => {
      tracing::error!("Abandoned a drain tick. Reason: {}", error);

      None
    }
    Err(panic) => {
      tracing::error!("{}", AppError::DrainTickPanicked(panic_reason(panic)));

      None
    }
  }
}

fn panic_reason(panic: Box<dyn Any + Send>) -> String {
  if let Some(reason) = panic.downcast_ref::<&str>() {
    reason.to_string()
  } else if let Some(reason) = panic.downcast_ref::<String>() {
    reason.clone()
  } else {
    "unknown panic".to_string()
  }
}
