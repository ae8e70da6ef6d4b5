use crate::errors::AppError;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;

const HASHTAGGED_EMOTES: [&str; 2] = ["Kappa", "Kreygasm"];

/// Maps a chat name to the id of whoever displays the notification.
pub trait IdentityResolver: Send + Sync {
  /// Returns `None` when no identity can be found or created for the name.
  fn resolve_or_create(&self, citizen_name: &str) -> Option<u32>;
}

/// Where drained messages end up.
pub trait NotificationSink: Send + Sync {
  fn emit(&self, sender: &str, text: &str, target_id: u32) -> Result<(), AppError>;
}

/// Hands out sequential ids, starting at 1, and remembers them by name.
#[derive(Debug, Default)]
pub struct MemoizedIdentityResolver {
  identities: Mutex<HashMap<String, u32>>,
}

impl MemoizedIdentityResolver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.identities.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.identities.lock().is_empty()
  }
}

impl IdentityResolver for MemoizedIdentityResolver {
  fn resolve_or_create(&self, citizen_name: &str) -> Option<u32> {
    let citizen_name = citizen_name.trim().to_lowercase();

    if citizen_name.is_empty() {
      return None;
    }

    let mut identities = self.identities.lock();
    let next_id = identities.len() as u32 + 1;

    Some(*identities.entry(citizen_name).or_insert(next_id))
  }
}

/// Writes every notification to the log.
pub struct LoggingSink {
  emote_pattern: Regex,
}

impl LoggingSink {
  pub fn new() -> Result<Self, AppError> {
    let emote_pattern = Regex::new(&format!(r"\b({})\b", HASHTAGGED_EMOTES.join("|")))?;

    Ok(Self { emote_pattern })
  }

  /// `Kappa` becomes `#Kappa`. Emotes that already carry a hashtag are left alone.
  pub fn hashtag_emotes(&self, text: &str) -> String {
    let mut hashtagged = String::with_capacity(text.len());
    let mut last_end = 0;

    for emote in self.emote_pattern.find_iter(text) {
      hashtagged.push_str(&text[last_end..emote.start()]);

      if !text[..emote.start()].ends_with('#') {
        hashtagged.push('#');
      }

      hashtagged.push_str(emote.as_str());
      last_end = emote.end();
    }

    hashtagged.push_str(&text[last_end..]);

    hashtagged
  }
}

impl NotificationSink for LoggingSink {
  fn emit(&self, sender: &str, text: &str, target_id: u32) -> Result<(), AppError> {
    tracing::info!(
      "[{}] {}: {}",
      target_id,
      sender,
      self.hashtag_emotes(text)
    );

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolver_memoizes_ids_by_name() {
    let resolver = MemoizedIdentityResolver::new();

    assert_eq!(resolver.resolve_or_create("alice"), Some(1));
    assert_eq!(resolver.resolve_or_create("bob"), Some(2));
    assert_eq!(resolver.resolve_or_create("Alice"), Some(1));
    assert_eq!(resolver.len(), 2);
  }

  #[test]
  fn resolver_rejects_empty_names() {
    let resolver = MemoizedIdentityResolver::new();

    assert_eq!(resolver.resolve_or_create("  "), None);
    assert!(resolver.is_empty());
  }

  #[test]
  fn emotes_get_hashtagged_once() {
    let sink = LoggingSink::new().unwrap();

    assert_eq!(
      sink.hashtag_emotes("Kappa that was great Kreygasm"),
      "#Kappa that was great #Kreygasm"
    );
    assert_eq!(sink.hashtag_emotes("#Kappa"), "#Kappa");
    assert_eq!(sink.hashtag_emotes("Kappaccino"), "Kappaccino");
  }
}
