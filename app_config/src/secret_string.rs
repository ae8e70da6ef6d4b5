use secrecy::{ExposeSecret, SecretBox, SecretString};
use std::str::FromStr;

const OAUTH_PREFIX: &str = "oauth:";

/// Wraps [`SecretString`](secrecy::SecretString) so credentials can live in the
/// [`schematic::Config`](schematic::Config) without being printed or serialized.
#[derive(Debug, Clone)]
pub struct Secret(SecretString);

impl Secret {
  pub fn new(value: String) -> Self {
    Self(SecretBox::new(value.into_boxed_str()))
  }

  pub fn read_value(&self) -> &SecretString {
    &self.0
  }

  pub fn read_secret_string(secret: &SecretString) -> &str {
    secret.expose_secret()
  }

  /// The value as IRC expects it after `PASS`, always carrying the `oauth:` prefix.
  pub fn irc_password(&self) -> String {
    let value = self.0.expose_secret();

    if value.starts_with(OAUTH_PREFIX) {
      value.to_string()
    } else {
      format!("{OAUTH_PREFIX}{value}")
    }
  }

  /// The value as Helix expects it after `Bearer`, without the `oauth:` prefix.
  pub fn bearer_token(&self) -> &str {
    let value = self.0.expose_secret();

    value.strip_prefix(OAUTH_PREFIX).unwrap_or(value)
  }

  pub fn has_oauth_prefix(&self) -> bool {
    self.0.expose_secret().starts_with(OAUTH_PREFIX)
  }

  pub fn is_empty(&self) -> bool {
    self.0.expose_secret().trim().is_empty()
  }
}

impl serde::Serialize for Secret {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    "Secret: \" ... \"".serialize(serializer)
  }
}

impl<'de> serde::Deserialize<'de> for Secret {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    deserializer.deserialize_string(Secret(Default::default()))
  }
}

impl<'de> serde::de::Visitor<'de> for Secret {
  type Value = Secret;

  fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    formatter.write_str("A string value.")
  }

  fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
  where
    E: serde::de::Error,
  {
    Ok(Secret::new(value))
  }

  fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
  where
    E: serde::de::Error,
  {
    Ok(Secret::new(value.to_string()))
  }
}

/// Secrets never compare equal, so a changed token can't be detected by comparing configs.
impl PartialEq for Secret {
  fn eq(&self, _: &Self) -> bool {
    false
  }
}

impl Default for Secret {
  fn default() -> Self {
    Self::new(String::default())
  }
}

impl<S> From<S> for Secret
where
  S: AsRef<str>,
{
  fn from(token_value: S) -> Self {
    Self::new(token_value.as_ref().to_string())
  }
}

impl FromStr for Secret {
  type Err = Box<dyn std::error::Error>;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Self::from(s))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn irc_password_always_has_the_oauth_prefix() {
    assert_eq!(Secret::from("abc123").irc_password(), "oauth:abc123");
    assert_eq!(Secret::from("oauth:abc123").irc_password(), "oauth:abc123");
  }

  #[test]
  fn bearer_token_strips_the_oauth_prefix() {
    assert_eq!(Secret::from("oauth:abc123").bearer_token(), "abc123");
    assert_eq!(Secret::from("abc123").bearer_token(), "abc123");
  }

  #[test]
  fn debug_output_does_not_leak_the_value() {
    let secret = Secret::from("oauth:hunter2");

    assert!(!format!("{:?}", secret).contains("hunter2"));
  }
}
