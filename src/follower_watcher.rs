use crate::errors::AppError;
use crate::helper_methods::get_with_retry;
use crate::irc_chat::ChatUser;
use app_config::{secret_string::Secret, AppConfig};
use chrono::{DateTime, Utc};
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

const HELIX_API_URL: &str = "https://api.twitch.tv";
const HELIX_USERS_PATH: &str = "helix/users";
const HELIX_FOLLOWERS_PATH: &str = "helix/channels/followers";
const FOLLOWER_PAGE_SIZE: usize = 10;
const REQUEST_RETRY_COUNT: usize = 3;
const REQUEST_RETRY_WAIT: Duration = Duration::from_secs(5);
const MINIMUM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Followers that weren't seen by any earlier poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFollowers(pub Vec<ChatUser>);

#[derive(Debug, Deserialize)]
struct FollowerPage {
  data: Vec<HelixFollower>,
}

#[derive(Debug, Deserialize)]
struct HelixFollower {
  user_login: String,
  followed_at: Option<String>,
}

pub struct HelixClient {
  base_url: Url,
  access_token: Secret,
  client_id: Secret,
  reqwest_client: reqwest::Client,
}

impl HelixClient {
  pub fn new(base_url: Url, access_token: Secret, client_id: Secret) -> Self {
    Self {
      base_url,
      access_token,
      client_id,
      reqwest_client: reqwest::Client::new(),
    }
  }

  /// Returns `None` when no client id or access token is configured.
  pub fn from_config(config: &AppConfig) -> Result<Option<Self>, AppError> {
    let (Some(access_token), Some(client_id)) = (config.access_token(), config.client_id()) else {
      return Ok(None);
    };

    if client_id.is_empty() {
      return Ok(None);
    }

    Ok(Some(Self::new(
      Url::parse(HELIX_API_URL)?,
      access_token.clone(),
      client_id.clone(),
    )))
  }

  fn get(&self, url: Url) -> RequestBuilder {
    self
      .reqwest_client
      .get(url)
      .header(
        "Authorization",
        format!("Bearer {}", self.access_token.bearer_token()),
      )
      .header(
        "Client-Id",
        Secret::read_secret_string(self.client_id.read_value()),
      )
  }

  pub async fn broadcaster_id(&self, channel_login: &str) -> Result<String, AppError> {
    let mut query_url = self.base_url.join(HELIX_USERS_PATH)?;
    query_url
      .query_pairs_mut()
      .append_pair("login", channel_login);

    let response = get_with_retry(self.get(query_url), REQUEST_RETRY_COUNT, REQUEST_RETRY_WAIT).await?;

    if !response.status().is_success() {
      return Err(AppError::FailedResponse {
        location: "query broadcaster id",
        code: response.status().as_u16(),
      });
    }

    parse_broadcaster_id(&response.text().await?, channel_login)
  }

  /// The most recent followers, newest first.
  pub async fn recent_followers(
    &self,
    broadcaster_id: &str,
    count: usize,
  ) -> Result<Vec<ChatUser>, AppError> {
    let mut query_url = self.base_url.join(HELIX_FOLLOWERS_PATH)?;
    query_url
      .query_pairs_mut()
      .append_pair("broadcaster_id", broadcaster_id)
      .append_pair("first", &count.to_string());

    let response = get_with_retry(self.get(query_url), REQUEST_RETRY_COUNT, REQUEST_RETRY_WAIT).await?;

    if !response.status().is_success() {
      return Err(AppError::FailedResponse {
        location: "query channel followers",
        code: response.status().as_u16(),
      });
    }

    parse_followers(&response.text().await?)
  }
}

fn parse_broadcaster_id(response_body: &str, channel_login: &str) -> Result<String, AppError> {
  let Value::Object(response_value) = serde_json::from_str::<Value>(response_body)? else {
    return Err(AppError::UnknownResponseBody("query broadcaster id"));
  };
  let Some(Value::Array(user_list)) = response_value.get("data") else {
    return Err(AppError::UnknownResponseBody("query broadcaster id user list"));
  };
  let Some(Value::Object(user)) = user_list.first() else {
    return Err(AppError::UserDoesNotExist(channel_login.to_string()));
  };
  let Some(Value::String(broadcaster_id)) = user.get("id") else {
    return Err(AppError::UnknownResponseBody("query broadcaster id user"));
  };

  Ok(broadcaster_id.to_owned())
}

fn parse_followers(response_body: &str) -> Result<Vec<ChatUser>, AppError> {
  let follower_page: FollowerPage = serde_json::from_str(response_body)?;

  let followers = follower_page
    .data
    .into_iter()
    .map(|follower| {
      let followed_since = follower
        .followed_at
        .and_then(|followed_at| DateTime::parse_from_rfc3339(&followed_at).ok())
        .map(|followed_at| followed_at.with_timezone(&Utc));

      ChatUser::new_follower(follower.user_login, followed_since)
    })
    .collect();

  Ok(followers)
}

/// Polls Helix for the channel's latest followers and reports the ones it hasn't seen.
pub struct FollowerWatcher {
  helix_client: HelixClient,
  channel_login: String,
  poll_interval: Duration,
  broadcaster_id: Option<String>,
  known_followers: HashSet<ChatUser>,
  seeded: bool,
}

impl FollowerWatcher {
  pub fn new(helix_client: HelixClient, channel_login: &str, poll_interval: Duration) -> Self {
    Self {
      helix_client,
      channel_login: channel_login.to_lowercase(),
      poll_interval: poll_interval.max(MINIMUM_POLL_INTERVAL),
      broadcaster_id: None,
      known_followers: HashSet::new(),
      seeded: false,
    }
  }

  pub async fn run(mut self, follower_sender: mpsc::UnboundedSender<NewFollowers>) {
    tracing::info!(
      "Watching {} for new followers every {:?}.",
      self.channel_login,
      self.poll_interval
    );

    let mut interval = tokio::time::interval(self.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
      interval.tick().await;

      match self.poll().await {
        Ok(Some(new_followers)) => {
          if let Err(error) = follower_sender.send(NewFollowers(new_followers)) {
            tracing::error!(
              "{}. Stopping the follower watcher.",
              AppError::MpscConnectionClosed {
                error: error.to_string()
              }
            );

            return;
          }
        }
        Ok(None) => (),
        Err(error) => tracing::error!("Failed to poll for new followers. Reason: {}", error),
      }
    }
  }

  async fn poll(&mut self) -> Result<Option<Vec<ChatUser>>, AppError> {
    let broadcaster_id = match &self.broadcaster_id {
      Some(broadcaster_id) => broadcaster_id.clone(),
      None => {
        let broadcaster_id = self
          .helix_client
          .broadcaster_id(&self.channel_login)
          .await?;
        self.broadcaster_id = Some(broadcaster_id.clone());

        broadcaster_id
      }
    };

    let followers = self
      .helix_client
      .recent_followers(&broadcaster_id, FOLLOWER_PAGE_SIZE)
      .await?;

    Ok(self.record_followers(followers))
  }

  /// Remembers the followers and returns the ones that are new.
  ///
  /// The first call only seeds the known set.
  fn record_followers(&mut self, followers: Vec<ChatUser>) -> Option<Vec<ChatUser>> {
    let mut new_followers = vec![];

    for follower in followers {
      if !self.known_followers.contains(&follower) {
        self.known_followers.insert(follower.clone());
        new_followers.push(follower);
      }
    }

    if !self.seeded {
      self.seeded = true;
      tracing::debug!("Seeded {} known followers.", self.known_followers.len());

      return None;
    }

    (!new_followers.is_empty()).then_some(new_followers)
  }
}
