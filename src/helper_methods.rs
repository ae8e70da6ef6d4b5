use crate::errors::AppError;
use reqwest::{RequestBuilder, Response};
use std::time::Duration;

/// Sends a GET request, retrying up to `retry_count` times when it fails to send
/// or the server answers with a 5xx.
///
/// Every failed attempt waits for `wait_time` before the next one.
///
/// # Errors
/// - Failed to get a response after the desired amount of attempts.
/// - Could not clone the request.
pub async fn get_with_retry(
  request: RequestBuilder,
  retry_count: usize,
  wait_time: Duration,
) -> Result<Response, AppError> {
  let request_string = format!("{:?}", request);

  for iteration in 1..=retry_count {
    let Some(request) = request.try_clone() else {
      return Err(AppError::RequestCouldNotBeCloned(request_string));
    };

    match request.send().await {
      Ok(response) if !response.status().is_server_error() => return Ok(response),
      Ok(response) => tracing::warn!(
        "Got {} from {:?}. {} more attempts left",
        response.status(),
        request_string,
        retry_count - iteration
      ),
      Err(error) => tracing::warn!(
        "Failed to get a response from {:?}: {}. {} more attempts left",
        request_string,
        error,
        retry_count - iteration
      ),
    }

    if iteration < retry_count {
      tokio::time::sleep(wait_time).await;
    }
  }

  Err(AppError::RanOutOfGetRequestAttempts {
    request: request_string,
    attempts: retry_count,
  })
}
