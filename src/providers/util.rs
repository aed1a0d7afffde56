use anyhow::{Context, Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = concat!("fundsight/", env!("CARGO_PKG_VERSION"));

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
pub async fn with_retry<F, Fut, T>(mut operation: F, retries: usize, delay_ms: u64) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err.into());
                }
                debug!("Attempt {}/{} failed: {}. Retrying...", attempt, retries, err);
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// GETs `url` and returns the body. Transport errors and server errors are
/// retried; client errors fail immediately.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    debug!("Requesting {}", url);
    let response = with_retry(
        || async {
            let response = client.get(url).send().await?;
            if response.status().is_server_error() {
                return response.error_for_status();
            }
            Ok(response)
        },
        3,
        500,
    )
    .await
    .with_context(|| format!("Request failed: {url}"))?;

    let response = response
        .error_for_status()
        .with_context(|| format!("Unexpected response status from {url}"))?;

    response
        .text()
        .await
        .with_context(|| format!("Failed to read response body from {url}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_text_retries_server_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let body = get_text(&client, &format!("{}/flaky", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_get_text_fails_on_client_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = get_text(&client, &format!("{}/missing", mock_server.uri())).await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .starts_with("Unexpected response status")
        );
    }
}
