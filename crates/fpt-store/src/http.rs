//! Shared HTTP response helpers for the REST store.
//!
//! Centralizes status-code checks (429 rate limiting with `Retry-After`
//! parsing, non-success → [`StoreError::Api`]) so request builders stay
//! focused on URLs and headers.

use crate::error::StoreError;

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **429 Too Many Requests** → [`StoreError::RateLimited`] with
///   `Retry-After` header parsing (falls back to 60 s if absent or
///   unparseable).
/// - **Non-success status** → [`StoreError::Api`] with status code and the
///   PostgREST `message` field, or the raw body when it is not JSON.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if resp.status() == 429 {
        let retry_after = parse_retry_after(&resp);
        return Err(StoreError::RateLimited {
            retry_after_secs: retry_after,
        });
    }
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(StoreError::Api {
            status,
            message: error_message(&body),
        });
    }
    Ok(resp)
}

/// Parse the `Retry-After` header as seconds, falling back to 60 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}

/// Pull `message` out of a PostgREST error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

/// Total row count from a `Content-Range` header (`0-24/3573` or `*/3573`).
pub fn parse_content_range(resp: &reqwest::Response) -> Result<u64, StoreError> {
    let header = resp
        .headers()
        .get(reqwest::header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| StoreError::Parse("missing Content-Range header".to_string()))?;
    header
        .rsplit_once('/')
        .and_then(|(_, total)| total.parse::<u64>().ok())
        .ok_or_else(|| StoreError::Parse(format!("unparseable Content-Range '{header}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_response(status: u16, body: &'static str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .body(body)
                .unwrap(),
        )
    }

    fn mock_response_with_header(status: u16, name: &str, value: &str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .header(name, value)
                .body("")
                .unwrap(),
        )
    }

    #[test]
    fn parse_retry_after_from_header() {
        let resp = mock_response_with_header(429, "Retry-After", "120");
        assert_eq!(parse_retry_after(&resp), 120);
    }

    #[test]
    fn parse_retry_after_missing_header() {
        let resp = mock_response(429, "");
        assert_eq!(parse_retry_after(&resp), 60);
    }

    #[tokio::test]
    async fn check_response_rate_limited() {
        let resp = mock_response_with_header(429, "Retry-After", "30");
        let err = check_response(resp).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::RateLimited {
                retry_after_secs: 30
            }
        ));
    }

    #[tokio::test]
    async fn check_response_extracts_postgrest_message() {
        let resp = mock_response(
            404,
            r#"{"code":"42P01","message":"relation \"public.ghosts\" does not exist"}"#,
        );
        let err = check_response(resp).await.unwrap_err();
        match err {
            StoreError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "relation \"public.ghosts\" does not exist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn check_response_keeps_plain_body() {
        let resp = mock_response(502, "bad gateway");
        let err = check_response(resp).await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 502, ref message } if message == "bad gateway"));
    }

    #[tokio::test]
    async fn check_response_success() {
        let resp = mock_response(200, "[]");
        assert!(check_response(resp).await.is_ok());
    }

    #[test]
    fn content_range_total() {
        let resp = mock_response_with_header(200, "Content-Range", "0-24/3573");
        assert_eq!(parse_content_range(&resp).unwrap(), 3573);

        let resp = mock_response_with_header(206, "Content-Range", "*/0");
        assert_eq!(parse_content_range(&resp).unwrap(), 0);
    }

    #[test]
    fn content_range_unknown_total_is_an_error() {
        let resp = mock_response_with_header(200, "Content-Range", "0-24/*");
        assert!(parse_content_range(&resp).is_err());
    }
}
