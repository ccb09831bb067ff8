//! Mapping HTTP and transport failures to [`ModelError`].

use std::time::Duration;

use parley_types::ModelError;

use crate::types::ApiErrorBody;

/// Map a non-success HTTP status from the API to a [`ModelError`].
///
/// `retry_after` is the parsed `Retry-After` header, if any; a hint in
/// the body is used when the header is absent.
pub(crate) fn map_http_status(
    status: reqwest::StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> ModelError {
    let detail = error_message(body);
    match status.as_u16() {
        401 | 403 => ModelError::Authentication(detail),
        400 | 422 => ModelError::InvalidRequest(detail),
        404 => ModelError::ModelNotFound(detail),
        408 => ModelError::Timeout(retry_after.unwrap_or(Duration::from_secs(30))),
        429 => ModelError::RateLimit {
            retry_after: retry_after.or_else(|| parse_retry_after(&detail)),
        },
        500 | 502 | 503 | 504 => ModelError::ServiceUnavailable(detail),
        _ => ModelError::InvalidRequest(format!("HTTP {status}: {detail}")),
    }
}

/// The API's error message when the body is an error envelope, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string())
}

/// Best-effort parse of "retry after N seconds" in an error message.
fn parse_retry_after(message: &str) -> Option<Duration> {
    let lower = message.to_lowercase();
    let idx = lower.find("retry after ")?;
    let digits: String = lower[idx + "retry after ".len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok().map(Duration::from_secs)
}

/// Parse a `Retry-After` header given in whole seconds.
pub(crate) fn retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}

/// Map a [`reqwest::Error`] to a [`ModelError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ModelError {
    if err.is_timeout() {
        ModelError::Timeout(Duration::from_secs(30))
    } else {
        ModelError::Network(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn auth_failures() {
        assert!(matches!(
            map_http_status(StatusCode::UNAUTHORIZED, None, "Invalid API key"),
            ModelError::Authentication(_)
        ));
        assert!(matches!(
            map_http_status(StatusCode::FORBIDDEN, None, "nope"),
            ModelError::Authentication(_)
        ));
    }

    #[test]
    fn envelope_message_is_extracted() {
        let body = r#"{"error":{"message":"The model `gpt-9` does not exist","type":"invalid_request_error"}}"#;
        match map_http_status(StatusCode::NOT_FOUND, None, body) {
            ModelError::ModelNotFound(msg) => assert_eq!(msg, "The model `gpt-9` does not exist"),
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[test]
    fn rate_limit_prefers_header() {
        let err = map_http_status(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(7)),
            "Please retry after 60 seconds",
        );
        assert!(matches!(
            err,
            ModelError::RateLimit { retry_after: Some(d) } if d == Duration::from_secs(7)
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn rate_limit_falls_back_to_body_hint() {
        let err = map_http_status(
            StatusCode::TOO_MANY_REQUESTS,
            None,
            "Rate limit reached. Please retry after 20 seconds.",
        );
        assert!(matches!(
            err,
            ModelError::RateLimit { retry_after: Some(d) } if d == Duration::from_secs(20)
        ));
    }

    #[test]
    fn server_errors_are_retryable() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ] {
            let err = map_http_status(status, None, "down");
            assert!(matches!(err, ModelError::ServiceUnavailable(_)));
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn unknown_status_is_terminal() {
        let err = map_http_status(StatusCode::IM_A_TEAPOT, None, "teapot");
        assert!(matches!(err, ModelError::InvalidRequest(ref m) if m.contains("418")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn retry_after_header_parses_seconds() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "12".parse().unwrap());
        assert_eq!(retry_after_header(&headers), Some(Duration::from_secs(12)));
        assert_eq!(retry_after_header(&reqwest::header::HeaderMap::new()), None);
    }
}
