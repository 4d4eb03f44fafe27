use reqwest::header::HeaderMap;

use crate::error::GithubApiError;

pub(crate) const RETRY_ATTEMPT_HEADER: &str = "x-warden-retry-attempt";
const ERROR_BODY_MAX_CHARS: usize = 800;

/// `Retry-After` in whole seconds, as GitHub sends it on secondary rate limits.
pub(crate) fn parse_retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    let seconds = raw.trim().parse::<u64>().ok()?;
    Some(seconds.saturating_mul(1_000))
}

pub(crate) fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Drops the query string so signed URLs never reach logs.
pub(crate) fn redact_url_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

pub(crate) async fn status_error(
    operation: &str,
    response: reqwest::Response,
) -> GithubApiError {
    let status = response.status().as_u16();
    let retry_after_ms = parse_retry_after_ms(response.headers());
    let body = response.text().await.unwrap_or_default();
    GithubApiError::Status {
        operation: operation.to_string(),
        status,
        body: truncate_for_error(&body, ERROR_BODY_MAX_CHARS),
        retry_after_ms,
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    use super::{parse_retry_after_ms, redact_url_query, truncate_for_error};

    #[test]
    fn unit_parse_retry_after_parses_seconds_and_rejects_invalid_values() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("4"));
        assert_eq!(parse_retry_after_ms(&headers), Some(4_000));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("bad-value"));
        assert_eq!(parse_retry_after_ms(&headers), None);
    }

    #[test]
    fn unit_truncate_for_error_appends_ellipsis() {
        assert_eq!(truncate_for_error("abcdef", 3), "abc...");
        assert_eq!(truncate_for_error("abc", 3), "abc");
    }

    #[test]
    fn regression_redact_url_query_hides_signed_parameters() {
        assert_eq!(
            redact_url_query("https://private-user-images.githubusercontent.com/1/a.png?jwt=secret"),
            "https://private-user-images.githubusercontent.com/1/a.png"
        );
        assert_eq!(redact_url_query("https://x/y"), "https://x/y");
    }
}
