//! Provider error types.

use drillkit_core::error::GenerationError;
use thiserror::Error;

const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Errors that can occur when talking to a question generator over HTTP.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The API returned 402: the account is out of credit.
    #[error("payment required: {0}")]
    PaymentRequired(String),

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl From<ProviderError> for GenerationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { retry_after_ms } => {
                GenerationError::RateLimited { retry_after_ms }
            }
            ProviderError::PaymentRequired(_) => GenerationError::PaymentRequired,
            other => GenerationError::Unavailable(other.to_string()),
        }
    }
}

/// Map a transport failure.
pub(crate) fn send_error(err: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else {
        ProviderError::NetworkError(err.to_string())
    }
}

/// Turn a non-success HTTP status into the matching error.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }
    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(ProviderError::RateLimited {
            retry_after_ms: retry_after_secs * 1000,
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        401 | 403 => ProviderError::AuthenticationFailed(body),
        402 => ProviderError::PaymentRequired(body),
        404 => ProviderError::ModelNotFound(body),
        _ => ProviderError::ApiError {
            status,
            message: body,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_map_to_generation_errors() {
        assert_eq!(
            GenerationError::from(ProviderError::RateLimited {
                retry_after_ms: 2000
            }),
            GenerationError::RateLimited {
                retry_after_ms: 2000
            }
        );
        assert_eq!(
            GenerationError::from(ProviderError::PaymentRequired("no credit".into())),
            GenerationError::PaymentRequired
        );
        assert!(matches!(
            GenerationError::from(ProviderError::Timeout(60)),
            GenerationError::Unavailable(msg) if msg.contains("60s")
        ));
    }
}
