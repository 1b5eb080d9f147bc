use thiserror::Error;

/// Errors from the rewrite-service messages API.
#[derive(Error, Debug)]
pub enum RewriteApiError {
    /// Malformed request parameters (HTTP 400)
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Missing or rejected API key (HTTP 401/403)
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("rate limit exceeded")]
    RateLimited,

    /// Server-side failure, including overload (HTTP 5xx)
    #[error("server error {0}: {1}")]
    Server(u16, String),

    /// Request timed out waiting for a response
    #[error("timeout waiting for response")]
    Timeout,

    /// Transport-level failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RewriteApiError {
    /// Whether retrying makes sense: rate limits, server errors and
    /// timeouts are transient; everything else fails fast.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Server(..) | Self::Timeout)
    }

    /// Map an HTTP status plus response body to an error variant.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(body),
            401 | 403 => Self::Auth(body),
            429 => Self::RateLimited,
            code if (500..=599).contains(&code) => Self::Server(code, body),
            code => Self::Malformed(format!("unexpected HTTP {code}: {body}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn transient_classification() {
        assert!(RewriteApiError::RateLimited.is_transient());
        assert!(RewriteApiError::Server(500, String::new()).is_transient());
        assert!(RewriteApiError::Server(529, String::new()).is_transient());
        assert!(RewriteApiError::Timeout.is_transient());

        assert!(!RewriteApiError::BadRequest("bad".into()).is_transient());
        assert!(!RewriteApiError::Auth("denied".into()).is_transient());
        assert!(!RewriteApiError::Malformed("?".into()).is_transient());
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            RewriteApiError::from_status(StatusCode::BAD_REQUEST, String::new()),
            RewriteApiError::BadRequest(_)
        ));
        assert!(matches!(
            RewriteApiError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            RewriteApiError::Auth(_)
        ));
        assert!(matches!(
            RewriteApiError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            RewriteApiError::RateLimited
        ));
        assert!(matches!(
            RewriteApiError::from_status(StatusCode::from_u16(529).unwrap(), String::new()),
            RewriteApiError::Server(529, _)
        ));
        assert!(matches!(
            RewriteApiError::from_status(StatusCode::IM_A_TEAPOT, String::new()),
            RewriteApiError::Malformed(_)
        ));
    }
}
