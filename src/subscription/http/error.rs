use thiserror::Error;

/// Failure of a query, prefetch or mutation.
///
/// Cloneable so one failed request can be shared by every observer that
/// awaited it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The server answered with a non-success status.
    #[error("Unexpected status: {0}")]
    UnexpectedStatus(u16),

    /// The response body could not be decoded.
    #[error("Fetch failed: {0}")]
    FetchError(String),

    /// A key was read back with a different value type than it was stored with.
    #[error("Cached data for `{0}` has an unexpected type")]
    TypeMismatch(String),

    /// A failure that carries no usable message.
    #[error("Unrecognized error")]
    Unrecognized,
}

/// Invalid cache policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cache time ({cache_time:?}) must not be shorter than stale time ({stale_time:?})")]
    CacheTimeBelowStaleTime {
        stale_time: std::time::Duration,
        cache_time: std::time::Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            QueryError::NetworkError("refused".into()).to_string(),
            "Network error: refused"
        );
        assert_eq!(
            QueryError::UnexpectedStatus(404).to_string(),
            "Unexpected status: 404"
        );
        assert_eq!(
            QueryError::FetchError("eof".into()).to_string(),
            "Fetch failed: eof"
        );
        assert_eq!(
            QueryError::TypeMismatch("posts/1".into()).to_string(),
            "Cached data for `posts/1` has an unexpected type"
        );
    }
}
