use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApifyError>;

/// Failure modes of the actor platform, split so callers can tell a
/// dead network from a rejected request, a run the actor itself gave up
/// on, or a run that simply outlived our patience.
#[derive(Debug, Error)]
pub enum ApifyError {
    #[error("network error: {0}")]
    Network(String),

    #[error("api rejected request (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Parse(String),

    /// The actor reported a terminal non-success status
    /// (FAILED / ABORTED / TIMED-OUT on the platform side).
    #[error("actor run ended as {0}")]
    RunFailed(String),

    /// We stopped polling. The run may still be going on the platform;
    /// distinct from `RunFailed` so callers can choose to retry or to
    /// pick the dataset up later.
    #[error("gave up waiting for run {run_id} after {waited_secs}s")]
    WaitExpired { run_id: String, waited_secs: u64 },
}

impl From<reqwest::Error> for ApifyError {
    fn from(err: reqwest::Error) -> Self {
        ApifyError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ApifyError {
    fn from(err: serde_json::Error) -> Self {
        ApifyError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_expiry_is_not_reported_as_a_run_failure() {
        let expired = ApifyError::WaitExpired {
            run_id: "run-123".into(),
            waited_secs: 300,
        };
        let failed = ApifyError::RunFailed("ABORTED".into());
        assert_eq!(
            expired.to_string(),
            "gave up waiting for run run-123 after 300s"
        );
        assert_eq!(failed.to_string(), "actor run ended as ABORTED");
        assert!(!matches!(expired, ApifyError::RunFailed(_)));
    }
}
