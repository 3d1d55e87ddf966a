/// Precis error types
///
/// Every variant carries only owned strings so the error can be cloned and
/// handed to every caller waiting on the same in-flight summary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrecisError {
    /// Missing or empty input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Completion provider reports exhausted quota or credits
    #[error("Upstream quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other completion failure (status, network, timeout, malformed body)
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrecisError {
    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create quota exceeded error
    pub fn quota_exceeded<S: Into<String>>(msg: S) -> Self {
        Self::QuotaExceeded(msg.into())
    }

    /// Create upstream error
    pub fn upstream<S: Into<String>>(msg: S) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<anyhow::Error> for PrecisError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for PrecisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for PrecisError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("IO error: {}", err))
    }
}

// HTTP response mapping (used by the actix-web layer)
impl PrecisError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Serialization(_) => 400,
            Self::QuotaExceeded(_) => 402,
            Self::Upstream(_) => 502,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Caller-visible error class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) | Self::Serialization(_) => "BadRequest",
            Self::QuotaExceeded(_) => "UpstreamQuotaExceeded",
            Self::Upstream(_) => "UpstreamFailure",
            Self::Config(_) => "ConfigError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Human-readable remediation hint, when there is one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::QuotaExceeded(_) => Some(
                "The completion provider reports insufficient quota or credits. \
                 Check the account's plan and billing details, then retry.",
            ),
            Self::Upstream(_) => Some("The completion provider failed or timed out. Retrying later may help."),
            Self::InvalidInput(_) => Some("Send a JSON body with a non-empty \"text\" field."),
            _ => None,
        }
    }

    /// Whether this failure came from the completion provider
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_) | Self::Upstream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PrecisError::invalid_input("empty").status_code(), 400);
        assert_eq!(PrecisError::quota_exceeded("no credits").status_code(), 402);
        assert_eq!(PrecisError::upstream("timeout").status_code(), 502);
        assert_eq!(PrecisError::config("bad").status_code(), 500);
    }

    #[test]
    fn test_kinds_are_distinct_for_upstream_errors() {
        let quota = PrecisError::quota_exceeded("insufficient_quota");
        let other = PrecisError::upstream("500 Internal Server Error");
        assert_eq!(quota.kind(), "UpstreamQuotaExceeded");
        assert_eq!(other.kind(), "UpstreamFailure");
        assert!(quota.hint().unwrap().contains("quota"));
        assert!(quota.is_upstream() && other.is_upstream());
        assert!(!PrecisError::invalid_input("x").is_upstream());
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: PrecisError = anyhow::anyhow!("Failed to create HTTP client").into();
        assert!(matches!(err, PrecisError::Internal(ref m) if m.contains("HTTP client")));
    }

    #[test]
    fn test_clone_preserves_message() {
        let err = PrecisError::upstream("connection reset");
        assert_eq!(err.clone().to_string(), "Upstream failure: connection reset");
    }
}
