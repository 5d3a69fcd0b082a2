use std::fmt;

/// Severity used when a `ConnectorError` is logged by a caller; mirrors the
/// `tracing` level names so call sites can do `tracing::event!(err.log_level().into(), ...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Warn,
    Error,
}

/// Everything that can go wrong while running the connector's workflow.
///
/// Variants that wrap a lower-level failure carry it as `#[source]` so the
/// causal chain survives; [`ConnectorError::flatten_causes`] walks that chain
/// into the single-line message the registry's `message` field stores.
#[derive(thiserror::Error, Debug)]
pub enum ConnectorError {
    #[error("registry entry not found: {0}")]
    NotFound(String),

    #[error("failed to persist registry entry {registry_id}: {reason}")]
    PersistFailure {
        registry_id: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("precondition failed for {operation} on {registry_id}: {reason}")]
    PreconditionFailed {
        registry_id: String,
        operation: &'static str,
        reason: String,
    },

    #[error("transient remote failure: {0}")]
    TransientRemote(String),

    #[error("permanent remote failure: {0}")]
    PermanentRemote(String),

    #[error("cleanup failed for {registry_id}: {reason}")]
    CleanupFailure {
        registry_id: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("asset record malformed: {0}")]
    AssetMalformed(String),

    #[error("thumbnail unavailable for image {0}")]
    ThumbnailUnavailable(String),

    #[error("no platform adapter registered for {platform:?}/{operation}")]
    UnknownDestination {
        platform: crate::models::TargetPlatform,
        operation: &'static str,
    },

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("remote video missing: {0}")]
    RemoteMissing(String),

    #[error("run cancelled")]
    Cancelled,
}

impl ConnectorError {
    pub fn persist_failure(
        registry_id: impl Into<String>,
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::PersistFailure {
            registry_id: registry_id.into(),
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn precondition(
        registry_id: impl Into<String>,
        operation: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::PreconditionFailed {
            registry_id: registry_id.into(),
            operation,
            reason: reason.into(),
        }
    }

    /// True when a caller retrying the same state-machine run (not the same
    /// HTTP request) has a reasonable chance of succeeding. Adapters use this
    /// to decide whether to retry internally before surfacing the error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientRemote(_))
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::NotFound(_) | Self::AssetNotFound(_) | Self::ThumbnailUnavailable(_) => {
                LogLevel::Warn
            }
            _ => LogLevel::Error,
        }
    }

    /// Flattens this error's `source()` chain into a single `" | "`-joined
    /// string, capped at depth 5 to avoid unbounded messages from cyclical
    /// or pathologically deep wrapping.
    pub fn flatten_causes(&self) -> String {
        let mut parts = vec![self.to_string()];
        let mut current: Option<&(dyn std::error::Error + 'static)> =
            std::error::Error::source(self);
        let mut depth = 0;
        while let Some(err) = current {
            if depth >= 5 {
                parts.push("... (truncated)".to_string());
                break;
            }
            parts.push(err.to_string());
            current = err.source();
            depth += 1;
        }
        parts.join(" | ")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_causes_joins_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = ConnectorError::persist_failure("reg-1", "upsert failed", io_err);
        let flattened = err.flatten_causes();
        assert!(flattened.contains("upsert failed"));
        assert!(flattened.contains("disk full"));
        assert!(flattened.contains(" | "));
    }

    #[test]
    fn not_found_is_warn_level() {
        assert_eq!(
            ConnectorError::NotFound("x".into()).log_level(),
            LogLevel::Warn
        );
    }

    #[test]
    fn precondition_failed_is_not_retryable() {
        let err = ConnectorError::precondition("reg-1", "upload", "already uploaded");
        assert!(!err.is_retryable());
    }

    #[test]
    fn transient_remote_is_retryable() {
        assert!(ConnectorError::TransientRemote("timeout".into()).is_retryable());
    }
}
