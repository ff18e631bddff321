//! Error types for the volume tagger
//!
//! Provides structured error types for every stage of claim processing:
//! watching claims, resolving volumes, parsing tag annotations and talking
//! to the EC2 tagging API.

use thiserror::Error;

/// Unified error type for the tagger
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Kubeconfig error: {0}")]
    KubeConfig(String),

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Failed to resolve PersistentVolume {name}: {source}")]
    ResolveVolume {
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("PersistentVolume {volume} is not backed by an EBS volume")]
    UnsupportedVolumeSource { volume: String },

    #[error("Watch error event: {code} {reason}: {message}")]
    WatchEvent {
        code: u16,
        reason: String,
        message: String,
    },

    // =========================================================================
    // Cloud Provider Errors
    // =========================================================================
    #[error("EC2 {operation} failed for {volume_id}: {reason}")]
    CloudApi {
        operation: String,
        volume_id: String,
        reason: String,
    },

    #[error("EBS volume not found: {volume_id} in {region}")]
    VolumeNotFound { volume_id: String, region: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Invalid volume identifier {input:?}: {reason}")]
    InvalidVolumeId { input: String, reason: String },

    #[error("Malformed tag {token:?}: expected key=value")]
    MalformedTag { token: String },

    // =========================================================================
    // Telemetry Errors
    // =========================================================================
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// What the controller does with an error raised while processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Stop the process; the watch or its clients are unusable
    Terminate,
    /// Abandon the current claim and wait for the next event
    SkipEvent,
    /// Abandon the current tag and continue with the rest of the batch
    SkipTag,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Startup and transport failures
            Error::Internal(_)
            | Error::Configuration(_)
            | Error::Kube(_)
            | Error::KubeConfig(_)
            | Error::Metrics(_) => ErrorAction::Terminate,

            // The watch can no longer resume from its version
            Error::WatchEvent { code: 410, .. } => ErrorAction::Terminate,

            // Only this token is unusable
            Error::MalformedTag { .. } => ErrorAction::SkipTag,

            // Claim-level failures
            Error::ResourceNotFound { .. }
            | Error::ResolveVolume { .. }
            | Error::UnsupportedVolumeSource { .. }
            | Error::WatchEvent { .. }
            | Error::CloudApi { .. }
            | Error::VolumeNotFound { .. }
            | Error::InvalidVolumeId { .. } => ErrorAction::SkipEvent,
        }
    }

    /// Check if the process must stop on this error
    pub fn is_fatal(&self) -> bool {
        matches!(self.action(), ErrorAction::Terminate)
    }

    /// Build a cloud API error from an SDK failure
    pub fn cloud(
        operation: impl Into<String>,
        volume_id: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Error::CloudApi {
            operation: operation.into(),
            volume_id: volume_id.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for the tagger
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_actions() {
        let err = Error::MalformedTag {
            token: "env".into(),
        };
        assert_eq!(err.action(), ErrorAction::SkipTag);

        let err = Error::ResourceNotFound {
            kind: "PersistentVolume".into(),
            name: "pv-1".into(),
        };
        assert_eq!(err.action(), ErrorAction::SkipEvent);

        let err = Error::Configuration("bad config".into());
        assert_eq!(err.action(), ErrorAction::Terminate);
    }

    #[test]
    fn test_error_fatal() {
        let err = Error::cloud("DescribeVolumes", "vol-1", "throttled");
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "EC2 DescribeVolumes failed for vol-1: throttled"
        );

        let err = Error::KubeConfig("missing cluster".into());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_watch_event_actions() {
        let err = Error::WatchEvent {
            code: 410,
            reason: "Expired".into(),
            message: "too old resource version".into(),
        };
        assert!(err.is_fatal());

        let err = Error::WatchEvent {
            code: 500,
            reason: "InternalError".into(),
            message: "etcd leader changed".into(),
        };
        assert_eq!(err.action(), ErrorAction::SkipEvent);
    }

    #[test]
    fn test_resolve_failure_skips_claim() {
        let err = Error::ResolveVolume {
            name: "pvc-1".into(),
            source: kube::Error::Api(kube::error::ErrorResponse {
                status: "Failure".into(),
                message: "forbidden".into(),
                reason: "Forbidden".into(),
                code: 403,
            }),
        };
        assert_eq!(err.action(), ErrorAction::SkipEvent);
        assert!(err.to_string().starts_with("Failed to resolve PersistentVolume pvc-1"));
    }
}
