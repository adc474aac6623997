//! Error types for the tracking engine.
//!
//! Only contract violations and persistence failures are errors. Weak signal
//! and jitter are ordinary ingestion outcomes (see [`crate::IngestOutcome`]).

use thiserror::Error;

/// Errors produced by the tracking engine and its persistence layer.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A coordinate was non-finite or outside [-90, 90] / [-180, 180].
    #[error("invalid coordinate: lat={latitude}, lng={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// `start()` was refused because an activity is still being tracked.
    #[error("activity {activity_id} is still in progress; stop or discard it first")]
    ActivityInProgress { activity_id: String },

    /// Goal values must be finite and positive.
    #[error("invalid goal: {0}")]
    InvalidGoal(String),

    /// The key-value backend could not read or write.
    #[error("storage error for key '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The persisted document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An unreadable document under `key` could not be moved aside, so writes
    /// are held back to leave it untouched.
    #[error("unreadable document under '{key}' is protected; writes are held back")]
    ProtectedDocument { key: String },
}

impl TrackerError {
    /// True for failures of the persistence layer (retryable via `flush`).
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Serialization(_) | Self::ProtectedDocument { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackerError::InvalidCoordinate { latitude: 91.0, longitude: 0.0 };
        assert!(err.to_string().contains("lat=91"));

        let err = TrackerError::ActivityInProgress { activity_id: "abc".to_string() };
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_is_persistence() {
        let io = std::io::Error::other("disk full");
        let err = TrackerError::Storage { key: "k".to_string(), source: io };
        assert!(err.is_persistence());
        assert!(TrackerError::ProtectedDocument { key: "k".to_string() }.is_persistence());
        assert!(!TrackerError::InvalidGoal("x".to_string()).is_persistence());
    }
}
