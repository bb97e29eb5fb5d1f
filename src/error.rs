//! Error types for Tab Trail

use crate::tab_data::TabId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrailError {
    #[error("Child tab limit reached ({limit} children under tab {parent_id})")]
    AdmissionDenied { parent_id: TabId, limit: usize },

    #[error("No opener tab for this request")]
    NoOpener,

    #[error("Unsupported URL: {0}")]
    InvalidUrl(String),

    #[error("Host operation failed: {0}")]
    Host(String),

    #[error("Storage failed: {0}")]
    Storage(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TrailError {
    pub fn is_admission_denied(&self) -> bool {
        matches!(self, TrailError::AdmissionDenied { .. })
    }
}

pub type Result<T> = std::result::Result<T, TrailError>;
