use std::time::Duration;

use thiserror::Error;

/// Errors scoped to one playback session
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Pose detector failed to initialize: {0}")]
    DetectorSetup(String),

    #[error("Could not read video metadata after {attempts} attempts")]
    MetadataTimeout { attempts: u32 },

    #[error("Video playback failed: {0}")]
    Playback(String),

    #[error("Please select a lift type before uploading")]
    LiftNotSelected,

    #[error("No video source assigned")]
    NoSource,

    #[error("Unknown lift type: {0}")]
    UnknownLift(String),

    #[error("Unknown joint name: {0}")]
    UnknownJoint(String),

    #[error("Video source error: {0}")]
    Source(String),

    #[error("Playback session was cancelled")]
    Cancelled,
}

/// Failures of the outbound analysis request
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Analysis already requested for this session")]
    AlreadyFired,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Analysis endpoint not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid analysis response: {0}")]
    InvalidResponse(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AnalysisError {
    /// Message shown to the user in place of feedback
    pub const USER_MESSAGE: &'static str = "Analysis unavailable";

    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        let msg = if message.is_empty() {
            status.canonical_reason().unwrap_or("Unknown error").to_string()
        } else {
            message
        };

        match status {
            reqwest::StatusCode::NOT_FOUND => AnalysisError::NotFound(msg),
            reqwest::StatusCode::BAD_REQUEST => AnalysisError::BadRequest(msg),
            reqwest::StatusCode::PAYLOAD_TOO_LARGE => AnalysisError::BadRequest(msg),
            status if status.is_server_error() => AnalysisError::ServerError(msg),
            status if status.is_client_error() => AnalysisError::BadRequest(msg),
            _ => AnalysisError::Unknown(msg),
        }
    }

    pub fn user_message(&self) -> &'static str {
        Self::USER_MESSAGE
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AnalysisError::InvalidResponse(err.to_string())
        } else {
            AnalysisError::NetworkError(err.to_string())
        }
    }
}
