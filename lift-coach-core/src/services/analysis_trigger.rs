use std::time::Duration;

use tokio::time::timeout;

use crate::error::AnalysisError;
use crate::models::analysis::{AnalysisRequest, Feedback};
use crate::services::analysis_client::AnalysisService;

/// One-shot guard around the analysis request of a session
///
/// The flag is set before the request is sent and stays set whatever the
/// outcome, so a session issues at most one request.
#[derive(Debug, Clone, Default)]
pub struct AnalysisTrigger {
    fired: bool,
}

impl AnalysisTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Check-and-set; true only for the first caller
    pub fn try_fire(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        true
    }

    pub fn reset(&mut self) {
        self.fired = false;
    }

    /// Send the request once and sanitize the returned feedback
    pub async fn fire<A: AnalysisService>(
        &mut self,
        service: &A,
        request: &AnalysisRequest,
        limit: Duration,
    ) -> Result<Feedback, AnalysisError> {
        if !self.try_fire() {
            return Err(AnalysisError::AlreadyFired);
        }

        let ignored = request.frames_beyond_service_cap();
        tracing::info!(
            "Requesting {} analysis with {} sampled frames",
            request.lift_type,
            request.keypoint_frames.len()
        );
        if ignored > 0 {
            tracing::debug!("Service reads only the leading frames; {} will be ignored", ignored);
        }

        match timeout(limit, service.analyze(request)).await {
            Ok(Ok(response)) => Ok(Feedback::from_html(&response.feedback)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AnalysisError::Timeout(limit)),
        }
    }
}
