use serde::Serialize;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::AnalysisError;
use crate::models::analysis::{AnalysisRequest, Feedback};
use crate::models::keypoint::{Pose, PoseSequence};
use crate::models::video::{DisplayLayout, VideoSourceRef};
use crate::services::analysis_trigger::AnalysisTrigger;
use crate::services::frame_sampler::FrameSampler;
use crate::services::pose_smoother::PoseSmoother;

/// Lifecycle of the inference loop for one source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingMetadata,
    Playing,
    Ended,
}

/// Per-session frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Frames the detector returned a result for
    pub frames_inferred: u64,
    /// Frames dropped after a capture or inference failure
    pub frames_skipped: u64,
    /// Inferred frames with no detected body
    pub frames_without_pose: u64,
    /// Overlay redraws
    pub frames_rendered: u64,
}

/// Transient state bound to one video source
///
/// Owns the sequence buffer, the smoothing history and the one-shot analysis
/// flag. A new session is created whenever the source changes; replay resets
/// it in place under a new generation.
#[derive(Debug)]
pub struct PlaybackSession {
    id: Uuid,
    generation: u64,
    source: VideoSourceRef,
    state: SessionState,
    layout: Option<DisplayLayout>,
    sampler: FrameSampler,
    smoother: Option<PoseSmoother>,
    trigger: AnalysisTrigger,
    feedback: Option<Feedback>,
    analysis_error: Option<String>,
    stats: SessionStats,
}

impl PlaybackSession {
    pub fn new(source: VideoSourceRef, generation: u64, config: &PipelineConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation,
            source,
            state: SessionState::Idle,
            layout: None,
            sampler: FrameSampler::new(config.sampling_interval),
            smoother: config.smoothing().map(PoseSmoother::new),
            trigger: AnalysisTrigger::new(),
            feedback: None,
            analysis_error: None,
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source(&self) -> &VideoSourceRef {
        &self.source
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::info!("Session {} {:?} -> {:?}", self.id, self.state, state);
            self.state = state;
        }
    }

    pub fn layout(&self) -> Option<DisplayLayout> {
        self.layout
    }

    pub(crate) fn set_layout(&mut self, layout: DisplayLayout) {
        self.layout = Some(layout);
    }

    pub fn buffer(&self) -> &PoseSequence {
        self.sampler.buffer()
    }

    pub fn frames_seen(&self) -> u64 {
        self.sampler.frames_seen()
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn analysis_error(&self) -> Option<&str> {
        self.analysis_error.as_deref()
    }

    pub fn analysis_fired(&self) -> bool {
        self.trigger.has_fired()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Smooth the primary body and count the frame toward sampling
    ///
    /// Returns the poses to draw: the smoothed primary body followed by any
    /// other bodies as detected.
    pub(crate) fn accept_detection(&mut self, mut poses: Vec<Pose>) -> Vec<Pose> {
        self.stats.frames_inferred += 1;

        if poses.is_empty() {
            self.stats.frames_without_pose += 1;
            self.sampler.record(None);
            return poses;
        }

        if let Some(smoother) = self.smoother.as_mut() {
            poses[0] = smoother.apply(&poses[0]);
        }
        self.sampler.record(Some(&poses[0]));
        poses
    }

    pub(crate) fn note_skipped(&mut self) {
        self.stats.frames_skipped += 1;
    }

    pub(crate) fn note_rendered(&mut self) {
        self.stats.frames_rendered += 1;
    }

    /// Package the buffer for the analysis service
    pub fn analysis_request(&self) -> AnalysisRequest {
        AnalysisRequest::new(self.sampler.snapshot(), self.source.lift_label())
    }

    pub(crate) fn trigger_mut(&mut self) -> &mut AnalysisTrigger {
        &mut self.trigger
    }

    pub(crate) fn record_analysis(&mut self, result: Result<Feedback, AnalysisError>) {
        match result {
            Ok(feedback) => {
                tracing::info!("Received feedback for session {}", self.id);
                self.feedback = Some(feedback);
                self.analysis_error = None;
            }
            Err(e) => {
                tracing::warn!("Analysis failed for session {}: {}", self.id, e);
                self.feedback = None;
                self.analysis_error = Some(e.to_string());
            }
        }
    }

    /// Clear everything captured so far and move to a new generation
    pub(crate) fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.state = SessionState::Idle;
        self.sampler.reset();
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.reset();
        }
        self.trigger.reset();
        self.feedback = None;
        self.analysis_error = None;
        self.stats = SessionStats::default();
    }

    pub fn report(&self) -> PlaybackReport {
        PlaybackReport {
            session_id: self.id,
            lift_type: self.source.lift_label(),
            state: self.state,
            stats: self.stats,
            frames_seen: self.sampler.frames_seen(),
            samples: self.sampler.buffer().len(),
            analysis_requested: self.trigger.has_fired(),
            feedback: self.feedback.clone(),
            message: self
                .analysis_error
                .as_ref()
                .map(|_| AnalysisError::USER_MESSAGE.to_string()),
        }
    }
}

/// Summary handed back to the host after playback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackReport {
    pub session_id: Uuid,
    pub lift_type: String,
    pub state: SessionState,
    #[serde(flatten)]
    pub stats: SessionStats,
    pub frames_seen: u64,
    pub samples: usize,
    pub analysis_requested: bool,
    pub feedback: Option<Feedback>,
    /// User-facing notice when no feedback could be produced
    pub message: Option<String>,
}
