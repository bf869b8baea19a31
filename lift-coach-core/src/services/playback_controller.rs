/// Playback-synchronized inference loop
///
/// Drives "capture frame, infer, smooth, render, sample" once per frame-clock
/// tick while the video advances, and fires the one-shot analysis when
/// playback ends. Iterations are strictly sequential: the next tick is not
/// awaited until the current iteration, including its inference call, has
/// completed, so at most one inference is in flight per controller.
///
/// Cancellation goes through a per-generation [`CancellationToken`]. Changing
/// the source, replaying or tearing down cancels the pending iteration, and an
/// inference result that arrives after cancellation is discarded.

use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::error::{AnalysisError, PipelineError};
use crate::models::video::{DisplayLayout, VideoSourceRef};
use crate::services::analysis_client::AnalysisService;
use crate::services::frame_clock::FrameClock;
use crate::services::metadata_poll::{wait_for_metadata, PollConfig};
use crate::services::playback_session::{PlaybackReport, PlaybackSession, SessionState};
use crate::services::pose_detector::{DetectorLoader, PoseDetector, SharedDetector};
use crate::services::skeleton_renderer::{RenderSurface, SkeletonRenderer};
use crate::services::video_source::VideoSource;

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No-op: no session, not playing, paused, or no frame available
    Idle,
    /// Capture or inference failed; the frame was dropped
    Skipped,
    /// Session was cancelled while inference was in flight
    Discarded,
    /// Overlay redrawn for a source frame
    Rendered {
        frame_index: u64,
        bodies: usize,
        sampled: bool,
    },
    /// Playback has ended and the analysis trigger was consulted
    Ended,
}

/// Why [`PlaybackController::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Ended,
    Cancelled,
}

/// Owns the active playback session and its collaborators
pub struct PlaybackController<V, L, S, A, C>
where
    L: DetectorLoader,
{
    config: PipelineConfig,
    video: V,
    loader: L,
    detector: SharedDetector<L::Detector>,
    surface: S,
    analysis: A,
    clock: C,
    renderer: SkeletonRenderer,
    viewport_height: Option<f32>,
    session: Option<PlaybackSession>,
    generation: u64,
    cancel: CancellationToken,
    iterations: u64,
}

impl<V, L, S, A, C> PlaybackController<V, L, S, A, C>
where
    V: VideoSource,
    L: DetectorLoader,
    S: RenderSurface,
    A: AnalysisService,
    C: FrameClock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PipelineConfig,
        video: V,
        loader: L,
        detector: SharedDetector<L::Detector>,
        surface: S,
        analysis: A,
        clock: C,
    ) -> Self {
        let renderer = SkeletonRenderer::new(config.confidence_threshold);
        Self {
            config,
            video,
            loader,
            detector,
            surface,
            analysis,
            clock,
            renderer,
            viewport_height: None,
            session: None,
            generation: 0,
            cancel: CancellationToken::new(),
            iterations: 0,
        }
    }

    /// Height of the host viewport, used to cap the display size
    pub fn with_viewport_height(mut self, height: f32) -> Self {
        self.viewport_height = Some(height);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> Option<SessionState> {
        self.session.as_ref().map(PlaybackSession::state)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn video(&self) -> &V {
        &self.video
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Loop iterations completed since construction
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Token that cancels the current generation when triggered
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn report(&self) -> Option<PlaybackReport> {
        self.session.as_ref().map(PlaybackSession::report)
    }

    fn cancel_pending(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.generation += 1;
    }

    /// Replace the current source, discarding the previous session
    pub async fn assign_source(&mut self, source: VideoSourceRef) -> Result<(), PipelineError> {
        self.cancel_pending();
        self.session = None;
        self.video.pause();
        self.surface.clear();

        self.video.load(&source).await.map_err(|e| {
            tracing::error!("Failed to load video source: {:#}", e);
            PipelineError::Source(format!("{:#}", e))
        })?;

        let session = PlaybackSession::new(source, self.generation, &self.config);
        tracing::info!(
            "Session {} created for {} (generation {})",
            session.id(),
            session.source().lift_label(),
            self.generation
        );
        self.session = Some(session);
        Ok(())
    }

    /// Wait for the detector and metadata, size the surface and start playback
    ///
    /// Setup failure leaves the session in `Idle`; metadata or playback
    /// failure leaves it in `AwaitingMetadata`.
    pub async fn start(&mut self) -> Result<DisplayLayout, PipelineError> {
        let token = self.cancel.clone();
        let session = self.session.as_mut().ok_or(PipelineError::NoSource)?;

        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            loaded = self.detector.get_or_load(&self.loader) => { loaded?; }
        }

        session.set_state(SessionState::AwaitingMetadata);

        let poll = PollConfig::from_pipeline(&self.config);
        let dimensions = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PipelineError::Cancelled),
            waited = wait_for_metadata(&self.video, &poll) => waited.map_err(|e| {
                tracing::error!("{}", e);
                e
            })?,
        };

        let layout = DisplayLayout::fit(
            dimensions,
            self.viewport_height,
            self.config.max_display_height,
            self.config.viewport_fraction,
        )
        .ok_or(PipelineError::MetadataTimeout {
            attempts: poll.max_attempts,
        })?;

        self.surface.resize(layout.width, layout.height);
        session.set_layout(layout);

        self.video.seek(Duration::ZERO);
        self.video.play().await.map_err(|e| {
            tracing::error!("Video playback failed: {:#}", e);
            PipelineError::Playback(format!("{:#}", e))
        })?;

        tracing::info!(
            "Playing {}x{} video at {}x{}",
            dimensions.width,
            dimensions.height,
            layout.width,
            layout.height
        );
        session.set_state(SessionState::Playing);
        Ok(layout)
    }

    /// One iteration of the loop body
    pub async fn tick(&mut self) -> TickOutcome {
        let (state, layout) = match self.session.as_ref() {
            Some(session) => (session.state(), session.layout()),
            None => return TickOutcome::Idle,
        };
        if !matches!(state, SessionState::Playing | SessionState::Ended) {
            return TickOutcome::Idle;
        }
        let Some(detector) = self.detector.get() else {
            return TickOutcome::Idle;
        };

        let status = self.video.status();
        if status.ended {
            self.finish_playback().await;
            return TickOutcome::Ended;
        }
        let Some(layout) = layout.filter(|_| !status.paused) else {
            return TickOutcome::Idle;
        };

        let (width, height) = (self.config.inference_width, self.config.inference_height);
        let frame = match self.video.capture_frame(width, height) {
            Ok(Some(frame)) => frame,
            Ok(None) => return TickOutcome::Idle,
            Err(e) => {
                tracing::warn!("Skipping frame, capture failed: {:#}", e);
                self.note_skipped();
                return TickOutcome::Skipped;
            }
        };
        let frame_index = frame.index;

        let token = self.cancel.clone();
        let detection = timeout(self.config.inference_timeout(), detector.estimate_poses(&frame)).await;
        drop(frame);

        if token.is_cancelled() {
            tracing::debug!("Discarding inference for frame {} after cancellation", frame_index);
            return TickOutcome::Discarded;
        }

        let poses = match detection {
            Ok(Ok(poses)) => poses,
            Ok(Err(e)) => {
                tracing::warn!("Skipping frame {}, inference failed: {:#}", frame_index, e);
                self.note_skipped();
                return TickOutcome::Skipped;
            }
            Err(_) => {
                tracing::warn!(
                    "Skipping frame {}, inference exceeded {:?}",
                    frame_index,
                    self.config.inference_timeout()
                );
                self.note_skipped();
                return TickOutcome::Skipped;
            }
        };

        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Idle;
        };
        let bodies = poses.len();
        let buffered = session.buffer().len();
        let drawn = session.accept_detection(poses);
        self.renderer
            .draw(&mut self.surface, &drawn, layout, width, height);
        session.note_rendered();

        TickOutcome::Rendered {
            frame_index,
            bodies,
            sampled: session.buffer().len() > buffered,
        }
    }

    fn note_skipped(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.note_skipped();
        }
    }

    async fn finish_playback(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.set_state(SessionState::Ended);
        if session.analysis_fired() {
            tracing::trace!("Analysis already requested for session {}", session.id());
            return;
        }

        let request = session.analysis_request();
        let result = session
            .trigger_mut()
            .fire(&self.analysis, &request, self.config.analysis_timeout())
            .await;

        match result {
            Err(AnalysisError::AlreadyFired) => {
                tracing::trace!("Analysis already requested for session {}", session.id());
            }
            result => session.record_analysis(result),
        }
    }

    /// Run iterations on the frame clock until playback ends or is cancelled
    ///
    /// Starts the session first when it has not reached `Playing`.
    pub async fn run(&mut self) -> Result<LoopExit, PipelineError> {
        match self.state() {
            None => return Err(PipelineError::NoSource),
            Some(SessionState::Playing) | Some(SessionState::Ended) => {}
            Some(_) => {
                self.start().await?;
            }
        }

        loop {
            match self.step().await {
                None => return Ok(LoopExit::Cancelled),
                Some(TickOutcome::Ended) => return Ok(LoopExit::Ended),
                Some(_) => {}
            }
        }
    }

    /// Wait for the next frame-clock tick and run one iteration
    ///
    /// Returns `None` when the current generation is cancelled first.
    pub async fn step(&mut self) -> Option<TickOutcome> {
        let token = self.cancel.clone();
        tokio::select! {
            biased;
            _ = token.cancelled() => return None,
            _ = self.clock.next_frame() => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return None,
            outcome = self.tick() => outcome,
        };
        self.iterations += 1;
        Some(outcome)
    }

    /// Restart the current source from the beginning
    ///
    /// Replay fully resets the session: buffer, frame counter, smoothing
    /// history, analysis flag and feedback.
    pub async fn replay(&mut self) -> Result<DisplayLayout, PipelineError> {
        if self.session.is_none() {
            return Err(PipelineError::NoSource);
        }
        self.cancel_pending();
        let generation = self.generation;
        if let Some(session) = self.session.as_mut() {
            session.reset(generation);
            tracing::info!("Replaying session {} (generation {})", session.id(), generation);
        }
        self.surface.clear();
        self.start().await
    }

    /// Stop playback and drop the session
    pub fn teardown(&mut self) {
        self.cancel_pending();
        self.video.pause();
        self.surface.clear();
        if let Some(session) = self.session.take() {
            tracing::info!("Session {} torn down", session.id());
        }
    }
}
