// Wires the core playback controller to frame directories, the HTTP
// analysis client and PNG overlay output.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use lift_coach_core::models::{DisplayLayout, PoseSequence, VideoSourceRef};
use lift_coach_core::services::{
    DetectorLoader, FrameClock, FrameDirectoryVideo, HttpAnalysisClient, ImageSurface,
    ImmediateClock, IntervalClock, LoopExit, Pacing, PlaybackController, PlaybackReport,
    RecordedTrackLoader, SharedDetector, TickOutcome,
};
use lift_coach_core::PipelineError;

use crate::config::Config;
use crate::error::CliError;
use crate::output;

/// Where poses come from
#[derive(Debug, Clone)]
pub enum DetectorChoice {
    /// Replay a JSON pose track with one entry per frame
    Recorded(PathBuf),
    /// Run a YOLO-pose ONNX model
    #[cfg(feature = "onnx")]
    Onnx(PathBuf),
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: VideoSourceRef,
    /// Directory demo sources resolve against
    pub frames_root: PathBuf,
    pub fps: f32,
    pub detector: DetectorChoice,
    pub overlay_dir: Option<PathBuf>,
    pub viewport_height: Option<f32>,
    pub realtime: bool,
    pub show_progress: bool,
}

/// Outcome of one playback run
#[derive(Debug)]
pub struct RunSummary {
    pub exit: LoopExit,
    pub layout: DisplayLayout,
    pub report: PlaybackReport,
    pub sequence: PoseSequence,
    pub overlays_written: usize,
}

type Controller<L> = PlaybackController<
    FrameDirectoryVideo,
    L,
    ImageSurface,
    HttpAnalysisClient,
    Pacer,
>;

/// Frame clock selected at runtime
pub enum Pacer {
    Immediate(ImmediateClock),
    Interval(IntervalClock),
}

impl Pacer {
    pub fn for_run(realtime: bool, period: Duration) -> Self {
        if realtime {
            Pacer::Interval(IntervalClock::new(period))
        } else {
            Pacer::Immediate(ImmediateClock)
        }
    }
}

impl FrameClock for Pacer {
    async fn next_frame(&mut self) {
        match self {
            Pacer::Immediate(clock) => clock.next_frame().await,
            Pacer::Interval(clock) => clock.next_frame().await,
        }
    }
}

/// Play a source to the end and collect the analysis report
pub async fn run(config: &Config, options: RunOptions) -> Result<RunSummary> {
    let analysis = HttpAnalysisClient::new(
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_seconds),
    )?;

    match options.detector.clone() {
        DetectorChoice::Recorded(path) => {
            drive(config, &options, RecordedTrackLoader::new(path), analysis).await
        }
        #[cfg(feature = "onnx")]
        DetectorChoice::Onnx(path) => {
            use lift_coach_core::services::OnnxDetectorLoader;
            drive(config, &options, OnnxDetectorLoader::new(path), analysis).await
        }
    }
}

async fn drive<L: DetectorLoader>(
    config: &Config,
    options: &RunOptions,
    loader: L,
    analysis: HttpAnalysisClient,
) -> Result<RunSummary> {
    let pacing = if options.realtime {
        Pacing::RealTime
    } else {
        Pacing::Stepped
    };
    let video = FrameDirectoryVideo::new(&options.frames_root, options.fps).with_pacing(pacing);
    let clock = Pacer::for_run(options.realtime, config.pipeline.tick_period());

    let mut controller = PlaybackController::new(
        config.pipeline.clone(),
        video,
        loader,
        SharedDetector::new(),
        ImageSurface::new(1, 1),
        analysis,
        clock,
    );
    if let Some(height) = options.viewport_height {
        controller = controller.with_viewport_height(height);
    }

    controller.assign_source(options.source.clone()).await?;

    // Armed before start so detector load and the metadata wait are interruptible
    let interrupt = controller.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });
    let played = play(&mut controller, options).await;
    ctrl_c.abort();
    let (exit, layout, overlays_written) = played?;

    let session = controller.session().ok_or(PipelineError::NoSource)?;
    Ok(RunSummary {
        exit,
        layout,
        report: session.report(),
        sequence: session.buffer().clone(),
        overlays_written,
    })
}

async fn play<L: DetectorLoader>(
    controller: &mut Controller<L>,
    options: &RunOptions,
) -> Result<(LoopExit, DisplayLayout, usize)> {
    let layout = match controller.start().await {
        Ok(layout) => layout,
        Err(PipelineError::Cancelled) => return Err(CliError::Interrupted.into()),
        Err(e) => return Err(e.into()),
    };

    if let Some(dir) = &options.overlay_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create overlay directory {}", dir.display()))?;
    }

    let progress = output::frame_progress(
        controller.video().frame_count() as u64,
        options.show_progress,
    );
    let mut overlays_written = 0;

    let exit = loop {
        match controller.step().await {
            None => break LoopExit::Cancelled,
            Some(TickOutcome::Ended) => break LoopExit::Ended,
            Some(TickOutcome::Rendered { frame_index, .. }) => {
                progress.set_position(frame_index + 1);
                if let Some(dir) = &options.overlay_dir {
                    if write_overlay(controller.video(), controller.surface(), dir, frame_index)? {
                        overlays_written += 1;
                    }
                }
            }
            Some(_) => {}
        }
    };
    progress.finish_and_clear();

    Ok((exit, layout, overlays_written))
}

/// Composite the current overlay over the frame it was drawn for
///
/// Returns `false` when that frame is no longer held by the video.
fn write_overlay(
    video: &FrameDirectoryVideo,
    surface: &ImageSurface,
    dir: &Path,
    frame_index: u64,
) -> Result<bool> {
    let Some(frame) = video.captured_frame(frame_index) else {
        return Ok(false);
    };
    surface.save_composite(frame, &dir.join(format!("overlay_{:05}.png", frame_index)))?;
    Ok(true)
}
