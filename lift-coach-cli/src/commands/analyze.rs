use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use lift_coach_core::models::{LiftType, NormalizedKeypoint, VideoSourceRef};
use lift_coach_core::services::LoopExit;
use serde::Serialize;

use crate::config::Config;
use crate::error::CliError;
use crate::output;
use crate::pipeline::{self, DetectorChoice, RunOptions, RunSummary};

/// Analyze an uploaded lift recorded as a directory of frames
#[derive(Args)]
pub struct AnalyzeCommand {
    /// Directory of extracted frame images, played in file-name order
    #[arg(short, long)]
    frames: PathBuf,

    /// Lift performed in the clip (e.g. squat, deadlift, "overhead press")
    #[arg(short, long, value_parser = parse_lift)]
    lift: Option<LiftType>,

    /// Frame rate the frames were extracted at
    #[arg(long)]
    fps: Option<f32>,

    #[command(flatten)]
    detector: DetectorArgs,

    #[command(flatten)]
    output: OutputArgs,
}

/// Pose source for a run
#[derive(Args, Debug, Clone, Default)]
pub struct DetectorArgs {
    /// Recorded pose track (JSON, one entry per frame)
    #[arg(long)]
    pub poses: Option<PathBuf>,

    /// YOLO-pose ONNX model
    #[arg(long, conflicts_with = "poses")]
    pub model: Option<PathBuf>,
}

/// Where run artifacts go
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Write each overlay composited over its frame as PNG
    #[arg(long)]
    pub overlay_dir: Option<PathBuf>,

    /// Export the buffered, torso-normalized sequence as JSON
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Viewport height used to size the display
    #[arg(long)]
    pub viewport_height: Option<f32>,

    /// Pace playback by wall clock instead of one frame per iteration
    #[arg(long)]
    pub realtime: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

impl DetectorArgs {
    /// Resolve the detector, falling back to a default pose track
    pub fn choice(&self, fallback_track: Option<PathBuf>) -> Result<DetectorChoice> {
        if let Some(model) = &self.model {
            return model_choice(model);
        }

        let track = self
            .poses
            .clone()
            .or(fallback_track)
            .ok_or(CliError::NoDetector)?;
        if !track.exists() {
            return Err(CliError::PoseTrackNotFound(track).into());
        }
        Ok(DetectorChoice::Recorded(track))
    }
}

#[cfg(feature = "onnx")]
fn model_choice(model: &Path) -> Result<DetectorChoice> {
    Ok(DetectorChoice::Onnx(model.to_path_buf()))
}

#[cfg(not(feature = "onnx"))]
fn model_choice(_model: &Path) -> Result<DetectorChoice> {
    Err(CliError::OnnxUnavailable.into())
}

pub(crate) fn parse_lift(value: &str) -> Result<LiftType, String> {
    value.parse::<LiftType>().map_err(|e| e.to_string())
}

impl AnalyzeCommand {
    pub async fn execute(self, config: &Config) -> Result<()> {
        if !self.frames.is_dir() {
            return Err(CliError::FramesNotFound(self.frames).into());
        }
        let source = VideoSourceRef::upload(self.frames.to_string_lossy(), self.lift)?;
        let detector = self.detector.choice(None)?;

        let options = RunOptions {
            source,
            frames_root: config.demo.frames_root.clone(),
            fps: self.fps.unwrap_or(config.demo.fps),
            detector,
            overlay_dir: self.output.overlay_dir.clone(),
            viewport_height: self.output.viewport_height,
            realtime: self.output.realtime,
            show_progress: !self.output.quiet,
        };

        execute_run(config, options, &self.output).await
    }
}

/// Run the pipeline and present its outcome
pub(crate) async fn execute_run(
    config: &Config,
    options: RunOptions,
    output_args: &OutputArgs,
) -> Result<()> {
    let summary = pipeline::run(config, options).await?;

    if summary.exit == LoopExit::Cancelled {
        return Err(CliError::Interrupted.into());
    }

    output::print_report(&summary.report);

    if summary.overlays_written > 0 {
        if let Some(dir) = &output_args.overlay_dir {
            output::success(&format!(
                "Wrote {} overlay frames ({}x{}) to {}",
                summary.overlays_written,
                summary.layout.width,
                summary.layout.height,
                dir.display()
            ));
        }
    }

    if let Some(path) = &output_args.export {
        write_export(&summary, config.pipeline.sampling_interval, path)?;
        output::success(&format!("Exported sequence to {}", path.display()));
    }

    if summary.report.samples == 0 {
        output::warning("No poses were sampled from this clip");
    }

    Ok(())
}

/// Exported normalized sequence
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceExport {
    pub session_id: String,
    pub lift_type: String,
    pub exported_at: DateTime<Utc>,
    pub sampling_interval: u32,
    pub frames: Vec<Vec<NormalizedKeypoint>>,
}

impl SequenceExport {
    pub fn from_summary(summary: &RunSummary, sampling_interval: u32) -> Self {
        let report = &summary.report;
        Self {
            session_id: report.session_id.to_string(),
            lift_type: report.lift_type.clone(),
            exported_at: Utc::now(),
            sampling_interval,
            frames: summary.sequence.normalized(true),
        }
    }
}

fn write_export(summary: &RunSummary, sampling_interval: u32, path: &Path) -> Result<()> {
    let export = SequenceExport::from_summary(summary, sampling_interval);
    let json = serde_json::to_string_pretty(&export).context("Failed to serialize export")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
