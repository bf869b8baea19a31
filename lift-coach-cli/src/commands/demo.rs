use anyhow::Result;
use clap::Args;
use lift_coach_core::models::{LiftType, VideoSourceRef};

use super::analyze::{execute_run, parse_lift, DetectorArgs, OutputArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::pipeline::RunOptions;

/// Play a bundled demo clip
///
/// Demo frames live under `{frames_root}/{slug}/` with the recorded pose track
/// at `{frames_root}/{slug}.poses.json`.
#[derive(Args)]
pub struct DemoCommand {
    /// Lift to demo
    #[arg(value_parser = parse_lift)]
    lift: LiftType,

    #[command(flatten)]
    detector: DetectorArgs,

    #[command(flatten)]
    output: OutputArgs,
}

impl DemoCommand {
    pub async fn execute(self, config: &Config) -> Result<()> {
        let slug = self.lift.demo_slug();
        let frames = config.demo.frames_root.join(slug);
        if !frames.is_dir() {
            return Err(CliError::FramesNotFound(frames).into());
        }

        let detector = self
            .detector
            .choice(Some(config.demo.pose_track(slug)))?;

        let options = RunOptions {
            source: VideoSourceRef::demo(self.lift),
            frames_root: config.demo.frames_root.clone(),
            fps: config.demo.fps,
            detector,
            overlay_dir: self.output.overlay_dir.clone(),
            viewport_height: self.output.viewport_height,
            realtime: self.output.realtime,
            show_progress: !self.output.quiet,
        };

        execute_run(config, options, &self.output).await
    }
}
