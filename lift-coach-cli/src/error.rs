use std::path::PathBuf;

use thiserror::Error;

/// Invalid command-line input
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Frame directory not found: {}", .0.display())]
    FramesNotFound(PathBuf),

    #[error("Pose track not found: {}", .0.display())]
    PoseTrackNotFound(PathBuf),

    #[error("No pose detector given; pass --poses <track.json>{}", model_hint())]
    NoDetector,

    #[error("This build has no ONNX support; rebuild with --features onnx")]
    OnnxUnavailable,

    #[error("Playback was interrupted")]
    Interrupted,
}

fn model_hint() -> &'static str {
    if cfg!(feature = "onnx") {
        " or --model <pose.onnx>"
    } else {
        ""
    }
}
