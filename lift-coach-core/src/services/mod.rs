// Pose-tracking pipeline services

pub mod analysis_client;
pub mod analysis_trigger;
pub mod frame_clock;
pub mod frame_sampler;
pub mod image_surface;
pub mod keypoint_normalizer;
pub mod metadata_poll;
pub mod playback_controller;
pub mod playback_session;
pub mod pose_detector;
#[cfg(feature = "onnx")]
pub mod pose_estimation_service;
pub mod pose_smoother;
pub mod skeleton_renderer;
pub mod video_source;

pub use analysis_client::{AnalysisService, HttpAnalysisClient};
pub use analysis_trigger::AnalysisTrigger;
pub use frame_clock::{FrameClock, ImmediateClock, IntervalClock};
pub use frame_sampler::FrameSampler;
pub use image_surface::ImageSurface;
pub use keypoint_normalizer::normalize_keypoints;
pub use metadata_poll::{wait_for_metadata, PollConfig};
pub use playback_controller::{LoopExit, PlaybackController, TickOutcome};
pub use playback_session::{PlaybackReport, PlaybackSession, SessionState, SessionStats};
pub use pose_detector::{
    DetectorLoader, InferenceFrame, PoseDetector, PoseTrack, RecordedPoseDetector,
    RecordedTrackLoader, SharedDetector, run_blocking,
};
#[cfg(feature = "onnx")]
pub use pose_estimation_service::{OnnxDetectorLoader, OnnxPoseDetector};
pub use pose_smoother::PoseSmoother;
pub use skeleton_renderer::{RenderSurface, SkeletonRenderer, CONNECTED_JOINTS};
pub use video_source::{FrameDirectoryVideo, Pacing, VideoSource};
