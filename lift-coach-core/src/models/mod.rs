// Data models for pose tracking and lift analysis

pub mod analysis;
pub mod keypoint;
pub mod lift;
pub mod video;

pub use analysis::{AnalysisRequest, AnalysisResponse, Feedback, SERVICE_FRAME_CAP};
pub use keypoint::{JointName, Keypoint, NormalizedKeypoint, Pose, PoseSequence, RawKeypoint};
pub use lift::{resolve_lift_label, LiftType, UNKNOWN_LIFT_LABEL};
pub use video::{DisplayLayout, PlaybackStatus, VideoDimensions, VideoSourceRef, DEFAULT_DEMO_ROOT};
