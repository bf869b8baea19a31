/// Keypoint models and data structures
///
/// Joint detections arrive in pixel space relative to the inference image.
/// Joints are identified by a closed enumeration so that lookups never depend
/// on the detector's output order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// COCO joint names produced by the pose detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointName {
    pub const COUNT: usize = 17;

    /// Get joint name as used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// All joints in COCO index order
    pub fn all() -> [Self; Self::COUNT] {
        [
            Self::Nose,
            Self::LeftEye,
            Self::RightEye,
            Self::LeftEar,
            Self::RightEar,
            Self::LeftShoulder,
            Self::RightShoulder,
            Self::LeftElbow,
            Self::RightElbow,
            Self::LeftWrist,
            Self::RightWrist,
            Self::LeftHip,
            Self::RightHip,
            Self::LeftKnee,
            Self::RightKnee,
            Self::LeftAnkle,
            Self::RightAnkle,
        ]
    }

    /// Joint at a COCO index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::all().get(index).copied()
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JointName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|joint| joint.name() == s)
            .ok_or_else(|| PipelineError::UnknownJoint(s.to_string()))
    }
}

/// Single detected joint in inference-image pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: JointName,
    pub x: f32,
    pub y: f32,
    /// Detection confidence (0-1), `score` on the wire
    #[serde(rename = "score", alias = "confidence")]
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(name: JointName, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            name,
            x,
            y,
            confidence,
        }
    }

    /// Strictly above the threshold
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }

    /// Scale into another coordinate space
    pub fn scaled(&self, scale_x: f32, scale_y: f32) -> (f32, f32) {
        (self.x * scale_x, self.y * scale_y)
    }
}

/// Keypoint as emitted by detectors and recorded tracks, before the name is checked
#[derive(Debug, Clone, Deserialize)]
pub struct RawKeypoint {
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(alias = "confidence")]
    pub score: f32,
}

/// All keypoints detected for one body in one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<RawKeypoint>", into = "Vec<Keypoint>")]
pub struct Pose {
    keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// First keypoint with the given name, if any
    pub fn get(&self, name: JointName) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.name == name)
    }

    /// Mean confidence over the detected joints
    pub fn average_confidence(&self) -> f32 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.keypoints.iter().map(|kp| kp.confidence).sum();
        sum / self.keypoints.len() as f32
    }
}

impl From<Vec<RawKeypoint>> for Pose {
    /// Unknown joint names are dropped
    fn from(raw: Vec<RawKeypoint>) -> Self {
        let keypoints = raw
            .into_iter()
            .filter_map(|kp| match kp.name.parse::<JointName>() {
                Ok(name) => Some(Keypoint::new(name, kp.x, kp.y, kp.score)),
                Err(_) => {
                    tracing::trace!("Ignoring unknown joint {}", kp.name);
                    None
                }
            })
            .collect();
        Self { keypoints }
    }
}

impl From<Pose> for Vec<Keypoint> {
    fn from(pose: Pose) -> Self {
        pose.keypoints
    }
}

/// Torso-relative joint position, unitless
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedKeypoint {
    pub name: JointName,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

impl NormalizedKeypoint {
    /// Transmission form: coordinates to 3 decimals, score to 2
    pub fn rounded(&self) -> Self {
        Self {
            name: self.name,
            x: round_to(self.x, 3),
            y: round_to(self.y, 3),
            score: round_to(self.score, 2),
        }
    }
}

fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}

/// Sampled poses in playback order, one entry per sampled frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseSequence {
    frames: Vec<Pose>,
}

impl PoseSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pose: Pose) {
        self.frames.push(pose);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Pose] {
        &self.frames
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Normalize every frame; frames missing a torso landmark become empty
    pub fn normalized(&self, rounded: bool) -> Vec<Vec<NormalizedKeypoint>> {
        self.frames
            .iter()
            .map(|pose| {
                let normalized = crate::services::keypoint_normalizer::normalize_keypoints(pose);
                if rounded {
                    normalized.iter().map(NormalizedKeypoint::rounded).collect()
                } else {
                    normalized
                }
            })
            .collect()
    }
}

impl From<Vec<Pose>> for PoseSequence {
    fn from(frames: Vec<Pose>) -> Self {
        Self { frames }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_names() {
        assert_eq!(JointName::Nose.name(), "nose");
        assert_eq!(JointName::LeftShoulder.name(), "left_shoulder");
        assert_eq!(JointName::RightAnkle.name(), "right_ankle");
        assert_eq!(JointName::from_index(11), Some(JointName::LeftHip));
        assert_eq!(JointName::from_index(17), None);
    }

    #[test]
    fn test_joint_name_parse_rejects_unknown() {
        assert_eq!("left_knee".parse::<JointName>().unwrap(), JointName::LeftKnee);
        assert!("left_toe".parse::<JointName>().is_err());
    }

    #[test]
    fn test_keypoint_visibility_is_strict() {
        let kp = Keypoint::new(JointName::Nose, 1.0, 1.0, 0.4);
        assert!(!kp.is_visible(0.4));
        assert!(kp.is_visible(0.39));
    }

    #[test]
    fn test_pose_lookup_by_name_first_match() {
        let pose = Pose::new(vec![
            Keypoint::new(JointName::LeftKnee, 1.0, 2.0, 0.9),
            Keypoint::new(JointName::Nose, 3.0, 4.0, 0.9),
            Keypoint::new(JointName::LeftKnee, 9.0, 9.0, 0.9),
        ]);
        let knee = pose.get(JointName::LeftKnee).unwrap();
        assert_eq!(knee.x, 1.0);
        assert!(pose.get(JointName::RightKnee).is_none());
    }

    #[test]
    fn test_pose_wire_format_uses_score() {
        let pose = Pose::new(vec![Keypoint::new(JointName::LeftHip, 10.0, 20.0, 0.5)]);
        let json = serde_json::to_value(&pose).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "name": "left_hip", "x": 10.0, "y": 20.0, "score": 0.5 }])
        );
    }

    #[test]
    fn test_pose_decoding_ignores_unknown_joints() {
        let json = r#"[
            {"name": "nose", "x": 1.0, "y": 2.0, "score": 0.9},
            {"name": "tail", "x": 5.0, "y": 5.0, "score": 0.9},
            {"name": "left_wrist", "x": 3.0, "y": 4.0, "confidence": 0.7}
        ]"#;
        let pose: Pose = serde_json::from_str(json).unwrap();
        assert_eq!(pose.len(), 2);
        assert_eq!(pose.get(JointName::LeftWrist).unwrap().confidence, 0.7);
    }

    #[test]
    fn test_normalized_keypoint_rounding() {
        let kp = NormalizedKeypoint {
            name: JointName::LeftKnee,
            x: 0.123456,
            y: -1.98765,
            score: 0.876,
        };
        let rounded = kp.rounded();
        assert!((rounded.x - 0.123).abs() < 1e-6);
        assert!((rounded.y + 1.988).abs() < 1e-6);
        assert!((rounded.score - 0.88).abs() < 1e-6);
    }

    #[test]
    fn test_average_confidence_empty_pose() {
        assert_eq!(Pose::default().average_confidence(), 0.0);
    }
}
