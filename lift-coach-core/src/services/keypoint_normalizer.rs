/// Keypoint Normalizer
///
/// Converts pixel-space joints into a torso-relative frame so that sequences
/// recorded at different camera distances and framings are comparable:
/// - origin at the hip midpoint
/// - unit length equal to the vertical shoulder-to-hip distance (at least 1)

use crate::models::keypoint::{JointName, NormalizedKeypoint, Pose};

/// Minimum torso height in pixels
const MIN_TORSO_HEIGHT: f32 = 1.0;

/// Torso reference frame of one pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsoFrame {
    pub hip_center_x: f32,
    pub hip_center_y: f32,
    pub torso_height: f32,
}

impl TorsoFrame {
    /// Locate the torso; `None` when a hip or shoulder is missing
    pub fn from_pose(pose: &Pose) -> Option<Self> {
        let left_hip = pose.get(JointName::LeftHip)?;
        let right_hip = pose.get(JointName::RightHip)?;
        let left_shoulder = pose.get(JointName::LeftShoulder)?;
        let right_shoulder = pose.get(JointName::RightShoulder)?;

        let hip_center_x = (left_hip.x + right_hip.x) / 2.0;
        let hip_center_y = (left_hip.y + right_hip.y) / 2.0;
        let shoulder_center_y = (left_shoulder.y + right_shoulder.y) / 2.0;
        let torso_height = (shoulder_center_y - hip_center_y).abs().max(MIN_TORSO_HEIGHT);

        Some(Self {
            hip_center_x,
            hip_center_y,
            torso_height,
        })
    }
}

/// Normalize every keypoint of a pose relative to its torso
///
/// Returns an empty vector when any of the four torso landmarks is missing.
pub fn normalize_keypoints(pose: &Pose) -> Vec<NormalizedKeypoint> {
    let Some(torso) = TorsoFrame::from_pose(pose) else {
        return Vec::new();
    };

    pose.keypoints()
        .iter()
        .map(|kp| NormalizedKeypoint {
            name: kp.name,
            x: (kp.x - torso.hip_center_x) / torso.torso_height,
            y: (kp.y - torso.hip_center_y) / torso.torso_height,
            score: kp.confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::keypoint::Keypoint;
    use proptest::prelude::*;

    fn pose_at(scale: f32, offset_x: f32, offset_y: f32) -> Pose {
        let joints = [
            (JointName::LeftHip, 100.0, 200.0),
            (JointName::RightHip, 140.0, 200.0),
            (JointName::LeftShoulder, 100.0, 100.0),
            (JointName::RightShoulder, 140.0, 100.0),
            (JointName::LeftKnee, 95.0, 290.0),
            (JointName::RightKnee, 150.0, 285.0),
            (JointName::LeftAnkle, 98.0, 380.0),
            (JointName::RightAnkle, 143.0, 377.0),
        ];
        Pose::new(
            joints
                .iter()
                .map(|(name, x, y)| Keypoint::new(*name, x * scale + offset_x, y * scale + offset_y, 0.9))
                .collect(),
        )
    }

    fn coords(normalized: &[NormalizedKeypoint], name: JointName) -> (f32, f32) {
        let kp = normalized.iter().find(|kp| kp.name == name).unwrap();
        (kp.x, kp.y)
    }

    #[test]
    fn test_torso_relative_coordinates() {
        let normalized = normalize_keypoints(&pose_at(1.0, 0.0, 0.0));
        assert_eq!(normalized.len(), 8);

        // Hip center (120, 200), torso height 100
        let (x, y) = coords(&normalized, JointName::LeftKnee);
        assert!((x + 0.25).abs() < 1e-6);
        assert!((y - 0.9).abs() < 1e-6);
        let (x, y) = coords(&normalized, JointName::LeftShoulder);
        assert!((x + 0.2).abs() < 1e-6);
        assert!((y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_scaled_and_translated_pose_matches() {
        let original = normalize_keypoints(&pose_at(1.0, 0.0, 0.0));
        let scaled = normalize_keypoints(&pose_at(0.1, 0.0, 0.0));

        for joint in [
            JointName::LeftKnee,
            JointName::RightKnee,
            JointName::LeftAnkle,
            JointName::RightAnkle,
        ] {
            let (ax, ay) = coords(&original, joint);
            let (bx, by) = coords(&scaled, joint);
            assert!((ax - bx).abs() < 1e-3, "{} x mismatch", joint);
            assert!((ay - by).abs() < 1e-3, "{} y mismatch", joint);
        }
    }

    #[test]
    fn test_missing_right_hip_returns_empty() {
        let pose = Pose::new(
            pose_at(1.0, 0.0, 0.0)
                .keypoints()
                .iter()
                .copied()
                .filter(|kp| kp.name != JointName::RightHip)
                .collect(),
        );
        assert!(normalize_keypoints(&pose).is_empty());
        assert!(normalize_keypoints(&Pose::default()).is_empty());
    }

    #[test]
    fn test_torso_height_floor() {
        let pose = Pose::new(vec![
            Keypoint::new(JointName::LeftHip, 10.0, 50.0, 1.0),
            Keypoint::new(JointName::RightHip, 20.0, 50.0, 1.0),
            Keypoint::new(JointName::LeftShoulder, 10.0, 50.2, 1.0),
            Keypoint::new(JointName::RightShoulder, 20.0, 50.2, 1.0),
            Keypoint::new(JointName::Nose, 17.0, 48.0, 0.6),
        ]);
        let torso = TorsoFrame::from_pose(&pose).unwrap();
        assert_eq!(torso.torso_height, 1.0);

        let normalized = normalize_keypoints(&pose);
        let nose = normalized.iter().find(|kp| kp.name == JointName::Nose).unwrap();
        assert!((nose.x - 2.0).abs() < 1e-5);
        assert!((nose.y + 2.0).abs() < 1e-5);
        assert_eq!(nose.score, 0.6);
    }

    #[test]
    fn test_out_of_order_keypoints() {
        let mut keypoints = pose_at(1.0, 0.0, 0.0).keypoints().to_vec();
        keypoints.reverse();
        let reversed = normalize_keypoints(&Pose::new(keypoints));
        let original = normalize_keypoints(&pose_at(1.0, 0.0, 0.0));
        assert_eq!(
            coords(&reversed, JointName::RightAnkle),
            coords(&original, JointName::RightAnkle)
        );
    }

    proptest! {
        #[test]
        fn prop_translation_and_scale_invariance(
            scale in 0.05f32..20.0,
            dx in -2000.0f32..2000.0,
            dy in -2000.0f32..2000.0,
        ) {
            let original = normalize_keypoints(&pose_at(1.0, 0.0, 0.0));
            let moved = normalize_keypoints(&pose_at(scale, dx, dy));
            prop_assert_eq!(original.len(), moved.len());
            for (a, b) in original.iter().zip(moved.iter()) {
                prop_assert!((a.x - b.x).abs() < 1e-2);
                prop_assert!((a.y - b.y).abs() < 1e-2);
            }
        }
    }
}
