use crate::models::keypoint::{Keypoint, Pose};

/// Exponential blend of consecutive poses
///
/// `blended = current * (1 - alpha) + previous * alpha`, applied to x, y and
/// confidence. Joints are matched by name; a joint absent from the previous
/// frame passes through unchanged.
#[derive(Debug, Clone)]
pub struct PoseSmoother {
    alpha: f32,
    prev: Option<Pose>,
}

impl PoseSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            prev: None,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn apply(&mut self, pose: &Pose) -> Pose {
        let smoothed = match &self.prev {
            None => pose.clone(),
            Some(prev) => {
                let alpha = self.alpha;
                let keypoints = pose
                    .keypoints()
                    .iter()
                    .map(|cur| match prev.get(cur.name) {
                        Some(old) => Keypoint::new(
                            cur.name,
                            blend(cur.x, old.x, alpha),
                            blend(cur.y, old.y, alpha),
                            blend(cur.confidence, old.confidence, alpha),
                        ),
                        None => *cur,
                    })
                    .collect();
                Pose::new(keypoints)
            }
        };

        self.prev = Some(smoothed.clone());
        smoothed
    }

    /// Forget the previous frame
    pub fn reset(&mut self) {
        self.prev = None;
    }

    pub fn has_history(&self) -> bool {
        self.prev.is_some()
    }
}

fn blend(current: f32, previous: f32, alpha: f32) -> f32 {
    current * (1.0 - alpha) + previous * alpha
}
