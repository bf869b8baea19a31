/// Skeleton Renderer
///
/// Draws joints and bones onto a host-provided surface, scaling detections
/// from inference resolution to display resolution per axis.

use image::Rgba;

use crate::models::keypoint::{JointName, Pose};
use crate::models::video::DisplayLayout;

/// Anatomically connected joint pairs drawn as bones
pub const CONNECTED_JOINTS: [(JointName, JointName); 12] = [
    (JointName::LeftShoulder, JointName::RightShoulder),
    (JointName::LeftShoulder, JointName::LeftElbow),
    (JointName::LeftElbow, JointName::LeftWrist),
    (JointName::RightShoulder, JointName::RightElbow),
    (JointName::RightElbow, JointName::RightWrist),
    (JointName::LeftShoulder, JointName::LeftHip),
    (JointName::RightShoulder, JointName::RightHip),
    (JointName::LeftHip, JointName::RightHip),
    (JointName::LeftHip, JointName::LeftKnee),
    (JointName::LeftKnee, JointName::LeftAnkle),
    (JointName::RightHip, JointName::RightKnee),
    (JointName::RightKnee, JointName::RightAnkle),
];

pub const JOINT_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const BONE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 204]);
pub const JOINT_RADIUS: f32 = 4.0;
pub const BONE_WIDTH: f32 = 2.0;

/// 2D drawing surface the overlay is rendered onto
#[cfg_attr(test, mockall::automock)]
pub trait RenderSurface {
    /// Resize the surface; existing content is discarded
    fn resize(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    fn clear(&mut self);

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgba<u8>);

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgba<u8>);
}

/// Stateless skeleton painter
#[derive(Debug, Clone, Copy)]
pub struct SkeletonRenderer {
    confidence_threshold: f32,
}

impl SkeletonRenderer {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Clear the surface and draw every pose
    ///
    /// Returns the number of joints drawn.
    pub fn draw<S: RenderSurface + ?Sized>(
        &self,
        surface: &mut S,
        poses: &[Pose],
        display: DisplayLayout,
        inference_width: u32,
        inference_height: u32,
    ) -> usize {
        surface.clear();

        if inference_width == 0 || inference_height == 0 {
            return 0;
        }

        let scale_x = display.width as f32 / inference_width as f32;
        let scale_y = display.height as f32 / inference_height as f32;
        let threshold = self.confidence_threshold;
        let mut drawn = 0;

        for pose in poses {
            for kp in pose.keypoints().iter().filter(|kp| kp.is_visible(threshold)) {
                surface.fill_circle(kp.scaled(scale_x, scale_y), JOINT_RADIUS, JOINT_COLOR);
                drawn += 1;
            }

            for (start, end) in CONNECTED_JOINTS.iter() {
                let (Some(a), Some(b)) = (pose.get(*start), pose.get(*end)) else {
                    continue;
                };
                if a.is_visible(threshold) && b.is_visible(threshold) {
                    surface.stroke_line(
                        a.scaled(scale_x, scale_y),
                        b.scaled(scale_x, scale_y),
                        BONE_WIDTH,
                        BONE_COLOR,
                    );
                }
            }
        }

        drawn
    }
}

impl Default for SkeletonRenderer {
    fn default() -> Self {
        Self::new(0.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::keypoint::Keypoint;
    use mockall::predicate::*;
    use mockall::Sequence;

    fn layout() -> DisplayLayout {
        DisplayLayout {
            width: 512,
            height: 1024,
        }
    }

    #[test]
    fn test_clears_before_drawing() {
        let mut surface = MockRenderSurface::new();
        let mut seq = Sequence::new();
        surface.expect_clear().times(1).in_sequence(&mut seq).return_const(());
        surface
            .expect_fill_circle()
            .with(eq((20.0f32, 120.0f32)), eq(JOINT_RADIUS), eq(JOINT_COLOR))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let pose = Pose::new(vec![Keypoint::new(JointName::Nose, 10.0, 30.0, 0.9)]);
        let drawn = SkeletonRenderer::default().draw(&mut surface, &[pose], layout(), 256, 256);
        assert_eq!(drawn, 1);
    }

    #[test]
    fn test_skips_low_confidence_joints_and_their_bones() {
        let mut surface = MockRenderSurface::new();
        surface.expect_clear().times(1).return_const(());
        surface.expect_fill_circle().times(2).return_const(());
        surface
            .expect_stroke_line()
            .with(
                eq((20.0f32, 40.0f32)),
                eq((40.0f32, 80.0f32)),
                eq(BONE_WIDTH),
                eq(BONE_COLOR),
            )
            .times(1)
            .return_const(());

        let pose = Pose::new(vec![
            Keypoint::new(JointName::LeftShoulder, 10.0, 10.0, 0.9),
            Keypoint::new(JointName::LeftElbow, 20.0, 20.0, 0.8),
            // At the threshold, not drawn
            Keypoint::new(JointName::LeftWrist, 30.0, 30.0, 0.4),
        ]);
        let drawn = SkeletonRenderer::default().draw(&mut surface, &[pose], layout(), 256, 256);
        assert_eq!(drawn, 2);
    }

    #[test]
    fn test_no_poses_only_clears() {
        let mut surface = MockRenderSurface::new();
        surface.expect_clear().times(1).return_const(());
        surface.expect_fill_circle().never();
        surface.expect_stroke_line().never();

        assert_eq!(SkeletonRenderer::default().draw(&mut surface, &[], layout(), 256, 256), 0);
    }

    #[test]
    fn test_full_skeleton_draws_all_bones() {
        let mut surface = MockRenderSurface::new();
        surface.expect_clear().return_const(());
        surface.expect_fill_circle().times(JointName::COUNT).return_const(());
        surface
            .expect_stroke_line()
            .times(CONNECTED_JOINTS.len())
            .return_const(());

        let pose = Pose::new(
            JointName::all()
                .iter()
                .enumerate()
                .map(|(i, name)| Keypoint::new(*name, i as f32, i as f32, 0.95))
                .collect(),
        );
        SkeletonRenderer::default().draw(&mut surface, &[pose], layout(), 256, 256);
    }
}
