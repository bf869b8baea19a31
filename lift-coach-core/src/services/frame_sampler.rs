use crate::models::keypoint::{Pose, PoseSequence};

/// Collects every Nth inferred frame into the session's sequence buffer
///
/// The counter is 1-indexed: it is incremented first and the pose is kept when
/// `counter % interval == 0`, so a playback of `n` inferred frames yields
/// `n / interval` entries (frames 6, 12, ... for an interval of 6). Frames in
/// which no body was detected still advance the counter.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: u32,
    counter: u64,
    buffer: PoseSequence,
}

impl FrameSampler {
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            counter: 0,
            buffer: PoseSequence::new(),
        }
    }

    /// Count one inferred frame; returns true when the pose was buffered
    pub fn record(&mut self, pose: Option<&Pose>) -> bool {
        self.counter += 1;

        if self.counter % u64::from(self.interval) != 0 {
            return false;
        }

        match pose {
            Some(pose) => {
                self.buffer.push(pose.clone());
                tracing::debug!(
                    "Sampled frame {} ({} buffered)",
                    self.counter,
                    self.buffer.len()
                );
                true
            }
            None => false,
        }
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn frames_seen(&self) -> u64 {
        self.counter
    }

    pub fn buffer(&self) -> &PoseSequence {
        &self.buffer
    }

    /// Copy of the buffer for packaging into a request
    pub fn snapshot(&self) -> PoseSequence {
        self.buffer.clone()
    }

    pub fn reset(&mut self) {
        self.counter = 0;
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::keypoint::{JointName, Keypoint};

    fn pose_for_frame(frame: u32) -> Pose {
        Pose::new(vec![Keypoint::new(JointName::Nose, frame as f32, 0.0, 0.9)])
    }

    #[test]
    fn test_sixty_frames_yield_ten_samples() {
        let mut sampler = FrameSampler::new(6);
        let kept: Vec<u32> = (1..=60)
            .filter(|frame| sampler.record(Some(&pose_for_frame(*frame))))
            .collect();

        assert_eq!(sampler.buffer().len(), 10);
        assert_eq!(kept, vec![6, 12, 18, 24, 30, 36, 42, 48, 54, 60]);
        assert_eq!(sampler.frames_seen(), 60);
    }

    #[test]
    fn test_length_is_floor_of_frames_over_interval() {
        let mut sampler = FrameSampler::new(6);
        for frame in 1..=47 {
            sampler.record(Some(&pose_for_frame(frame)));
        }
        assert_eq!(sampler.buffer().len(), 7);
    }

    #[test]
    fn test_empty_detections_count_but_are_not_buffered() {
        let mut sampler = FrameSampler::new(2);
        assert!(!sampler.record(Some(&pose_for_frame(1))));
        assert!(!sampler.record(None));
        assert!(!sampler.record(Some(&pose_for_frame(3))));
        assert!(sampler.record(Some(&pose_for_frame(4))));
        assert_eq!(sampler.buffer().len(), 1);
        assert_eq!(sampler.frames_seen(), 4);
    }

    #[test]
    fn test_reset() {
        let mut sampler = FrameSampler::new(1);
        sampler.record(Some(&pose_for_frame(1)));
        sampler.reset();
        assert_eq!(sampler.frames_seen(), 0);
        assert!(sampler.buffer().is_empty());
    }

    #[test]
    fn test_zero_interval_treated_as_one() {
        let mut sampler = FrameSampler::new(0);
        assert_eq!(sampler.interval(), 1);
        assert!(sampler.record(Some(&pose_for_frame(1))));
    }
}
