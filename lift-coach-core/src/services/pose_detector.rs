/// Pose detector seam
///
/// The detector is an external capability: the pipeline hands it a frame at
/// inference resolution and receives zero or more bodies. Construction is
/// expensive, so one instance is shared across sessions through
/// [`SharedDetector`], initialized lazily and at most once.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::PipelineError;
use crate::models::keypoint::{Keypoint, Pose};

/// Offscreen frame at inference resolution
#[derive(Debug, Clone)]
pub struct InferenceFrame {
    /// Source frame index the pixels were captured from
    pub index: u64,
    image: RgbaImage,
}

impl InferenceFrame {
    /// Downscale a decoded video frame to the inference size
    pub fn capture(index: u64, frame: &RgbaImage, width: u32, height: u32) -> Self {
        let image = if frame.dimensions() == (width, height) {
            frame.clone()
        } else {
            imageops::resize(frame, width, height, imageops::FilterType::Triangle)
        };
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Black-box pose estimator
#[allow(async_fn_in_trait)]
pub trait PoseDetector {
    /// Detect bodies in a frame; keypoints are in the frame's pixel space
    async fn estimate_poses(&self, frame: &InferenceFrame) -> Result<Vec<Pose>>;
}

impl<D: PoseDetector> PoseDetector for Arc<D> {
    async fn estimate_poses(&self, frame: &InferenceFrame) -> Result<Vec<Pose>> {
        (**self).estimate_poses(frame).await
    }
}

/// Run CPU-bound detector work on the blocking pool
///
/// The returned future yields while the work runs, so a timeout wrapped
/// around it can expire. The work itself is not interrupted.
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("Detector task failed")?
}

/// One-time asynchronous detector construction
#[allow(async_fn_in_trait)]
pub trait DetectorLoader {
    type Detector: PoseDetector;

    async fn load(&self) -> Result<Self::Detector>;
}

/// Lazily initialized detector shared by every session
///
/// Clones share the same cell. Concurrent callers of [`SharedDetector::get_or_load`]
/// wait for a single initialization instead of starting their own.
pub struct SharedDetector<D> {
    cell: Arc<OnceCell<Arc<D>>>,
}

impl<D> Clone for SharedDetector<D> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<D> Default for SharedDetector<D> {
    fn default() -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
        }
    }
}

impl<D: PoseDetector> SharedDetector<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Already-initialized handle
    pub fn ready(detector: D) -> Self {
        Self {
            cell: Arc::new(OnceCell::new_with(Some(Arc::new(detector)))),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    pub fn get(&self) -> Option<Arc<D>> {
        self.cell.get().cloned()
    }

    /// Return the detector, constructing it with `loader` on first use
    ///
    /// A failed load leaves the cell empty; the caller decides whether to try again.
    pub async fn get_or_load<L>(&self, loader: &L) -> Result<Arc<D>, PipelineError>
    where
        L: DetectorLoader<Detector = D>,
    {
        let detector = self
            .cell
            .get_or_try_init(|| async {
                tracing::info!("Initializing pose detector");
                loader.load().await.map(Arc::new)
            })
            .await
            .map_err(|e| {
                tracing::error!("Pose detector failed to initialize: {:#}", e);
                PipelineError::DetectorSetup(format!("{:#}", e))
            })?;

        Ok(Arc::clone(detector))
    }
}

/// Recorded pose track, one entry per source frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoseTrack {
    /// Pixel space the track was recorded in
    pub width: u32,
    pub height: u32,
    pub frames: Vec<Vec<Pose>>,
}

impl PoseTrack {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pose track {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse pose track {}", path.display()))
    }
}

/// Detector that replays a recorded track by frame index
#[derive(Debug, Clone)]
pub struct RecordedPoseDetector {
    track: PoseTrack,
}

impl RecordedPoseDetector {
    pub fn new(track: PoseTrack) -> Self {
        Self { track }
    }

    pub fn frame_count(&self) -> usize {
        self.track.frames.len()
    }
}

impl PoseDetector for RecordedPoseDetector {
    async fn estimate_poses(&self, frame: &InferenceFrame) -> Result<Vec<Pose>> {
        let Some(bodies) = self.track.frames.get(frame.index as usize) else {
            return Ok(Vec::new());
        };

        if self.track.width == 0 || self.track.height == 0 {
            return Ok(bodies.clone());
        }

        let scale_x = frame.width() as f32 / self.track.width as f32;
        let scale_y = frame.height() as f32 / self.track.height as f32;

        Ok(bodies
            .iter()
            .map(|pose| {
                Pose::new(
                    pose.keypoints()
                        .iter()
                        .map(|kp| {
                            let (x, y) = kp.scaled(scale_x, scale_y);
                            Keypoint::new(kp.name, x, y, kp.confidence)
                        })
                        .collect(),
                )
            })
            .collect())
    }
}

/// Loader for a recorded track file
#[derive(Debug, Clone)]
pub struct RecordedTrackLoader {
    path: std::path::PathBuf,
}

impl RecordedTrackLoader {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DetectorLoader for RecordedTrackLoader {
    type Detector = RecordedPoseDetector;

    async fn load(&self) -> Result<Self::Detector> {
        let track = PoseTrack::from_file(&self.path)?;
        tracing::info!(
            "Loaded pose track with {} frames from {}",
            track.frames.len(),
            self.path.display()
        );
        Ok(RecordedPoseDetector::new(track))
    }
}
