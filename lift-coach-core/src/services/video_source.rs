/// Video source seam and a frame-directory implementation
///
/// A source exposes intrinsic dimensions once metadata is available, a
/// play/pause/seek surface, observable paused/ended flags, and the current
/// frame downscaled to inference resolution.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::models::video::{PlaybackStatus, VideoDimensions, VideoSourceRef};
use crate::services::pose_detector::InferenceFrame;

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Playable media consumed by the inference loop
#[allow(async_fn_in_trait)]
pub trait VideoSource {
    /// Point at new media; position returns to the start and playback stops
    async fn load(&mut self, source: &VideoSourceRef) -> Result<()>;

    /// Intrinsic size; zero until metadata has loaded
    fn dimensions(&self) -> VideoDimensions;

    /// Push notification of metadata, for sources that support it
    fn metadata_events(&self) -> Option<watch::Receiver<Option<VideoDimensions>>> {
        None
    }

    fn seek(&mut self, position: Duration);

    async fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn status(&self) -> PlaybackStatus;

    /// Current frame at inference resolution, `None` when nothing is decodable
    fn capture_frame(&mut self, width: u32, height: u32) -> Result<Option<InferenceFrame>>;
}

/// How a frame directory advances during playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Every capture consumes exactly one frame
    #[default]
    Stepped,
    /// Position follows wall-clock time at the declared frame rate
    RealTime,
}

/// Video backed by a directory of extracted frame images
///
/// Demo sources resolve to `{frames_root}/{slug}/`; uploads name the directory
/// directly. Frames play in file-name order.
#[derive(Debug)]
pub struct FrameDirectoryVideo {
    frames_root: PathBuf,
    fps: f32,
    pacing: Pacing,
    frames: Vec<PathBuf>,
    dimensions: VideoDimensions,
    metadata_tx: watch::Sender<Option<VideoDimensions>>,
    cursor: usize,
    started_at: Option<Instant>,
    start_offset: usize,
    paused: bool,
    // Full-resolution frame behind the latest capture
    last_frame: Option<(u64, RgbaImage)>,
}

impl FrameDirectoryVideo {
    pub fn new(frames_root: impl Into<PathBuf>, fps: f32) -> Self {
        let (metadata_tx, _) = watch::channel(None);
        Self {
            frames_root: frames_root.into(),
            fps: if fps > 0.0 { fps } else { 30.0 },
            pacing: Pacing::default(),
            frames: Vec::new(),
            dimensions: VideoDimensions::new(0, 0),
            metadata_tx,
            cursor: 0,
            started_at: None,
            start_offset: 0,
            paused: true,
            last_frame: None,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Decoded source frame of the latest capture, if it was `index`
    pub fn captured_frame(&self, index: u64) -> Option<&RgbaImage> {
        match &self.last_frame {
            Some((captured, frame)) if *captured == index => Some(frame),
            _ => None,
        }
    }

    /// Directory a source reference resolves to
    pub fn resolve(&self, source: &VideoSourceRef) -> PathBuf {
        match source {
            VideoSourceRef::Upload { location, .. } => PathBuf::from(location),
            VideoSourceRef::Demo { lift } => self.frames_root.join(lift.demo_slug()),
        }
    }

    fn position(&self) -> usize {
        match (self.pacing, self.started_at) {
            (Pacing::RealTime, Some(started)) if !self.paused => {
                let elapsed = started.elapsed().as_secs_f32();
                self.start_offset + (elapsed * self.fps) as usize
            }
            _ => self.cursor,
        }
    }

    fn load_frame(&self, index: usize) -> Result<RgbaImage> {
        let path = &self.frames[index];
        let image = image::open(path)
            .with_context(|| format!("Failed to decode frame {}", path.display()))?;
        Ok(image.to_rgba8())
    }
}

impl VideoSource for FrameDirectoryVideo {
    async fn load(&mut self, source: &VideoSourceRef) -> Result<()> {
        let dir = self.resolve(source);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to open frame directory {}", dir.display()))?;

        let mut frames = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_frame {
                frames.push(path);
            }
        }
        frames.sort();

        self.frames = frames;
        self.cursor = 0;
        self.start_offset = 0;
        self.started_at = None;
        self.paused = true;
        self.last_frame = None;
        self.dimensions = VideoDimensions::new(0, 0);
        self.metadata_tx.send_replace(None);

        if let Some(first) = self.frames.first() {
            let (width, height) = image::image_dimensions(first)
                .with_context(|| format!("Failed to read frame size of {}", first.display()))?;
            self.dimensions = VideoDimensions::new(width, height);
            self.metadata_tx.send_replace(Some(self.dimensions));
        }

        tracing::info!(
            "Loaded {} frames from {} at {} fps",
            self.frames.len(),
            dir.display(),
            self.fps
        );
        Ok(())
    }

    fn dimensions(&self) -> VideoDimensions {
        self.dimensions
    }

    fn metadata_events(&self) -> Option<watch::Receiver<Option<VideoDimensions>>> {
        Some(self.metadata_tx.subscribe())
    }

    fn seek(&mut self, position: Duration) {
        let index = (position.as_secs_f32() * self.fps) as usize;
        self.cursor = index.min(self.frames.len());
        self.start_offset = self.cursor;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    async fn play(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(anyhow!("No decodable frames"));
        }
        self.start_offset = self.cursor;
        self.started_at = Some(Instant::now());
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.cursor = self.position().min(self.frames.len());
        self.start_offset = self.cursor;
        self.paused = true;
    }

    fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            paused: self.paused,
            ended: !self.frames.is_empty() && self.position() >= self.frames.len(),
        }
    }

    fn capture_frame(&mut self, width: u32, height: u32) -> Result<Option<InferenceFrame>> {
        let index = self.position();
        if index >= self.frames.len() {
            return Ok(None);
        }

        let frame = self.load_frame(index)?;
        if self.pacing == Pacing::Stepped {
            self.cursor = index + 1;
        }
        let captured = InferenceFrame::capture(index as u64, &frame, width, height);
        self.last_frame = Some((index as u64, frame));
        Ok(Some(captured))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::models::lift::LiftType;

    fn write_frames(dir: &Path, count: usize) {
        for i in 0..count {
            RgbaImage::new(32, 18)
                .save(dir.join(format!("frame_{:04}.png", i)))
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();
    }

    #[tokio::test]
    async fn test_load_reports_metadata() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("squat");
        std::fs::create_dir(&dir).unwrap();
        write_frames(&dir, 3);

        let mut video = FrameDirectoryVideo::new(root.path(), 30.0);
        let events = video.metadata_events().unwrap();
        video.load(&VideoSourceRef::demo(LiftType::Squat)).await.unwrap();

        assert_eq!(video.frame_count(), 3);
        assert_eq!(video.dimensions(), VideoDimensions::new(32, 18));
        assert_eq!(*events.borrow(), Some(VideoDimensions::new(32, 18)));
        assert!(video.status().paused);
    }

    #[tokio::test]
    async fn test_stepped_playback_consumes_each_frame() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 3);

        let mut video = FrameDirectoryVideo::new(dir.path(), 30.0);
        let source = VideoSourceRef::upload(dir.path().to_string_lossy(), Some(LiftType::Deadlift)).unwrap();
        video.load(&source).await.unwrap();
        video.play().await.unwrap();

        let indices: Vec<u64> = (0..3)
            .map(|_| video.capture_frame(8, 8).unwrap().unwrap().index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(video.status().ended);
        assert!(video.capture_frame(8, 8).unwrap().is_none());

        assert_eq!(video.captured_frame(2).unwrap().dimensions(), (32, 18));
        assert!(video.captured_frame(1).is_none());

        video.seek(Duration::ZERO);
        assert!(!video.status().ended);
        assert_eq!(video.capture_frame(8, 8).unwrap().unwrap().width(), 8);
    }

    #[tokio::test]
    async fn test_play_without_frames_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut video = FrameDirectoryVideo::new(dir.path(), 30.0);
        let source = VideoSourceRef::upload(dir.path().to_string_lossy(), Some(LiftType::Squat)).unwrap();
        video.load(&source).await.unwrap();

        assert!(!video.dimensions().is_known());
        assert!(video.play().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_pacing_follows_clock() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 10);

        let mut video = FrameDirectoryVideo::new(dir.path(), 10.0).with_pacing(Pacing::RealTime);
        let source = VideoSourceRef::upload(dir.path().to_string_lossy(), Some(LiftType::Squat)).unwrap();
        video.load(&source).await.unwrap();
        video.play().await.unwrap();

        tokio::time::advance(Duration::from_millis(450)).await;
        assert_eq!(video.capture_frame(8, 8).unwrap().unwrap().index, 4);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(video.status().ended);
    }
}
