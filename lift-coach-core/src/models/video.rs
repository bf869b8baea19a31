use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::lift::{resolve_lift_label, LiftType};

/// Default location of the bundled demo clips
pub const DEFAULT_DEMO_ROOT: &str = "/demo-videos";

/// Where a playback session's video comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VideoSourceRef {
    /// User-provided file, always paired with an explicit lift selection
    Upload { location: String, lift: LiftType },
    /// Bundled demo clip keyed by lift
    Demo { lift: LiftType },
}

impl VideoSourceRef {
    /// Build an upload reference; uploads without a lift selection are rejected
    pub fn upload(location: impl Into<String>, lift: Option<LiftType>) -> Result<Self, PipelineError> {
        let lift = lift.ok_or(PipelineError::LiftNotSelected)?;
        Ok(Self::Upload {
            location: location.into(),
            lift,
        })
    }

    pub fn demo(lift: LiftType) -> Self {
        Self::Demo { lift }
    }

    /// Resolve the addressable location of the media
    pub fn location(&self, demo_root: &str) -> String {
        match self {
            Self::Upload { location, .. } => location.clone(),
            Self::Demo { lift } => format!(
                "{}/{}.mp4",
                demo_root.trim_end_matches('/'),
                lift.demo_slug()
            ),
        }
    }

    pub fn lift(&self) -> LiftType {
        match self {
            Self::Upload { lift, .. } | Self::Demo { lift } => *lift,
        }
    }

    /// Label for the analysis request
    pub fn lift_label(&self) -> String {
        match self {
            Self::Upload { lift, .. } => resolve_lift_label(Some(*lift), None),
            Self::Demo { lift } => resolve_lift_label(None, Some(*lift)),
        }
    }
}

/// Intrinsic pixel dimensions reported once metadata loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Some sources report zero until metadata is really available
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Observable playback flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    pub paused: bool,
    pub ended: bool,
}

impl PlaybackStatus {
    pub fn playing() -> Self {
        Self {
            paused: false,
            ended: false,
        }
    }

    /// Neither paused nor ended
    pub fn is_advancing(&self) -> bool {
        !self.paused && !self.ended
    }
}

/// On-screen size of the video and its overlay surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayLayout {
    pub width: u32,
    pub height: u32,
}

impl DisplayLayout {
    /// Letterbox the intrinsic size into a capped display height
    ///
    /// Height is `min(max_height, viewport_height * viewport_fraction)`, or
    /// `max_height` when the viewport is unknown. Width keeps the aspect ratio.
    pub fn fit(
        intrinsic: VideoDimensions,
        viewport_height: Option<f32>,
        max_height: f32,
        viewport_fraction: f32,
    ) -> Option<Self> {
        if !intrinsic.is_known() {
            return None;
        }

        let height = match viewport_height {
            Some(viewport) => (viewport * viewport_fraction).min(max_height),
            None => max_height,
        };
        let width = height / intrinsic.height as f32 * intrinsic.width as f32;

        Some(Self {
            width: width.round().max(1.0) as u32,
            height: height.round().max(1.0) as u32,
        })
    }
}
