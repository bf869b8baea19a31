use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Tunables of the pose-tracking pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Offscreen buffer size fed to the detector
    #[serde(default = "default_inference_size")]
    pub inference_width: u32,

    #[serde(default = "default_inference_size")]
    pub inference_height: u32,

    /// Every Nth inferred frame is buffered for analysis
    #[serde(default = "default_sampling_interval")]
    pub sampling_interval: u32,

    /// Keypoints at or below this confidence are not drawn
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    #[serde(default = "default_true")]
    pub smoothing_enabled: bool,

    /// Weight of the previous frame in the exponential blend
    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f32,

    #[serde(default = "default_max_display_height")]
    pub max_display_height: f32,

    /// Share of the viewport height the video may take
    #[serde(default = "default_viewport_fraction")]
    pub viewport_fraction: f32,

    #[serde(default = "default_metadata_poll_interval_ms")]
    pub metadata_poll_interval_ms: u64,

    #[serde(default = "default_metadata_max_attempts")]
    pub metadata_max_attempts: u32,

    #[serde(default = "default_inference_timeout_ms")]
    pub inference_timeout_ms: u64,

    #[serde(default = "default_analysis_timeout_seconds")]
    pub analysis_timeout_seconds: u64,

    /// Rate of the frame clock driving loop iterations
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
}

// Default value functions
fn default_inference_size() -> u32 {
    256
}

fn default_sampling_interval() -> u32 {
    6
}

fn default_confidence_threshold() -> f32 {
    0.4
}

fn default_true() -> bool {
    true
}

fn default_smoothing_alpha() -> f32 {
    0.7
}

fn default_max_display_height() -> f32 {
    720.0
}

fn default_viewport_fraction() -> f32 {
    0.8
}

fn default_metadata_poll_interval_ms() -> u64 {
    100
}

fn default_metadata_max_attempts() -> u32 {
    50
}

fn default_inference_timeout_ms() -> u64 {
    5000
}

fn default_analysis_timeout_seconds() -> u64 {
    60
}

fn default_tick_rate() -> u32 {
    60
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inference_width: default_inference_size(),
            inference_height: default_inference_size(),
            sampling_interval: default_sampling_interval(),
            confidence_threshold: default_confidence_threshold(),
            smoothing_enabled: default_true(),
            smoothing_alpha: default_smoothing_alpha(),
            max_display_height: default_max_display_height(),
            viewport_fraction: default_viewport_fraction(),
            metadata_poll_interval_ms: default_metadata_poll_interval_ms(),
            metadata_max_attempts: default_metadata_max_attempts(),
            inference_timeout_ms: default_inference_timeout_ms(),
            analysis_timeout_seconds: default_analysis_timeout_seconds(),
            tick_rate: default_tick_rate(),
        }
    }
}

impl PipelineConfig {
    /// Override selected values from `LIFT_COACH_*` environment variables
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(interval) = env_parse("LIFT_COACH_SAMPLING_INTERVAL") {
            self.sampling_interval = interval;
        }
        if let Some(alpha) = env_parse("LIFT_COACH_SMOOTHING_ALPHA") {
            self.smoothing_alpha = alpha;
        }
        if let Some(enabled) = env_parse("LIFT_COACH_SMOOTHING") {
            self.smoothing_enabled = enabled;
        }
        if let Some(size) = env_parse("LIFT_COACH_INFERENCE_SIZE") {
            self.inference_width = size;
            self.inference_height = size;
        }
        self
    }

    pub fn metadata_poll_interval(&self) -> Duration {
        Duration::from_millis(self.metadata_poll_interval_ms)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_seconds)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    /// Smoothing weight, `None` when smoothing is disabled
    pub fn smoothing(&self) -> Option<f32> {
        self.smoothing_enabled
            .then(|| self.smoothing_alpha.clamp(0.0, 1.0))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = env::var(key).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {}", key, value);
            None
        }
    }
}
