use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::video::VideoDimensions;
use crate::services::video_source::VideoSource;

/// Bounded fixed-interval polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_attempts: 50,
        }
    }
}

impl PollConfig {
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            interval: config.metadata_poll_interval(),
            max_attempts: config.metadata_max_attempts.max(1),
        }
    }

    /// Upper bound on the total wait
    pub fn deadline(&self) -> Duration {
        self.interval * self.max_attempts
    }

    /// Call `check` until it yields a value or attempts run out
    ///
    /// Returns the value and the attempt it arrived on.
    pub async fn execute<F, T>(&self, mut check: F) -> Option<(T, u32)>
    where
        F: FnMut() -> Option<T>,
    {
        for attempt in 1..=self.max_attempts {
            if let Some(value) = check() {
                return Some((value, attempt));
            }

            if attempt < self.max_attempts {
                tracing::trace!("Poll attempt {} empty, retrying in {:?}", attempt, self.interval);
                sleep(self.interval).await;
            }
        }

        tracing::warn!("Max poll attempts ({}) exceeded", self.max_attempts);
        None
    }
}

/// Wait until the source reports its intrinsic dimensions
///
/// Subscribes to metadata events when the source offers them and falls back
/// to bounded polling otherwise.
pub async fn wait_for_metadata<V: VideoSource>(
    video: &V,
    config: &PollConfig,
) -> Result<VideoDimensions, PipelineError> {
    let known = video.dimensions();
    if known.is_known() {
        return Ok(known);
    }

    if let Some(mut events) = video.metadata_events() {
        let waited = timeout(
            config.deadline(),
            events.wait_for(|dims| dims.map_or(false, |d| d.is_known())),
        )
        .await;

        match waited {
            Ok(Ok(dims)) => {
                if let Some(dims) = *dims {
                    return Ok(dims);
                }
            }
            Ok(Err(_)) => {
                tracing::debug!("Metadata channel closed, falling back to polling");
            }
            Err(_) => {
                return Err(PipelineError::MetadataTimeout {
                    attempts: config.max_attempts,
                });
            }
        }
    }

    config
        .execute(|| {
            let dims = video.dimensions();
            dims.is_known().then_some(dims)
        })
        .await
        .map(|(dims, attempts)| {
            tracing::debug!("Video metadata available after {} polls", attempts);
            dims
        })
        .ok_or(PipelineError::MetadataTimeout {
            attempts: config.max_attempts,
        })
}
