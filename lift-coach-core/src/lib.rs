//! Playback-synchronized pose tracking for barbell lift videos.
//!
//! A [`services::PlaybackController`] drives per-frame inference while a video
//! plays, renders a skeleton overlay, samples a bounded pose sequence and
//! requests one coaching summary when playback ends.

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::PipelineConfig;
pub use error::{AnalysisError, PipelineError};
