// Library exports for the lift-coach CLI
// This allows testing of internal modules

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
