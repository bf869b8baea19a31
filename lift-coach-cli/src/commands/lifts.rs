use anyhow::Result;
use colored::Colorize;
use lift_coach_core::models::LiftType;

use crate::config::Config;
use crate::output;

pub async fn list_lifts(config: &Config) -> Result<()> {
    output::section("Supported Lifts");

    for lift in LiftType::all() {
        let frames = config.demo.frames_root.join(lift.demo_slug());
        let status = if frames.is_dir() {
            "demo available".green()
        } else {
            "no demo frames".dimmed()
        };

        println!(
            "{:<16} {:<12} {}  {}",
            lift.label().bold(),
            lift.demo_slug(),
            status,
            frames.display().to_string().dimmed()
        );
    }

    Ok(())
}
