// Terminal presentation for playback runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lift_coach_core::services::PlaybackReport;
use lift_coach_core::AnalysisError;

const PROGRESS_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} frames ({elapsed})";

/// Progress bar over source frames, hidden when output is not interactive
pub fn frame_progress(total: u64, visible: bool) -> ProgressBar {
    if !visible || total == 0 {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(PROGRESS_TEMPLATE) {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar
}

pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
    println!("────────────────────────────────");
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "Warning:".yellow().bold(), message);
}

/// Feedback text, or the fixed notice when none is available
pub fn feedback_text(report: &PlaybackReport) -> String {
    match (&report.feedback, &report.message) {
        (Some(feedback), _) if !feedback.is_empty() => feedback.to_plain_text(),
        (_, Some(message)) => message.clone(),
        _ => AnalysisError::USER_MESSAGE.to_string(),
    }
}

pub fn print_report(report: &PlaybackReport) {
    section(&format!("{} analysis", report.lift_type));
    println!("Session:          {}", report.session_id);
    println!("State:            {:?}", report.state);
    println!("Frames inferred:  {}", report.stats.frames_inferred);
    println!("Frames skipped:   {}", report.stats.frames_skipped);
    println!("Frames w/o pose:  {}", report.stats.frames_without_pose);
    println!("Samples buffered: {}", report.samples);

    section("Feedback");
    match &report.feedback {
        Some(feedback) if !feedback.is_empty() => println!("{}", feedback.to_plain_text()),
        _ => println!("{}", feedback_text(report).yellow()),
    }
}
