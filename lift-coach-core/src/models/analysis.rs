use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::models::keypoint::PoseSequence;

/// Frames the analysis service actually reads from the front of a request
pub const SERVICE_FRAME_CAP: usize = 30;

/// Body of the outbound analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub keypoint_frames: PoseSequence,
    pub lift_type: String,
}

impl AnalysisRequest {
    pub fn new(keypoint_frames: PoseSequence, lift_type: impl Into<String>) -> Self {
        Self {
            keypoint_frames,
            lift_type: lift_type.into(),
        }
    }

    /// Number of sampled frames the service will ignore
    pub fn frames_beyond_service_cap(&self) -> usize {
        self.keypoint_frames.len().saturating_sub(SERVICE_FRAME_CAP)
    }
}

/// Response of the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub feedback: String,
}

/// Coaching feedback restricted to headings and paragraphs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Feedback(String);

const ALLOWED_TAGS: [&str; 7] = ["h1", "h2", "h3", "h4", "h5", "h6", "p"];

fn blocked_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
            .expect("valid regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<\s*(/?)\s*([a-zA-Z][a-zA-Z0-9]*)[^>]*>").expect("valid regex"))
}

fn block_end_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</(h[1-6]|p)>").expect("valid regex"))
}

impl Feedback {
    /// Sanitize an HTML fragment from the analysis service
    ///
    /// Heading and paragraph tags are kept without attributes. Script, style
    /// and comment blocks are removed with their content; every other tag is
    /// dropped while its text is kept.
    pub fn from_html(html: &str) -> Self {
        let without_blocks = blocked_block_regex().replace_all(html, "");
        let sanitized = tag_regex().replace_all(&without_blocks, |caps: &Captures| {
            let closing = &caps[1];
            let name = caps[2].to_lowercase();
            if ALLOWED_TAGS.contains(&name.as_str()) {
                format!("<{}{}>", closing, name)
            } else {
                String::new()
            }
        });
        Self(sanitized.trim().to_string())
    }

    pub fn as_html(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Terminal rendering: one line per heading or paragraph
    pub fn to_plain_text(&self) -> String {
        let with_breaks = block_end_regex().replace_all(&self.0, "\n");
        let text = tag_regex().replace_all(&with_breaks, "");
        let decoded = text
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&nbsp;", " ")
            .replace("&amp;", "&");

        decoded
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::keypoint::{JointName, Keypoint, Pose};

    #[test]
    fn test_request_wire_format() {
        let mut frames = PoseSequence::new();
        frames.push(Pose::new(vec![Keypoint::new(JointName::Nose, 1.0, 2.0, 0.5)]));
        let request = AnalysisRequest::new(frames, "Squat");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "keypointFrames": [[{ "name": "nose", "x": 1.0, "y": 2.0, "score": 0.5 }]],
                "liftType": "Squat"
            })
        );
    }

    #[test]
    fn test_frames_beyond_service_cap() {
        let frames: Vec<Pose> = (0..45).map(|_| Pose::default()).collect();
        let request = AnalysisRequest::new(frames.into(), "Deadlift");
        assert_eq!(request.frames_beyond_service_cap(), 15);
    }

    #[test]
    fn test_feedback_keeps_headings_and_paragraphs() {
        let feedback = Feedback::from_html(
            r#"<h1 class="x">Lift Form Feedback</h1><h2>Top</h2><p>Good <b>brace</b>.</p>"#,
        );
        assert_eq!(
            feedback.as_html(),
            "<h1>Lift Form Feedback</h1><h2>Top</h2><p>Good brace.</p>"
        );
    }

    #[test]
    fn test_feedback_strips_scripts_and_comments() {
        let feedback = Feedback::from_html(
            "<p>ok</p><script>alert('x')</script><!-- note --><img src=x onerror=y>",
        );
        assert_eq!(feedback.as_html(), "<p>ok</p>");
    }

    #[test]
    fn test_feedback_plain_text() {
        let feedback = Feedback::from_html("<h1>Lift Form Feedback</h1><h2>Bottom</h2><p>Knees &amp; hips.</p>");
        assert_eq!(feedback.to_plain_text(), "Lift Form Feedback\nBottom\nKnees & hips.");
    }
}
