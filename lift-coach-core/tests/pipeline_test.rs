use std::path::Path;
use std::time::Duration;

use image::RgbaImage;
use lift_coach_core::models::{JointName, Keypoint, LiftType, Pose, VideoSourceRef};
use lift_coach_core::services::{
    FrameDirectoryVideo, HttpAnalysisClient, ImageSurface, ImmediateClock, LoopExit,
    PlaybackController, PoseTrack, RecordedTrackLoader, SessionState, SharedDetector,
};
use lift_coach_core::PipelineConfig;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FRAMES: usize = 60;

fn write_clip(dir: &Path) {
    for i in 0..FRAMES {
        RgbaImage::from_pixel(64, 36, image::Rgba([20, 20, 20, 255]))
            .save(dir.join(format!("{:05}.png", i)))
            .unwrap();
    }
}

/// Constant body whose nose x encodes the frame index
fn write_track(path: &Path) {
    let frames = (0..FRAMES)
        .map(|i| {
            vec![Pose::new(vec![
                Keypoint::new(JointName::Nose, i as f32, 40.0, 0.95),
                Keypoint::new(JointName::LeftShoulder, 110.0, 80.0, 0.9),
                Keypoint::new(JointName::RightShoulder, 146.0, 80.0, 0.9),
                Keypoint::new(JointName::LeftHip, 114.0, 150.0, 0.9),
                Keypoint::new(JointName::RightHip, 142.0, 150.0, 0.9),
                Keypoint::new(JointName::LeftKnee, 112.0, 200.0, 0.85),
                Keypoint::new(JointName::RightKnee, 144.0, 200.0, 0.85),
            ])]
        })
        .collect();
    let track = PoseTrack {
        width: 256,
        height: 256,
        frames,
    };
    std::fs::write(path, serde_json::to_string(&track).unwrap()).unwrap();
}

async fn analysis_server(feedback: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "feedback": feedback })))
        .expect(1)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_recorded_clip_produces_one_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip");
    std::fs::create_dir(&clip).unwrap();
    write_clip(&clip);
    let track_path = dir.path().join("track.json");
    write_track(&track_path);

    let server = analysis_server("<h1>OK</h1><script>alert(1)</script>").await;
    let config = PipelineConfig {
        smoothing_enabled: false,
        ..Default::default()
    };

    let mut controller = PlaybackController::new(
        config,
        FrameDirectoryVideo::new(dir.path(), 30.0),
        RecordedTrackLoader::new(&track_path),
        SharedDetector::new(),
        ImageSurface::new(1, 1),
        HttpAnalysisClient::new(server.uri(), Duration::from_secs(5)).unwrap(),
        ImmediateClock,
    );

    let source = VideoSourceRef::upload(clip.to_string_lossy(), Some(LiftType::Squat)).unwrap();
    controller.assign_source(source).await.unwrap();
    assert_eq!(controller.run().await.unwrap(), LoopExit::Ended);

    let report = controller.report().unwrap();
    assert_eq!(report.state, SessionState::Ended);
    assert_eq!(report.samples, FRAMES / 6);
    assert_eq!(report.stats.frames_inferred, FRAMES as u64);
    assert_eq!(report.feedback.unwrap().as_html(), "<h1>OK</h1>");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["liftType"], "Squat");

    let frames = body["keypointFrames"].as_array().unwrap();
    let sampled_indices: Vec<f64> = frames
        .iter()
        .map(|frame| frame[0]["x"].as_f64().unwrap())
        .collect();
    assert_eq!(
        sampled_indices,
        vec![5.0, 11.0, 17.0, 23.0, 29.0, 35.0, 41.0, 47.0, 53.0, 59.0]
    );
}

#[tokio::test]
async fn test_overlay_is_drawn_at_display_size() {
    let dir = tempfile::tempdir().unwrap();
    let squat_dir = dir.path().join("squat");
    std::fs::create_dir(&squat_dir).unwrap();
    write_clip(&squat_dir);
    let track_path = dir.path().join("squat.poses.json");
    write_track(&track_path);

    let server = analysis_server("<p>Keep your chest up.</p>").await;
    let mut controller = PlaybackController::new(
        PipelineConfig::default(),
        FrameDirectoryVideo::new(dir.path(), 30.0),
        RecordedTrackLoader::new(&track_path),
        SharedDetector::new(),
        ImageSurface::new(1, 1),
        HttpAnalysisClient::new(server.uri(), Duration::from_secs(5)).unwrap(),
        ImmediateClock,
    )
    .with_viewport_height(450.0);

    controller
        .assign_source(VideoSourceRef::demo(LiftType::Squat))
        .await
        .unwrap();
    let layout = controller.start().await.unwrap();
    assert_eq!((layout.width, layout.height), (640, 360));

    controller.tick().await;
    assert!(controller.surface().painted_pixels() > 0);

    assert_eq!(controller.run().await.unwrap(), LoopExit::Ended);
    let report = controller.report().unwrap();
    assert_eq!(report.lift_type, "squat");
    assert_eq!(
        report.feedback.unwrap().to_plain_text(),
        "Keep your chest up."
    );
}
