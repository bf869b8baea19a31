use std::time::Duration;

use assert_matches::assert_matches;
use lift_coach_core::models::{AnalysisRequest, JointName, Keypoint, Pose, PoseSequence};
use lift_coach_core::services::{AnalysisService, HttpAnalysisClient};
use lift_coach_core::AnalysisError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> AnalysisRequest {
    let pose = Pose::new(vec![
        Keypoint::new(JointName::LeftHip, 100.0, 200.0, 0.91),
        Keypoint::new(JointName::RightHip, 140.0, 200.0, 0.88),
    ]);
    AnalysisRequest::new(PoseSequence::from(vec![pose]), "Squat")
}

fn client(server: &MockServer) -> HttpAnalysisClient {
    HttpAnalysisClient::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_posts_keypoint_frames_and_lift_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .and(body_partial_json(json!({
            "liftType": "Squat",
            "keypointFrames": [[
                { "name": "left_hip", "x": 100.0, "y": 200.0 },
                { "name": "right_hip", "x": 140.0, "y": 200.0 }
            ]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "feedback": "<h1>Squat</h1><p>Good depth.</p>"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server).analyze(&request()).await.unwrap();
    assert_eq!(response.feedback, "<h1>Squat</h1><p>Good depth.</p>");
}

#[tokio::test]
async fn test_server_error_maps_to_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Failed to generate feedback"))
        .mount(&server)
        .await;

    let err = client(&server).analyze(&request()).await.unwrap_err();
    assert_matches!(err, AnalysisError::ServerError(ref msg) if msg == "Failed to generate feedback");
    assert_eq!(err.user_message(), "Analysis unavailable");
}

#[tokio::test]
async fn test_missing_endpoint_maps_to_not_found() {
    let server = MockServer::start().await;

    let err = client(&server).analyze(&request()).await.unwrap_err();
    assert_matches!(err, AnalysisError::NotFound(_));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).analyze(&request()).await.unwrap_err();
    assert_matches!(err, AnalysisError::InvalidResponse(_));
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpAnalysisClient::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
    let err = client.analyze(&request()).await.unwrap_err();
    assert_matches!(err, AnalysisError::NetworkError(_));
}

#[test]
fn test_endpoint_trims_trailing_slash() {
    let client = HttpAnalysisClient::new("http://localhost:3001/", Duration::from_secs(1)).unwrap();
    assert_eq!(client.endpoint(), "http://localhost:3001/api/analyze");
}
