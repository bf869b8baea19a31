/// ONNX pose detector
///
/// Runs a YOLOv8-pose model on inference frames:
/// - letterbox resize into the model input (gray padding)
/// - RGB, normalized to [0, 1], NCHW
/// - confidence filter and NMS over the anchors
/// - keypoints mapped back to the inference frame's pixel space
///
/// Model I/O:
/// - Input `images`: [1, 3, S, S] FP32
/// - Output `output0`: [1, 56, N] FP32 (4 bbox + 1 conf + 17 × (x, y, conf))
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use image::{imageops, Rgb, RgbImage};
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use crate::models::keypoint::{JointName, Keypoint, Pose};
use crate::services::pose_detector::{run_blocking, DetectorLoader, InferenceFrame, PoseDetector};

const KEYPOINT_OFFSET: usize = 5;
const LETTERBOX_FILL: Rgb<u8> = Rgb([114, 114, 114]);

/// Detected body before NMS, in model input space
#[derive(Debug, Clone)]
struct Candidate {
    cx: f32,
    cy: f32,
    w: f32,
    h: f32,
    confidence: f32,
    keypoints: Vec<(f32, f32, f32)>,
}

/// Letterbox transform from a frame into the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn new(width: u32, height: u32, target: u32) -> Self {
        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;
        Self {
            scale,
            pad_x: ((target - new_width) / 2) as f32,
            pad_y: ((target - new_height) / 2) as f32,
        }
    }

    fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Decoding parameters copied into each inference task
#[derive(Debug, Clone, Copy)]
struct DecodeParams {
    model_input_size: u32,
    confidence_threshold: f32,
    nms_iou_threshold: f32,
}

/// YOLOv8-pose detector on ONNX Runtime
pub struct OnnxPoseDetector {
    // `Session::run` needs exclusive access; shared with blocking tasks
    session: Arc<Mutex<Session>>,
    params: DecodeParams,
}

impl OnnxPoseDetector {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(model_path.as_ref())
            .context("Failed to load ONNX model")?;

        tracing::info!(
            "Loaded pose estimation model from {}",
            model_path.as_ref().display()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            params: DecodeParams {
                model_input_size: 640,
                confidence_threshold: 0.5,
                nms_iou_threshold: 0.45,
            },
        })
    }

    /// Default: 0.5
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.params.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Default: 0.45
    pub fn with_nms_threshold(mut self, threshold: f32) -> Self {
        self.params.nms_iou_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

fn infer(session: &Mutex<Session>, params: DecodeParams, frame: &InferenceFrame) -> Result<Vec<Pose>> {
    let letterbox = Letterbox::new(frame.width(), frame.height(), params.model_input_size);
    let input = preprocess(frame, &letterbox, params.model_input_size);
    let input_tensor = Tensor::from_array(input)?;

    let mut session = session
        .lock()
        .map_err(|_| anyhow!("Pose session lock poisoned"))?;
    let outputs = session
        .run(ort::inputs!["images" => input_tensor])
        .context("Failed to run inference")?;
    let output: ndarray::ArrayViewD<f32> = outputs["output0"]
        .try_extract_array()
        .context("Failed to extract output tensor")?;

    let shape = output.shape();
    if shape.len() != 3 || shape[1] < KEYPOINT_OFFSET + JointName::COUNT * 3 {
        return Err(anyhow!("Unexpected pose output shape {:?}", shape));
    }

    let mut candidates = Vec::new();
    for i in 0..shape[2] {
        let confidence = output[[0, 4, i]];
        if confidence < params.confidence_threshold {
            continue;
        }

        let keypoints = (0..JointName::COUNT)
            .map(|k| {
                let base = KEYPOINT_OFFSET + k * 3;
                (output[[0, base, i]], output[[0, base + 1, i]], output[[0, base + 2, i]])
            })
            .collect();

        candidates.push(Candidate {
            cx: output[[0, 0, i]],
            cy: output[[0, 1, i]],
            w: output[[0, 2, i]],
            h: output[[0, 3, i]],
            confidence,
            keypoints,
        });
    }

    Ok(apply_nms(candidates, params.nms_iou_threshold)
        .into_iter()
        .map(|candidate| to_pose(&candidate, &letterbox))
        .collect())
}

fn preprocess(frame: &InferenceFrame, letterbox: &Letterbox, target: u32) -> Array4<f32> {
    let new_width = ((frame.width() as f32 * letterbox.scale) as u32).max(1);
    let new_height = ((frame.height() as f32 * letterbox.scale) as u32).max(1);

    let resized = imageops::resize(
        frame.image(),
        new_width,
        new_height,
        imageops::FilterType::Triangle,
    );

    let mut padded = RgbImage::from_pixel(target, target, LETTERBOX_FILL);
    for (x, y, pixel) in resized.enumerate_pixels() {
        padded.put_pixel(
            x + letterbox.pad_x as u32,
            y + letterbox.pad_y as u32,
            Rgb([pixel[0], pixel[1], pixel[2]]),
        );
    }

    let size = target as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in padded.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }
    tensor
}

impl PoseDetector for OnnxPoseDetector {
    async fn estimate_poses(&self, frame: &InferenceFrame) -> Result<Vec<Pose>> {
        let session = Arc::clone(&self.session);
        let params = self.params;
        let frame = frame.clone();
        run_blocking(move || infer(&session, params, &frame)).await
    }
}

/// Builds the ONNX detector from a model path
#[derive(Debug, Clone)]
pub struct OnnxDetectorLoader {
    model_path: PathBuf,
}

impl OnnxDetectorLoader {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }
}

impl DetectorLoader for OnnxDetectorLoader {
    type Detector = OnnxPoseDetector;

    async fn load(&self) -> Result<Self::Detector> {
        let path = self.model_path.clone();
        run_blocking(move || OnnxPoseDetector::new(path)).await
    }
}

fn to_pose(candidate: &Candidate, letterbox: &Letterbox) -> Pose {
    Pose::new(
        JointName::all()
            .iter()
            .zip(candidate.keypoints.iter())
            .map(|(name, (x, y, conf))| {
                let (x, y) = letterbox.to_frame(*x, *y);
                Keypoint::new(*name, x, y, *conf)
            })
            .collect(),
    )
}

fn apply_nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep.iter().all(|kept| calculate_iou(kept, &candidate) < iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

fn calculate_iou(a: &Candidate, b: &Candidate) -> f32 {
    let inter_w = ((a.cx + a.w / 2.0).min(b.cx + b.w / 2.0) - (a.cx - a.w / 2.0).max(b.cx - b.w / 2.0)).max(0.0);
    let inter_h = ((a.cy + a.h / 2.0).min(b.cy + b.h / 2.0) - (a.cy - a.h / 2.0).max(b.cy - b.h / 2.0)).max(0.0);
    let inter_area = inter_w * inter_h;
    let union_area = a.w * a.h + b.w * b.h - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}
