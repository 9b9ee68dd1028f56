//! ONNX model wrappers for the three landmark modalities.
//!
//! Each wrapper owns an optional session: a missing model file yields a
//! detector that reports no detections instead of failing, so the pipeline
//! still runs end to end on machines without the model bundle.

use std::path::Path;

use image::{imageops::FilterType, RgbImage};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

use crate::backend::DeviceSelection;
use crate::error::InferenceError;
use crate::types::{
    FaceLandmarks, HandLandmarks, Handedness, Landmark, PoseLandmarks, HAND_LANDMARK_COUNT,
    POSE_LANDMARK_NAMES,
};

const POSE_INPUT: u32 = 256;
const FACE_INPUT: u32 = 192;
const FACE_LANDMARK_COUNT: usize = 468;
const HAND_INPUT: u32 = 224;
const PRESENCE_THRESHOLD: f32 = 0.5;

fn providers(device: DeviceSelection) -> Vec<ExecutionProviderDispatch> {
    match device {
        DeviceSelection::Cpu => vec![CPUExecutionProvider::default().build()],
        // Exact device binding: no silent CPU fallback, so a bad accelerator
        // surfaces as a construction error and triggers the switch rollback.
        DeviceSelection::Accelerator(i) => vec![CUDAExecutionProvider::default()
            .with_device_id(i as i32)
            .build()
            .error_on_failure()],
    }
}

fn build_session(
    path: &Path,
    device: DeviceSelection,
    modality: &'static str,
) -> Result<Option<Session>, InferenceError> {
    if !path.exists() {
        log::warn!(
            "{} model not found at {}, running without it",
            modality,
            path.display()
        );
        return Ok(None);
    }

    let session = Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(4))
        .and_then(|b| b.with_execution_providers(providers(device)))
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| InferenceError::new(modality, e))?;

    log::info!("loaded {} model from {} on {}", modality, path.display(), device);
    Ok(Some(session))
}

/// Interleaved NHWC float input, one value per channel per pixel.
fn nhwc_input(frame: &RgbImage, side: u32, scale: impl Fn(u8) -> f32) -> Vec<f32> {
    let resized = image::imageops::resize(frame, side, side, FilterType::Triangle);
    let mut data = Vec::with_capacity((side * side * 3) as usize);
    for y in 0..side {
        for x in 0..side {
            let pixel = resized.get_pixel(x, y);
            data.push(scale(pixel[0]));
            data.push(scale(pixel[1]));
            data.push(scale(pixel[2]));
        }
    }
    data
}

/// Full-body landmark model (BlazePose-style): 256x256 input, 33 landmarks
/// in input-pixel scale plus a body presence score.
pub struct PoseModel {
    session: Option<Session>,
}

impl PoseModel {
    pub fn new(path: &Path, device: DeviceSelection) -> Result<Self, InferenceError> {
        Ok(Self {
            session: build_session(path, device, "pose")?,
        })
    }

    pub fn absent() -> Self {
        Self { session: None }
    }

    pub fn detect(&mut self, frame: &RgbImage) -> Result<PoseLandmarks, InferenceError> {
        let Some(session) = &mut self.session else {
            return Ok(PoseLandmarks::default());
        };

        let input_data = nhwc_input(frame, POSE_INPUT, |p| p as f32 / 255.0);
        let shape = vec![1, POSE_INPUT as i64, POSE_INPUT as i64, 3];
        let input =
            Tensor::from_array((shape, input_data)).map_err(|e| InferenceError::new("pose", e))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| InferenceError::new("pose", e))?;

        let (_, presence) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::new("pose", e))?;
        if presence.first().copied().unwrap_or(0.0) < PRESENCE_THRESHOLD {
            return Ok(PoseLandmarks::default());
        }

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::new("pose", e))?;
        // The landmark tensor carries 5 floats per point (x, y, z, visibility,
        // presence); only the first 33 points are body landmarks.
        if raw.len() < POSE_LANDMARK_NAMES.len() * 5 {
            return Err(InferenceError::new(
                "pose",
                format!("unexpected landmark tensor length {}", raw.len()),
            ));
        }

        let side = POSE_INPUT as f32;
        let points = POSE_LANDMARK_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| {
                Landmark::new(
                    *name,
                    raw[i * 5] / side,
                    raw[i * 5 + 1] / side,
                    raw[i * 5 + 2] / side,
                )
            })
            .collect();

        Ok(PoseLandmarks { points })
    }
}

/// Face mesh model: 192x192 input, 468 landmarks in input-pixel scale plus a
/// face presence score. One face per frame with this model.
pub struct FaceMeshModel {
    session: Option<Session>,
}

impl FaceMeshModel {
    pub fn new(path: &Path, device: DeviceSelection) -> Result<Self, InferenceError> {
        Ok(Self {
            session: build_session(path, device, "face mesh")?,
        })
    }

    pub fn absent() -> Self {
        Self { session: None }
    }

    pub fn detect(&mut self, frame: &RgbImage) -> Result<Vec<FaceLandmarks>, InferenceError> {
        let Some(session) = &mut self.session else {
            return Ok(Vec::new());
        };

        let input_data = nhwc_input(frame, FACE_INPUT, |p| p as f32 / 127.5 - 1.0);
        let shape = vec![1, FACE_INPUT as i64, FACE_INPUT as i64, 3];
        let input = Tensor::from_array((shape, input_data))
            .map_err(|e| InferenceError::new("face mesh", e))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| InferenceError::new("face mesh", e))?;

        let (_, presence) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::new("face mesh", e))?;
        if presence.first().copied().unwrap_or(0.0) < PRESENCE_THRESHOLD {
            return Ok(Vec::new());
        }

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::new("face mesh", e))?;
        if raw.len() < FACE_LANDMARK_COUNT * 3 {
            return Err(InferenceError::new(
                "face mesh",
                format!("unexpected mesh tensor length {}", raw.len()),
            ));
        }

        let side = FACE_INPUT as f32;
        let points = (0..FACE_LANDMARK_COUNT)
            .map(|i| {
                Landmark::new(
                    format!("FaceLandmark_{}", i),
                    raw[i * 3] / side,
                    raw[i * 3 + 1] / side,
                    raw[i * 3 + 2] / side,
                )
            })
            .collect();

        Ok(vec![FaceLandmarks { points }])
    }
}

/// Hand landmark model: 224x224 input, 21 landmarks in input-pixel scale,
/// a hand presence score, and a handedness score (>= 0.5 means right hand).
pub struct HandModel {
    session: Option<Session>,
}

impl HandModel {
    pub fn new(path: &Path, device: DeviceSelection) -> Result<Self, InferenceError> {
        Ok(Self {
            session: build_session(path, device, "hand")?,
        })
    }

    pub fn absent() -> Self {
        Self { session: None }
    }

    pub fn detect(&mut self, frame: &RgbImage) -> Result<Vec<HandLandmarks>, InferenceError> {
        let Some(session) = &mut self.session else {
            return Ok(Vec::new());
        };

        let input_data = nhwc_input(frame, HAND_INPUT, |p| p as f32 / 255.0);
        let shape = vec![1, HAND_INPUT as i64, HAND_INPUT as i64, 3];
        let input =
            Tensor::from_array((shape, input_data)).map_err(|e| InferenceError::new("hand", e))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| InferenceError::new("hand", e))?;

        let (_, presence) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::new("hand", e))?;
        if presence.first().copied().unwrap_or(0.0) < PRESENCE_THRESHOLD {
            return Ok(Vec::new());
        }

        let (_, handedness_score) = outputs[2]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::new("hand", e))?;
        let handedness = if handedness_score.first().copied().unwrap_or(1.0) >= 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        };

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::new("hand", e))?;
        if raw.len() < HAND_LANDMARK_COUNT * 3 {
            return Err(InferenceError::new(
                "hand",
                format!("unexpected landmark tensor length {}", raw.len()),
            ));
        }

        let label = handedness.label();
        let side = HAND_INPUT as f32;
        let points = (0..HAND_LANDMARK_COUNT)
            .map(|i| {
                Landmark::new(
                    format!("{}_HandLandmark_{}", label, i),
                    raw[i * 3] / side,
                    raw[i * 3 + 1] / side,
                    raw[i * 3 + 2] / side,
                )
            })
            .collect();

        Ok(vec![HandLandmarks { handedness, points }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_models_report_no_detections() {
        let frame = RgbImage::new(64, 48);

        assert!(PoseModel::absent().detect(&frame).unwrap().points.is_empty());
        assert!(FaceMeshModel::absent().detect(&frame).unwrap().is_empty());
        assert!(HandModel::absent().detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn missing_model_file_builds_an_absent_wrapper() {
        let mut model = PoseModel::new(
            Path::new("does/not/exist.onnx"),
            DeviceSelection::Cpu,
        )
        .unwrap();
        let frame = RgbImage::new(32, 32);
        assert!(model.detect(&frame).unwrap().points.is_empty());
    }
}
