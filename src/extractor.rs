use std::path::PathBuf;

use image::RgbImage;

use crate::backend::{DeviceSelection, Rebind};
use crate::config::ModelsConfig;
use crate::error::{InferenceError, SwitchError};
use crate::models::{FaceMeshModel, HandModel, PoseModel};
use crate::overlay;
use crate::types::{FaceLandmarks, FingertipSet, HandLandmarks, PoseLandmarks};

/// Everything one frame yields: the annotated display copy plus the four
/// landmark collections. Empty collections mean "nothing detected", not
/// failure.
pub struct Extraction {
    pub annotated: RgbImage,
    pub pose: PoseLandmarks,
    pub faces: Vec<FaceLandmarks>,
    pub hands: Vec<HandLandmarks>,
    pub fingertips: Vec<FingertipSet>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelPaths {
    pub pose: PathBuf,
    pub face_mesh: PathBuf,
    pub hand: PathBuf,
}

impl From<&ModelsConfig> for ModelPaths {
    fn from(cfg: &ModelsConfig) -> Self {
        Self {
            pose: PathBuf::from(&cfg.pose),
            face_mesh: PathBuf::from(&cfg.face_mesh),
            hand: PathBuf::from(&cfg.hand),
        }
    }
}

/// Owns the three inference models. All detectors run against the same RGB
/// frame, so landmark coordinates are consistent across modalities within a
/// tick. Model instances are replaced only through `rebind`.
pub struct LandmarkExtractor {
    paths: ModelPaths,
    device: DeviceSelection,
    pose: PoseModel,
    face: FaceMeshModel,
    hands: HandModel,
    pub draw_overlay: bool,
}

impl LandmarkExtractor {
    pub fn new(paths: ModelPaths, device: DeviceSelection) -> Result<Self, InferenceError> {
        Ok(Self {
            pose: PoseModel::new(&paths.pose, device)?,
            face: FaceMeshModel::new(&paths.face_mesh, device)?,
            hands: HandModel::new(&paths.hand, device)?,
            paths,
            device,
            draw_overlay: true,
        })
    }

    /// Extractor without any sessions. Every modality reports empty; used by
    /// tests and as an offline dry-run mode.
    pub fn detached() -> Self {
        Self {
            paths: ModelPaths::default(),
            device: DeviceSelection::Cpu,
            pose: PoseModel::absent(),
            face: FaceMeshModel::absent(),
            hands: HandModel::absent(),
            draw_overlay: true,
        }
    }

    pub fn device(&self) -> DeviceSelection {
        self.device
    }

    /// Run all three detectors on `frame`. A failing modality logs and yields
    /// its empty collection; the other modalities' results stand.
    pub fn process(&mut self, frame: &RgbImage) -> Extraction {
        let pose = self.pose.detect(frame).unwrap_or_else(|e| {
            log::warn!("{}", e);
            PoseLandmarks::default()
        });
        let faces = self.face.detect(frame).unwrap_or_else(|e| {
            log::warn!("{}", e);
            Vec::new()
        });
        let hands = self.hands.detect(frame).unwrap_or_else(|e| {
            log::warn!("{}", e);
            Vec::new()
        });

        // Fingertips are a strict subset of the hand sets of this same tick.
        let fingertips: Vec<FingertipSet> = hands.iter().map(FingertipSet::from_hand).collect();

        let mut annotated = frame.clone();
        if self.draw_overlay {
            overlay::draw_pose(&mut annotated, &pose);
            for face in &faces {
                overlay::draw_face_mesh(&mut annotated, face);
            }
            for tips in &fingertips {
                overlay::draw_fingertips(&mut annotated, tips);
            }
        }

        Extraction {
            annotated,
            pose,
            faces,
            hands,
            fingertips,
        }
    }
}

impl Rebind for LandmarkExtractor {
    /// Rebuild all three models on `device`. Builds the replacements first
    /// and swaps only when every build succeeded, so a failed switch leaves
    /// the previous models intact and usable.
    fn rebind(&mut self, device: DeviceSelection) -> Result<(), SwitchError> {
        let rebuild = |e: InferenceError| SwitchError::Rebuild {
            device: device.to_string(),
            reason: e.to_string(),
        };

        let pose = PoseModel::new(&self.paths.pose, device).map_err(rebuild)?;
        let face = FaceMeshModel::new(&self.paths.face_mesh, device).map_err(rebuild)?;
        let hands = HandModel::new(&self.paths.hand, device).map_err(rebuild)?;

        self.pose = pose;
        self.face = face;
        self.hands = hands;
        self.device = device;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scene_yields_empty_collections_without_error() {
        let mut extractor = LandmarkExtractor::detached();
        let frame = RgbImage::new(64, 48);

        let out = extractor.process(&frame);

        assert!(out.pose.points.is_empty());
        assert!(out.faces.is_empty());
        assert!(out.hands.is_empty());
        assert!(out.fingertips.is_empty());
        assert_eq!(out.annotated.dimensions(), (64, 48));
    }

    #[test]
    fn overlay_never_perturbs_the_source_frame() {
        let mut extractor = LandmarkExtractor::detached();
        let frame = RgbImage::from_pixel(32, 32, image::Rgb([7, 8, 9]));
        let before = frame.clone();

        let _ = extractor.process(&frame);

        assert_eq!(frame, before);
    }

    #[test]
    fn rebind_on_missing_model_files_succeeds_as_absent() {
        let mut extractor = LandmarkExtractor::detached();
        extractor
            .rebind(DeviceSelection::Cpu)
            .expect("absent paths rebuild to absent wrappers");
        assert_eq!(extractor.device(), DeviceSelection::Cpu);
    }
}
