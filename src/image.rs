use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Geodetic, Pose, PoseKind};

/// One aerial image: its keypoints and everything derived from them.
///
/// `keypoints`, `kp_used`, `uv_list` and `coord_list` are parallel arrays once
/// the project has been prepared. Only the keypoints, the usage mask and the
/// poses are persisted; the rest is recomputed on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Path of the source image file, used to read the size when it is not
    /// recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft_lla: Option<Geodetic>,
    pub camera_pose: Pose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_pose_sba: Option<Pose>,
    #[serde(default)]
    pub keypoints: Vec<na::Vector2<f64>>,
    #[serde(default)]
    pub kp_used: Vec<bool>,
    #[serde(skip)]
    pub uv_list: Vec<na::Vector2<f64>>,
    #[serde(skip)]
    pub coord_list: Vec<na::Vector3<f64>>,
}

impl Image {
    pub fn new(name: &str, camera_pose: Pose, keypoints: Vec<na::Vector2<f64>>) -> Image {
        let kp_used = vec![false; keypoints.len()];
        Image {
            name: name.to_string(),
            width: None,
            height: None,
            source: None,
            aircraft_lla: None,
            camera_pose,
            camera_pose_sba: None,
            keypoints,
            kp_used,
            uv_list: Vec::new(),
            coord_list: Vec::new(),
        }
    }

    pub fn pose(&self, kind: PoseKind, image_idx: usize) -> Result<&Pose> {
        match kind {
            PoseKind::Raw => Ok(&self.camera_pose),
            PoseKind::Optimized => self.camera_pose_sba.as_ref().ok_or(Error::MissingPose {
                image: image_idx,
                kind,
            }),
        }
    }

    /// Image size, falling back to the camera's calibrated size.
    pub fn size_or(&self, default_w_h: (u32, u32)) -> (u32, u32) {
        (
            self.width.unwrap_or(default_w_h.0),
            self.height.unwrap_or(default_w_h.1),
        )
    }

    /// Fill in a missing size from the source image header.
    pub fn resolve_size(&mut self) {
        if self.width.is_some() && self.height.is_some() {
            return;
        }
        let Some(source) = &self.source else {
            return;
        };
        match ::image::image_dimensions(source) {
            Ok((w, h)) => {
                self.width = Some(w);
                self.height = Some(h);
            }
            Err(e) => log::warn!("{}: cannot read size from {}: {}", self.name, source, e),
        }
    }

    /// Keep the usage mask parallel to the keypoints.
    pub fn normalize_usage(&mut self) {
        if self.kp_used.len() != self.keypoints.len() {
            self.kp_used.resize(self.keypoints.len(), false);
        }
    }

    pub fn valid_coord(&self, feature: usize) -> Option<na::Vector3<f64>> {
        self.coord_list
            .get(feature)
            .filter(|c| c.iter().all(|v| v.is_finite()))
            .copied()
    }
}
