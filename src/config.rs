use serde::{Deserialize, Serialize};

use crate::camera_model::{CameraCalibration, CameraIntrinsics, DistortionCoeffs};
use crate::error::{Error, Result};
use crate::fast_projection::FastProjectionConfig;
use crate::surface::GroundModel;
use crate::types::Geodetic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatcherKind {
    #[serde(rename = "FLANN")]
    Flann,
    #[serde(rename = "BF")]
    BruteForce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchFilter {
    Fundamental,
    Homography,
    Essential,
    None,
}

/// Parameters the upstream matcher ran with; recorded with the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MatcherParams {
    pub matcher: MatcherKind,
    pub match_ratio: f64,
    pub filter: MatchFilter,
    pub image_fuzz: f64,
    pub feature_fuzz: f64,
}

impl Default for MatcherParams {
    fn default() -> Self {
        Self {
            matcher: MatcherKind::Flann,
            match_ratio: 0.75,
            filter: MatchFilter::Fundamental,
            image_fuzz: 40.0,
            feature_fuzz: 20.0,
        }
    }
}

impl MatcherParams {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.match_ratio > 0.0 && self.match_ratio <= 1.0) {
            return Err(format!("match-ratio must be in (0, 1], got {}", self.match_ratio));
        }
        if self.image_fuzz < 0.0 || self.feature_fuzz < 0.0 {
            return Err("fuzz values must be non-negative".to_string());
        }
        Ok(())
    }
}

/// Contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub camera: CameraCalibration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ned_reference: Option<Geodetic>,
    #[serde(default)]
    pub matcher: MatcherParams,
    #[serde(default)]
    pub ground: GroundModel,
    #[serde(default)]
    pub fast_projection: FastProjectionConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            camera: CameraCalibration::new(CameraIntrinsics::new(
                1000.0,
                1000.0,
                960.0,
                540.0,
                1920,
                1080,
                DistortionCoeffs::default(),
            )),
            ned_reference: None,
            matcher: MatcherParams::default(),
            ground: GroundModel::default(),
            fast_projection: FastProjectionConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Checks every section; the first problem found is reported.
    pub fn validate(&self) -> Result<()> {
        self.camera
            .validate()
            .and_then(|_| self.matcher.validate())
            .and_then(|_| self.ground.validate())
            .and_then(|_| self.fast_projection.validate())
            .map_err(Error::InvalidConfig)
    }
}
