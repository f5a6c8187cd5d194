pub mod brown_conrady;
pub mod generic;

pub use brown_conrady::{CameraIntrinsics, DistortionCoeffs, UndistortConfig};
pub use generic::{CameraModel, linspace, pixel_grid};

use crate::error::{Error, Result};
use crate::types::IntrinsicsVariant;
use serde::{Deserialize, Serialize};

/// The project camera: the calibrated intrinsics and, once bundle adjustment
/// has refined them, an optimized variant kept alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    #[serde(flatten)]
    pub original: CameraIntrinsics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized: Option<CameraIntrinsics>,
}

impl CameraCalibration {
    pub fn new(original: CameraIntrinsics) -> CameraCalibration {
        CameraCalibration {
            original,
            optimized: None,
        }
    }

    pub fn intrinsics(&self, variant: IntrinsicsVariant) -> Result<&CameraIntrinsics> {
        match variant {
            IntrinsicsVariant::Original => Ok(&self.original),
            IntrinsicsVariant::Optimized => self
                .optimized
                .as_ref()
                .ok_or(Error::MissingIntrinsics(variant)),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.original.validate()?;
        if let Some(opt) = &self.optimized {
            opt.validate().map_err(|e| format!("optimized intrinsics: {}", e))?;
        }
        Ok(())
    }
}
