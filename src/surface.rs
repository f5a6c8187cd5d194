//! Ray / ground intersection.

use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Anything that can turn rays cast from a camera into ground points.
///
/// A `NaN` point marks a ray the sampler could not resolve; the caller drops it.
pub trait SurfaceSampler: Sync {
    fn intersect_vectors(
        &self,
        origin_ned: &na::Vector3<f64>,
        vectors: &[na::Vector3<f64>],
    ) -> Result<Vec<na::Vector3<f64>>>;
}

/// Ground model selected by the project configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GroundModel {
    /// Flat ground at `altitude_m` in the NED frame (down = -altitude_m).
    Plane { altitude_m: f64 },
    /// Height field `z = f(x, y)`; row-major `(order + 1)^2` coefficients,
    /// `coeffs[i * (order + 1) + j]` multiplies `x^i y^j`.
    Polynomial { coeffs: Vec<f64> },
}

impl Default for GroundModel {
    fn default() -> Self {
        GroundModel::Plane { altitude_m: 0.0 }
    }
}

impl GroundModel {
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            GroundModel::Plane { altitude_m } if !altitude_m.is_finite() => {
                Err("ground plane altitude must be finite".to_string())
            }
            GroundModel::Plane { .. } => Ok(()),
            GroundModel::Polynomial { coeffs } => {
                let side = (coeffs.len() as f64).sqrt().round() as usize;
                if coeffs.is_empty() || side * side != coeffs.len() {
                    Err(format!(
                        "polynomial ground needs a square number of coefficients, got {}",
                        coeffs.len()
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl SurfaceSampler for GroundModel {
    fn intersect_vectors(
        &self,
        origin_ned: &na::Vector3<f64>,
        vectors: &[na::Vector3<f64>],
    ) -> Result<Vec<na::Vector3<f64>>> {
        match self {
            GroundModel::Plane { altitude_m } => Ok(intersect_vectors_with_ground_plane(
                origin_ned,
                *altitude_m,
                vectors,
            )),
            GroundModel::Polynomial { coeffs } => {
                intersect_vectors_with_poly(origin_ned, coeffs, vectors)
            }
        }
    }
}

/// Intersect one ray with the plane at NED down = `-ground_m`. Rays that do
/// not point toward the ground return the camera position unchanged.
pub fn intersect_vector_with_ground_plane(
    pose_ned: &na::Vector3<f64>,
    ground_m: f64,
    v: &na::Vector3<f64>,
) -> na::Vector3<f64> {
    if v.z <= 0.0 {
        return *pose_ned;
    }
    let d_proj = -(pose_ned.z + ground_m);
    let factor = d_proj / v.z;
    na::Vector3::new(
        pose_ned.x + v.x * factor,
        pose_ned.y + v.y * factor,
        pose_ned.z + d_proj,
    )
}

pub fn intersect_vectors_with_ground_plane(
    pose_ned: &na::Vector3<f64>,
    ground_m: f64,
    vectors: &[na::Vector3<f64>],
) -> Vec<na::Vector3<f64>> {
    vectors
        .iter()
        .map(|v| intersect_vector_with_ground_plane(pose_ned, ground_m, v))
        .collect()
}

/// Evaluate the 2-D polynomial at `(x, y)`.
pub fn polyval2d(x: f64, y: f64, coeffs: &[f64]) -> f64 {
    let order = (coeffs.len() as f64).sqrt() as usize;
    if order == 0 {
        return 0.0;
    }
    coeffs
        .iter()
        .enumerate()
        .map(|(idx, a)| a * x.powi((idx / order) as i32) * y.powi((idx % order) as i32))
        .sum()
}

/// Ray / height-field intersection needs a root finder and a decision on the
/// surface semantics; until then it fails instead of returning wrong geometry.
pub fn intersect_vector_with_poly(
    _pose_ned: &na::Vector3<f64>,
    _coeffs: &[f64],
    _v: &na::Vector3<f64>,
) -> Result<na::Vector3<f64>> {
    Err(Error::NotImplemented("ray intersection with a polynomial ground surface"))
}

pub fn intersect_vectors_with_poly(
    pose_ned: &na::Vector3<f64>,
    coeffs: &[f64],
    vectors: &[na::Vector3<f64>],
) -> Result<Vec<na::Vector3<f64>>> {
    if vectors.is_empty() {
        return Err(Error::NotImplemented("ray intersection with a polynomial ground surface"));
    }
    vectors
        .iter()
        .map(|v| intersect_vector_with_poly(pose_ned, coeffs, v))
        .collect()
}
