//! Keypoint → NED projection for whole images.
//!
//! Projecting and intersecting every keypoint is expensive against a real
//! terrain sampler, so each image gets a coarse grid of exact samples and the
//! keypoints are interpolated from it:
//!
//! 1. a regular grid of raw pixels covering the image
//! 2. undistort the grid, dropping points that blow up near the fringes
//! 3. project the grid into NED vectors with the selected pose
//! 4. intersect the vectors with the surface, dropping failed samples
//! 5. triangulate undistorted pixel → NED point
//! 6. interpolate every used keypoint

use indicatif::ParallelProgressIterator;
use nalgebra as na;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::camera_model::{CameraCalibration, CameraIntrinsics, CameraModel, pixel_grid};
use crate::error::{Error, Result};
use crate::image::Image;
use crate::interpolate::LinearInterpolator;
use crate::projection::{cam2body, project_image_vectors, project_vectors};
use crate::surface::{SurfaceSampler, intersect_vectors_with_ground_plane};
use crate::types::{IntrinsicsVariant, PoseKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FastProjectionConfig {
    /// Grid intervals per image axis; the grid has `(grid_steps + 1)^2` samples.
    pub grid_steps: usize,
}

impl Default for FastProjectionConfig {
    fn default() -> Self {
        Self { grid_steps: 32 }
    }
}

impl FastProjectionConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.grid_steps == 0 {
            return Err("fast_projection.grid_steps must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Pose and calibration choice for a projection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionOptions {
    pub pose: PoseKind,
    pub intrinsics: IntrinsicsVariant,
    pub grid: FastProjectionConfig,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            pose: PoseKind::Raw,
            intrinsics: IntrinsicsVariant::Original,
            grid: FastProjectionConfig::default(),
        }
    }
}

/// Per-image outcome of a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProjectionStats {
    pub grid_points: usize,
    pub grid_kept: usize,
    pub projected: usize,
    pub invalid: usize,
}

/// Undistort an image's keypoints if that has not happened yet.
pub fn ensure_undistorted(intrinsics: &CameraIntrinsics, image: &mut Image) {
    if image.uv_list.len() != image.keypoints.len() {
        image.uv_list = intrinsics.undistort_points(&image.keypoints);
    }
}

/// Exact samples for the interpolation grid of one image.
pub fn sample_grid(
    intrinsics: &CameraIntrinsics,
    image: &Image,
    image_idx: usize,
    pose: PoseKind,
    sampler: &dyn SurfaceSampler,
    steps: usize,
) -> Result<(Vec<na::Vector2<f64>>, Vec<na::Vector3<f64>>, usize)> {
    let (w, h) = image.size_or((intrinsics.width, intrinsics.height));
    let (w, h) = (w as f64, h as f64);
    let uv_raw = pixel_grid(w, h, steps);
    let uv_grid = intrinsics.undistort_points(&uv_raw);

    let half_width = w * 0.5;
    let half_height = h * 0.5;
    let uv_filt: Vec<na::Vector2<f64>> = uv_grid
        .iter()
        .zip(&uv_raw)
        .filter_map(|(p, raw)| {
            if p.x < -half_width || p.x > w + half_width {
                log::trace!("{}: rejecting width outlier {:?} ({:?})", image.name, p, raw);
                None
            } else if p.y < -half_height || p.y > h + half_height {
                log::trace!("{}: rejecting height outlier {:?} ({:?})", image.name, p, raw);
                None
            } else {
                Some(*p)
            }
        })
        .collect();
    log::debug!(
        "{}: raw pts: {} undist pts: {}",
        image.name,
        uv_raw.len(),
        uv_filt.len()
    );

    let pose = image.pose(pose, image_idx)?;
    let vec_list = project_vectors(
        &intrinsics.k_inv(),
        pose.body2ned().matrix(),
        &cam2body(),
        &uv_filt,
    );
    let coord_list = sampler.intersect_vectors(&pose.ned, &vec_list)?;

    let (uv_kept, coord_kept): (Vec<_>, Vec<_>) = uv_filt
        .into_iter()
        .zip(coord_list)
        .filter(|(uv, c)| {
            let ok = c.iter().all(|v| !v.is_nan());
            if !ok {
                log::trace!("{}: rejecting ground interpolation fault {:?}", image.name, uv);
            }
            ok
        })
        .unzip();
    Ok((uv_kept, coord_kept, uv_raw.len()))
}

/// Build the interpolator for one image and write its `coord_list`. Unused
/// keypoints, and keypoints the interpolator cannot place, get `NaN`.
pub fn fast_project_image(
    intrinsics: &CameraIntrinsics,
    image: &mut Image,
    image_idx: usize,
    pose: PoseKind,
    sampler: &dyn SurfaceSampler,
    steps: usize,
) -> Result<ImageProjectionStats> {
    ensure_undistorted(intrinsics, image);
    image.normalize_usage();
    let (uv_kept, coord_kept, grid_points) =
        sample_grid(intrinsics, image, image_idx, pose, sampler, steps)?;
    let grid_kept = uv_kept.len();
    let interp = LinearInterpolator::new(&uv_kept, &coord_kept).ok_or(
        Error::InsufficientSamples {
            image: image_idx,
            count: grid_kept,
        },
    )?;

    let nan = na::Vector3::repeat(f64::NAN);
    let mut invalid = 0;
    let coord_list: Vec<na::Vector3<f64>> = image
        .uv_list
        .iter()
        .zip(&image.kp_used)
        .enumerate()
        .map(|(i, (uv, used))| {
            if !used {
                return nan;
            }
            let coord = interp.interpolate(uv);
            if coord.x.is_nan() {
                log::warn!(
                    "{}: keypoint {} at {:?} (raw {:?}) falls outside the projection grid",
                    image.name,
                    i,
                    uv,
                    image.keypoints[i]
                );
                invalid += 1;
            }
            coord
        })
        .collect();
    let projected = image.kp_used.iter().filter(|u| **u).count() - invalid;
    image.coord_list = coord_list;
    Ok(ImageProjectionStats {
        grid_points,
        grid_kept,
        projected,
        invalid,
    })
}

/// Fast projection for every image, in parallel. One result per image; a
/// failed image keeps its previous `coord_list`.
pub fn fast_project_keypoints_to_3d(
    camera: &CameraCalibration,
    images: &mut [Image],
    sampler: &dyn SurfaceSampler,
    options: &ProjectionOptions,
) -> Result<Vec<Result<ImageProjectionStats>>> {
    let intrinsics = camera.intrinsics(options.intrinsics)?;
    let n = images.len() as u64;
    let results: Vec<Result<ImageProjectionStats>> = images
        .par_iter_mut()
        .enumerate()
        .progress_count(n)
        .map(|(idx, image)| {
            fast_project_image(intrinsics, image, idx, options.pose, sampler, options.grid.grid_steps)
        })
        .collect();
    for (image, result) in images.iter().zip(&results) {
        if let Err(e) = result {
            log::warn!("{}: fast projection failed: {}", image.name, e);
        }
    }
    Ok(results)
}

/// Exact projection of every undistorted keypoint onto a flat ground plane.
pub fn project_keypoints_to_ground(
    camera: &CameraCalibration,
    images: &mut [Image],
    ground_m: f64,
    options: &ProjectionOptions,
) -> Result<()> {
    let intrinsics = camera.intrinsics(options.intrinsics)?;
    let n = images.len() as u64;
    images
        .par_iter_mut()
        .enumerate()
        .progress_count(n)
        .try_for_each(|(idx, image)| {
            ensure_undistorted(intrinsics, image);
            let vec_list = project_image_vectors(intrinsics, image, options.pose, idx)?;
            let pose = image.pose(options.pose, idx)?;
            image.coord_list = intersect_vectors_with_ground_plane(&pose.ned, ground_m, &vec_list);
            Ok(())
        })
}
