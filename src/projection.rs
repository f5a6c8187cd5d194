//! Pixel ↔ NED ray geometry.
//!
//! The lens frame has x right, y down and z along the optical axis. At zero
//! roll/pitch/yaw the camera looks along the body's forward axis, so a nadir
//! image carries a pitch of -90°.

use nalgebra as na;
use rayon::prelude::*;

use crate::camera_model::{CameraIntrinsics, CameraModel};
use crate::error::Result;
use crate::image::Image;
use crate::types::{PoseKind, Pose};

/// Maps the lens frame into the vehicle body frame: a +90° pitch followed by a
/// +90° roll.
pub fn cam2body() -> na::Matrix3<f64> {
    na::Matrix3::new(0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
}

/// Unit NED direction vectors through each undistorted pixel.
pub fn project_vectors(
    k_inv: &na::Matrix3<f64>,
    body2ned: &na::Matrix3<f64>,
    cam2body: &na::Matrix3<f64>,
    uv_list: &[na::Vector2<f64>],
) -> Vec<na::Vector3<f64>> {
    let m = body2ned * cam2body * k_inv;
    uv_list
        .iter()
        .map(|uv| (m * na::Vector3::new(uv.x, uv.y, 1.0)).normalize())
        .collect()
}

/// Project the undistorted keypoints of an image with its selected pose.
pub fn project_image_vectors(
    intrinsics: &CameraIntrinsics,
    image: &Image,
    kind: PoseKind,
    image_idx: usize,
) -> Result<Vec<na::Vector3<f64>>> {
    let pose = image.pose(kind, image_idx)?;
    Ok(project_vectors(
        &intrinsics.k_inv(),
        pose.body2ned().matrix(),
        &cam2body(),
        &image.uv_list,
    ))
}

/// Reproject an NED point into a raw (distorted) pixel. `None` when the point
/// lies behind the camera.
pub fn project_point(
    intrinsics: &CameraIntrinsics,
    pose: &Pose,
    point: &na::Vector3<f64>,
) -> Option<na::Vector2<f64>> {
    let ned2cam = cam2body().transpose() * pose.body2ned().matrix().transpose();
    let p_cam = ned2cam * (point - pose.ned);
    if p_cam.z <= 0.0 {
        return None;
    }
    let undistorted = intrinsics.normalized_to_pixel(&na::Vector2::new(
        p_cam.x / p_cam.z,
        p_cam.y / p_cam.z,
    ));
    Some(intrinsics.distort_one(&undistorted))
}

/// Reproject many points into one image, in parallel.
pub fn project_points(
    intrinsics: &CameraIntrinsics,
    pose: &Pose,
    points: &[na::Vector3<f64>],
) -> Vec<Option<na::Vector2<f64>>> {
    points
        .par_iter()
        .map(|p| project_point(intrinsics, pose, p))
        .collect()
}
