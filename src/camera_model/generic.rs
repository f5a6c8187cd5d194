use nalgebra as na;
use rayon::prelude::*;

/// Pixel-level lens model: maps between raw (distorted) pixels and the pixels
/// an ideal linear camera with the same K would produce.
pub trait CameraModel
where
    Self: Sync,
{
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn distort_one(&self, uv: &na::Vector2<f64>) -> na::Vector2<f64>;
    fn undistort_one(&self, uv: &na::Vector2<f64>) -> na::Vector2<f64>;

    fn distort_points(&self, uvs: &[na::Vector2<f64>]) -> Vec<na::Vector2<f64>> {
        uvs.par_iter().map(|uv| self.distort_one(uv)).collect()
    }
    fn undistort_points(&self, uvs: &[na::Vector2<f64>]) -> Vec<na::Vector2<f64>> {
        if uvs.is_empty() {
            return Vec::new();
        }
        uvs.par_iter().map(|uv| self.undistort_one(uv)).collect()
    }
    fn in_image(&self, uv: &na::Vector2<f64>) -> bool {
        uv.x >= 0.0 && uv.x <= self.width() && uv.y >= 0.0 && uv.y <= self.height()
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Regular grid of raw pixel coordinates covering the whole image,
/// `(steps + 1)^2` points, u-major.
pub fn pixel_grid(width: f64, height: f64, steps: usize) -> Vec<na::Vector2<f64>> {
    let u_grid = linspace(0.0, width - 1.0, steps + 1);
    let v_grid = linspace(0.0, height - 1.0, steps + 1);
    u_grid
        .iter()
        .flat_map(|&u| v_grid.iter().map(move |&v| na::Vector2::new(u, v)))
        .collect()
}
