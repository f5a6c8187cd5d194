use super::generic::CameraModel;
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Brown-Conrady radial-tangential coefficients, OpenCV ordering
/// `[k1, k2, p1, p2, k3]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistortionCoeffs {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    #[serde(default)]
    pub k3: f64,
}

impl DistortionCoeffs {
    pub fn new(k1: f64, k2: f64, p1: f64, p2: f64, k3: f64) -> DistortionCoeffs {
        DistortionCoeffs { k1, k2, p1, p2, k3 }
    }

    pub fn to_array(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|c| *c == 0.0)
    }

    fn radial(&self, r2: f64) -> f64 {
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6
    }

    fn tangential(&self, x: f64, y: f64, r2: f64) -> (f64, f64) {
        let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (dx, dy)
    }

    /// Apply distortion to a point on the normalized image plane.
    pub fn distort_normalized(&self, xy: &na::Vector2<f64>) -> na::Vector2<f64> {
        let (x, y) = (xy.x, xy.y);
        let r2 = x * x + y * y;
        let l = self.radial(r2);
        let (dx, dy) = self.tangential(x, y, r2);
        na::Vector2::new(l * x + dx, l * y + dy)
    }

    /// Fixed-point inversion of [`Self::distort_normalized`].
    pub fn undistort_normalized(
        &self,
        xy_d: &na::Vector2<f64>,
        config: &UndistortConfig,
    ) -> na::Vector2<f64> {
        let (x0, y0) = (xy_d.x, xy_d.y);
        let (mut x, mut y) = (x0, y0);
        for _ in 0..config.max_iters {
            let r2 = x * x + y * y;
            let icdist = 1.0 / self.radial(r2);
            let (dx, dy) = self.tangential(x, y, r2);
            let x_next = (x0 - dx) * icdist;
            let y_next = (y0 - dy) * icdist;
            let delta = (x_next - x).hypot(y_next - y);
            x = x_next;
            y = y_next;
            if !delta.is_finite() || delta < config.eps {
                break;
            }
        }
        na::Vector2::new(x, y)
    }
}

/// Distortion inversion settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UndistortConfig {
    pub max_iters: usize,
    pub eps: f64,
}

impl Default for UndistortConfig {
    fn default() -> Self {
        Self {
            max_iters: 20,
            eps: 1e-12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub dist: DistortionCoeffs,
    #[serde(default)]
    pub undistort: UndistortConfig,
}

impl CameraIntrinsics {
    pub fn new(
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        width: u32,
        height: u32,
        dist: DistortionCoeffs,
    ) -> CameraIntrinsics {
        CameraIntrinsics {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
            dist,
            undistort: UndistortConfig::default(),
        }
    }

    pub fn k(&self) -> na::Matrix3<f64> {
        na::Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// Closed-form inverse of K (zero skew).
    pub fn k_inv(&self) -> na::Matrix3<f64> {
        na::Matrix3::new(
            1.0 / self.fx,
            0.0,
            -self.cx / self.fx,
            0.0,
            1.0 / self.fy,
            -self.cy / self.fy,
            0.0,
            0.0,
            1.0,
        )
    }

    pub fn pixel_to_normalized(&self, uv: &na::Vector2<f64>) -> na::Vector2<f64> {
        na::Vector2::new((uv.x - self.cx) / self.fx, (uv.y - self.cy) / self.fy)
    }

    pub fn normalized_to_pixel(&self, xy: &na::Vector2<f64>) -> na::Vector2<f64> {
        na::Vector2::new(xy.x * self.fx + self.cx, xy.y * self.fy + self.cy)
    }

    pub fn validate(&self) -> Result<(), String> {
        let finite = [self.fx, self.fy, self.cx, self.cy]
            .iter()
            .chain(self.dist.to_array().iter())
            .all(|v| v.is_finite());
        if !finite {
            return Err("intrinsics contain a non-finite value".to_string());
        }
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(format!("focal lengths must be positive, got ({}, {})", self.fx, self.fy));
        }
        if self.width == 0 || self.height == 0 {
            return Err("image size must be non-zero".to_string());
        }
        if self.undistort.max_iters == 0 {
            return Err("undistort.max_iters must be at least 1".to_string());
        }
        Ok(())
    }
}

impl CameraModel for CameraIntrinsics {
    fn width(&self) -> f64 {
        self.width as f64
    }

    fn height(&self) -> f64 {
        self.height as f64
    }

    fn distort_one(&self, uv: &na::Vector2<f64>) -> na::Vector2<f64> {
        let xy = self.pixel_to_normalized(uv);
        self.normalized_to_pixel(&self.dist.distort_normalized(&xy))
    }

    fn undistort_one(&self, uv: &na::Vector2<f64>) -> na::Vector2<f64> {
        if self.dist.is_zero() {
            return *uv;
        }
        let xy_d = self.pixel_to_normalized(uv);
        self.normalized_to_pixel(&self.dist.undistort_normalized(&xy_d, &self.undistort))
    }
}
