use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Which of an image's two poses to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PoseKind {
    /// Navigation / initial estimate.
    Raw,
    /// Bundle-adjusted.
    Optimized,
}

/// Which calibration of the project camera to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IntrinsicsVariant {
    Original,
    Optimized,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    pub lat_deg: f64,
    pub lon_deg: f64,
    #[serde(default)]
    pub alt_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Orientation {
    /// Yaw, pitch, roll in degrees.
    Ypr { ypr_deg: [f64; 3] },
    /// Unit quaternion `[w, x, y, z]`.
    Quaternion { quat: [f64; 4] },
}

/// Camera position in the shared NED frame plus its attitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub ned: na::Vector3<f64>,
    #[serde(flatten)]
    pub orientation: Orientation,
}

impl Pose {
    pub fn from_ypr_deg(ned: na::Vector3<f64>, yaw: f64, pitch: f64, roll: f64) -> Pose {
        Pose {
            ned,
            orientation: Orientation::Ypr {
                ypr_deg: [yaw, pitch, roll],
            },
        }
    }

    pub fn from_quaternion(ned: na::Vector3<f64>, q: &na::UnitQuaternion<f64>) -> Pose {
        Pose {
            ned,
            orientation: Orientation::Quaternion {
                quat: [q.w, q.i, q.j, q.k],
            },
        }
    }

    /// Rotation taking body-frame vectors into NED, `Rz(yaw) * Ry(pitch) * Rx(roll)`.
    pub fn body2ned(&self) -> na::Rotation3<f64> {
        match self.orientation {
            Orientation::Ypr { ypr_deg } => na::Rotation3::from_euler_angles(
                ypr_deg[2].to_radians(),
                ypr_deg[1].to_radians(),
                ypr_deg[0].to_radians(),
            ),
            Orientation::Quaternion { quat } => {
                let q = na::Quaternion::new(quat[0], quat[1], quat[2], quat[3]);
                na::UnitQuaternion::from_quaternion(q).to_rotation_matrix()
            }
        }
    }

    pub fn ypr_deg(&self) -> [f64; 3] {
        match self.orientation {
            Orientation::Ypr { ypr_deg } => ypr_deg,
            Orientation::Quaternion { .. } => {
                let (roll, pitch, yaw) = self.body2ned().euler_angles();
                [yaw.to_degrees(), pitch.to_degrees(), roll.to_degrees()]
            }
        }
    }
}
