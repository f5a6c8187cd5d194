//! Project directory handling.
//!
//! ```text
//! <project>/config.json
//! <project>/meta/<image>.json
//! <project>/matches_grouped.json
//! <project>/matches_optimized.json
//! <project>/coords.json
//! ```

use std::path::{Path, PathBuf};

use glob::glob;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::camera_model::{CameraCalibration, CameraModel};
use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::io::{object_from_json, object_to_json};
use crate::matches::{Track, TrackStore};
use crate::types::{Geodetic, IntrinsicsVariant};

pub const CONFIG_FILE: &str = "config.json";
pub const META_DIR: &str = "meta";
pub const MATCHES_GROUPED: &str = "matches_grouped.json";
pub const MATCHES_OPTIMIZED: &str = "matches_optimized.json";
pub const COORDS_FILE: &str = "coords.json";

/// 3-D estimates of one image's keypoints; `None` = invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCoords {
    pub name: String,
    pub coords: Vec<Option<[f64; 3]>>,
}

/// Everything the geometry passes need, passed explicitly.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub dir: PathBuf,
    pub config: ProjectConfig,
    pub images: Vec<Image>,
}

fn ensure_dir(dir: &Path, create: bool) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if !create {
        return Err(Error::InvalidProject(format!(
            "directory doesn't exist: {}",
            dir.display()
        )));
    }
    log::info!("Notice: creating directory: {}", dir.display());
    std::fs::create_dir_all(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Check (or create) the project and meta directories.
pub fn validate_project_dir(dir: &Path, create: bool) -> Result<()> {
    ensure_dir(dir, create)?;
    ensure_dir(&dir.join(META_DIR), create)
}

impl ProjectContext {
    /// Start a new project on disk with the given configuration.
    pub fn create(dir: &Path, config: ProjectConfig) -> Result<ProjectContext> {
        config.validate()?;
        validate_project_dir(dir, true)?;
        let ctx = ProjectContext {
            dir: dir.to_path_buf(),
            config,
            images: Vec::new(),
        };
        ctx.save_config()?;
        Ok(ctx)
    }

    /// Open an existing project: configuration and image metadata.
    pub fn load(dir: &Path) -> Result<ProjectContext> {
        validate_project_dir(dir, false)?;
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.is_file() {
            return Err(Error::InvalidProject(format!(
                "project configuration doesn't exist: {}",
                config_path.display()
            )));
        }
        let config: ProjectConfig = object_from_json(&config_path)?;
        config.validate()?;
        let mut ctx = ProjectContext {
            dir: dir.to_path_buf(),
            config,
            images: Vec::new(),
        };
        ctx.load_images_info()?;
        Ok(ctx)
    }

    pub fn camera(&self) -> &CameraCalibration {
        &self.config.camera
    }

    pub fn save_config(&self) -> Result<()> {
        object_to_json(&self.dir.join(CONFIG_FILE), &self.config)
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.dir.join(META_DIR)
    }

    /// Load every `meta/*.json`, ordered by file name.
    pub fn load_images_info(&mut self) -> Result<()> {
        let pattern = self.meta_dir().join("*.json");
        let pattern = pattern.to_string_lossy();
        let mut paths: Vec<PathBuf> = glob(&pattern)
            .map_err(|e| Error::InvalidProject(format!("bad meta pattern: {}", e)))?
            .filter_map(|p| p.ok())
            .collect();
        paths.sort();
        self.images = paths
            .iter()
            .map(|p| {
                let mut image: Image = object_from_json(p)?;
                image.resolve_size();
                image.normalize_usage();
                Ok(image)
            })
            .collect::<Result<_>>()?;
        log::info!("Loaded {} images", self.images.len());
        Ok(())
    }

    pub fn save_images_info(&self) -> Result<()> {
        validate_project_dir(&self.dir, false)?;
        for image in &self.images {
            object_to_json(&self.meta_dir().join(format!("{}.json", image.name)), image)?;
        }
        Ok(())
    }

    pub fn find_index_by_name(&self, name: &str) -> Option<usize> {
        self.images.iter().position(|i| i.name == name)
    }

    /// Reference origin = centroid of the images' geodetic positions at zero
    /// altitude. Stored in the configuration.
    pub fn compute_ned_reference_lla(&mut self) -> Result<Geodetic> {
        let (lat_sum, lon_sum, count) = self
            .images
            .iter()
            .filter_map(|i| i.aircraft_lla)
            .fold((0.0, 0.0, 0usize), |(lat, lon, c), g| {
                (lat + g.lat_deg, lon + g.lon_deg, c + 1)
            });
        if count == 0 {
            return Err(Error::NoGeodeticPoses);
        }
        let reference = Geodetic {
            lat_deg: lat_sum / count as f64,
            lon_deg: lon_sum / count as f64,
            alt_m: 0.0,
        };
        self.config.ned_reference = Some(reference);
        Ok(reference)
    }

    /// Undistorted pixel for every keypoint of every image.
    pub fn undistort_keypoints(&mut self, variant: IntrinsicsVariant) -> Result<()> {
        let intrinsics = *self.config.camera.intrinsics(variant)?;
        let n = self.images.len() as u64;
        self.images
            .par_iter_mut()
            .progress_count(n)
            .for_each(|image| {
                image.uv_list = intrinsics.undistort_points(&image.keypoints);
            });
        Ok(())
    }

    pub fn has_tracks(&self) -> bool {
        self.dir.join(MATCHES_GROUPED).is_file() && self.dir.join(MATCHES_OPTIMIZED).is_file()
    }

    /// Load both track stores and check them against the images.
    pub fn load_tracks(&self) -> Result<TrackStore> {
        log::info!("Loading matches_grouped...");
        let grouped: Vec<Track> = object_from_json(&self.dir.join(MATCHES_GROUPED))?;
        log::info!("Loading matches_optimized...");
        let optimized: Vec<Track> = object_from_json(&self.dir.join(MATCHES_OPTIMIZED))?;
        let store = TrackStore::new(grouped, optimized);
        store.validate(&self.images)?;
        Ok(store)
    }

    pub fn save_tracks(&self, store: &TrackStore) -> Result<()> {
        log::info!("Writing grouped matches...");
        object_to_json(&self.dir.join(MATCHES_GROUPED), &store.grouped)?;
        log::info!("Writing optimized matches...");
        object_to_json(&self.dir.join(MATCHES_OPTIMIZED), &store.optimized)
    }

    pub fn image_coords(&self) -> Vec<ImageCoords> {
        self.images
            .iter()
            .map(|image| ImageCoords {
                name: image.name.clone(),
                coords: image
                    .coord_list
                    .iter()
                    .map(|c| c.iter().all(|v| v.is_finite()).then(|| [c.x, c.y, c.z]))
                    .collect(),
            })
            .collect()
    }

    pub fn save_coords(&self) -> Result<()> {
        object_to_json(&self.dir.join(COORDS_FILE), &self.image_coords())
    }
}
