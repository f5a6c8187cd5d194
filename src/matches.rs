use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::Image;

/// One image's view of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<(usize, usize)>", into = "Option<(usize, usize)>")]
pub enum Observation {
    Live { image: usize, feature: usize },
    /// Culled; dropped by the next deletion pass.
    Removed,
}

impl Observation {
    pub fn new(image: usize, feature: usize) -> Observation {
        Observation::Live { image, feature }
    }

    pub fn live(&self) -> Option<(usize, usize)> {
        match *self {
            Observation::Live { image, feature } => Some((image, feature)),
            Observation::Removed => None,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, Observation::Removed)
    }
}

impl From<Option<(usize, usize)>> for Observation {
    fn from(value: Option<(usize, usize)>) -> Self {
        match value {
            Some((image, feature)) => Observation::Live { image, feature },
            None => Observation::Removed,
        }
    }
}

impl From<Observation> for Option<(usize, usize)> {
    fn from(value: Observation) -> Self {
        value.live()
    }
}

/// A multi-view correspondence: a seed NED point and the keypoints that see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub point: na::Vector3<f64>,
    pub observations: Vec<Observation>,
}

impl Track {
    pub fn new(point: na::Vector3<f64>, observations: Vec<Observation>) -> Track {
        Track {
            point,
            observations,
        }
    }

    pub fn live(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.observations.iter().filter_map(|o| o.live())
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    pub fn has_removed(&self) -> bool {
        self.observations.iter().any(|o| o.is_removed())
    }

    /// Seed the point with the mean of the observations' valid 3-D estimates.
    /// Returns false, leaving the point unchanged, when none is valid.
    pub fn seed_from_images(&mut self, images: &[Image]) -> bool {
        let (sum, count) = self
            .live()
            .filter_map(|(img, feat)| images.get(img).and_then(|i| i.valid_coord(feat)))
            .fold((na::Vector3::zeros(), 0usize), |(s, c), p| (s + p, c + 1));
        if count == 0 {
            return false;
        }
        self.point = sum / count as f64;
        true
    }
}

/// Pre- and post-optimization copies of the same track list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackStore {
    pub grouped: Vec<Track>,
    pub optimized: Vec<Track>,
}

impl TrackStore {
    pub fn new(grouped: Vec<Track>, optimized: Vec<Track>) -> TrackStore {
        TrackStore { grouped, optimized }
    }

    /// Reject tracks that reference images or keypoints that do not exist.
    pub fn validate(&self, images: &[Image]) -> Result<()> {
        validate_tracks(&self.grouped, images)?;
        validate_tracks(&self.optimized, images)?;
        if self.grouped.len() != self.optimized.len() {
            log::warn!(
                "grouped and optimized stores differ in length ({} vs {})",
                self.grouped.len(),
                self.optimized.len()
            );
        }
        Ok(())
    }
}

pub fn validate_tracks(tracks: &[Track], images: &[Image]) -> Result<()> {
    for (t, track) in tracks.iter().enumerate() {
        for (o, obs) in track.observations.iter().enumerate() {
            let Some((image, feature)) = obs.live() else {
                continue;
            };
            let ok = images
                .get(image)
                .is_some_and(|img| feature < img.keypoints.len());
            if !ok {
                return Err(Error::ObservationOutOfRange {
                    track: t,
                    observation: o,
                    image,
                    feature,
                });
            }
        }
    }
    Ok(())
}

/// Seed every track from the images' current 3-D estimates. Returns how many
/// tracks were updated.
pub fn seed_track_points(tracks: &mut [Track], images: &[Image]) -> usize {
    tracks
        .iter_mut()
        .map(|t| t.seed_from_images(images))
        .filter(|updated| *updated)
        .count()
}

/// Live observations per image.
pub fn feature_counts(tracks: &[Track], image_count: usize) -> Vec<usize> {
    let mut counts = vec![0; image_count];
    for (img, _) in tracks.iter().flat_map(|t| t.live()) {
        if let Some(c) = counts.get_mut(img) {
            *c += 1;
        }
    }
    counts
}
