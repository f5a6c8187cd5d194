//! Outlier scoring and removal for track stores.
//!
//! Two scores are available:
//! - movers: how far a track's point moved during bundle adjustment;
//! - shakers: how colocated a track's observing cameras are relative to the
//!   feature distance (small angle = unstable triangulation).
//!
//! Marking replaces observations with [`Observation::Removed`]; nothing is
//! dropped until [`delete_marked_matches`] runs.

use std::collections::HashSet;

use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::matches::{Observation, Track, feature_counts};
use crate::types::PoseKind;

/// Default cut for the shaker angle, radians.
pub const DEFAULT_MAX_SHAKER_ANGLE: f64 = 0.07;

/// A scored `(track, observation)` candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: f64,
    pub track: usize,
    pub observation: usize,
}

impl ScoreEntry {
    pub fn mark_ref(&self) -> MarkRef {
        MarkRef {
            track: self.track,
            observation: self.observation,
        }
    }
}

/// Address of one observation inside a track store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkRef {
    pub track: usize,
    pub observation: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeletionMode {
    /// Drop only the removed observations; drop the track once fewer than two
    /// remain.
    #[default]
    Default,
    /// Drop the whole track as soon as any of its observations was removed.
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeletionSummary {
    pub observations_removed: usize,
    pub tracks_removed: usize,
}

/// Mean and population standard deviation of a score list sorted from largest
/// to smallest. The mean is accumulated from the tail so small values are summed
/// first.
pub fn score_stats(entries: &[ScoreEntry]) -> Option<(f64, f64)> {
    if entries.is_empty() {
        return None;
    }
    let count = entries.len() as f64;
    let sum: f64 = entries.iter().rev().fold(0.0, |acc, e| acc + e.score);
    let mean = sum / count;
    let stddev_sum: f64 = entries
        .iter()
        .fold(0.0, |acc, e| acc + (mean - e.score) * (mean - e.score));
    Some((mean, (stddev_sum / count).sqrt()))
}

/// Distance each track's point moved between the grouped and the optimized
/// store, worst first.
pub fn compute_movers(grouped: &[Track], optimized: &[Track]) -> Vec<ScoreEntry> {
    log::info!("Computing movers...");
    let mut result: Vec<ScoreEntry> = grouped
        .iter()
        .zip(optimized)
        .enumerate()
        .map(|(i, (g, o))| ScoreEntry {
            score: (g.point - o.point).norm(),
            track: i,
            observation: 0,
        })
        .collect();
    result.sort_by(|a, b| b.score.total_cmp(&a.score));
    result
}

/// Camera-spread angle for every track seen from `group`, smallest (worst)
/// first. Observations outside the group are ignored; tracks with none inside
/// are skipped.
pub fn compute_shakers(
    tracks: &[Track],
    images: &[Image],
    group: &[usize],
    pose: PoseKind,
) -> Result<Vec<ScoreEntry>> {
    log::info!("Computing shakers...");
    let in_group: HashSet<usize> = group.iter().copied().collect();
    let mut result = Vec::new();
    for (i, track) in tracks.iter().enumerate() {
        let cams: Vec<na::Vector3<f64>> = track
            .live()
            .filter(|(img, _)| in_group.contains(img))
            .map(|(img, feat)| {
                images
                    .get(img)
                    .ok_or(Error::ObservationOutOfRange {
                        track: i,
                        observation: 0,
                        image: img,
                        feature: feat,
                    })
                    .and_then(|image| image.pose(pose, img))
                    .map(|p| p.ned)
            })
            .collect::<Result<_>>()?;
        if cams.is_empty() {
            continue;
        }
        let avg = cams.iter().sum::<na::Vector3<f64>>() / cams.len() as f64;
        let baseline = (track.point - avg).norm();
        let spread = cams.iter().map(|c| (avg - c).norm()).sum::<f64>() / cams.len() as f64;
        let angle = spread.atan2(baseline);
        log::trace!("track {} angle: {:.3} deg", i, angle.to_degrees());
        result.push(ScoreEntry {
            score: angle,
            track: i,
            observation: 0,
        });
    }
    result.sort_by(|a, b| a.score.total_cmp(&b.score));
    Ok(result)
}

/// Entries scoring above `mean + trim_stddev * stddev`.
pub fn select_outliers(entries: &[ScoreEntry], trim_stddev: f64) -> Vec<MarkRef> {
    let Some((mean, stddev)) = score_stats(entries) else {
        return Vec::new();
    };
    log::info!("mre = {:.4} stddev = {:.4}", mean, stddev);
    let cut = mean + stddev * trim_stddev;
    entries
        .iter()
        .filter(|e| e.score > cut)
        .map(|e| e.mark_ref())
        .collect()
}

/// Entries scoring below `max_score`; used with the ascending shaker list.
pub fn select_below(entries: &[ScoreEntry], max_score: f64) -> Vec<MarkRef> {
    entries
        .iter()
        .filter(|e| e.score < max_score)
        .map(|e| e.mark_ref())
        .collect()
}

/// Mark the statistical outliers of `entries` in `tracks`. Returns how many
/// were marked.
pub fn mark_outliers(entries: &[ScoreEntry], trim_stddev: f64, tracks: &mut [Track]) -> Result<usize> {
    log::info!("Marking outliers...");
    let marks = select_outliers(entries, trim_stddev);
    mark_using_list(&marks, &mut [tracks])
}

fn observation_mut<'a>(tracks: &'a mut [Track], mark: &MarkRef) -> Result<&'a mut Observation> {
    tracks
        .get_mut(mark.track)
        .and_then(|t| t.observations.get_mut(mark.observation))
        .ok_or(Error::MarkOutOfRange {
            track: mark.track,
            observation: mark.observation,
        })
}

/// Apply the same cull decision to every store. All marks are checked before
/// any store is touched. Returns how many live observations of the first
/// store were newly removed; duplicate marks and marks on already removed
/// observations are not counted.
pub fn mark_using_list(marks: &[MarkRef], stores: &mut [&mut [Track]]) -> Result<usize> {
    for store in stores.iter_mut() {
        for m in marks {
            observation_mut(store, m)?;
        }
    }
    let mut removed = 0;
    for (s, store) in stores.iter_mut().enumerate() {
        for m in marks {
            let obs = observation_mut(store, m)?;
            if s == 0 && !obs.is_removed() {
                removed += 1;
            }
            *obs = Observation::Removed;
        }
    }
    Ok(removed)
}

/// Undo a mark. The original observation has to be supplied since marking
/// overwrites it.
pub fn unmark(tracks: &mut [Track], mark: &MarkRef, original: Observation) -> Result<()> {
    *observation_mut(tracks, mark)? = original;
    Ok(())
}

/// Drop removed observations, and tracks that no longer qualify. Running it
/// again without new marks changes nothing.
pub fn delete_marked_matches(tracks: &mut Vec<Track>, mode: DeletionMode) -> DeletionSummary {
    log::info!("Deleting marked items...");
    let mut summary = DeletionSummary::default();
    tracks.retain_mut(|track| {
        let before = track.observations.len();
        track.observations.retain(|o| !o.is_removed());
        let removed = before - track.observations.len();
        summary.observations_removed += removed;
        let keep = if mode == DeletionMode::Strong && removed > 0 {
            log::debug!("deleting entire match that contains a bad element");
            false
        } else if track.observations.len() < 2 {
            log::debug!("deleting match that is now in less than 2 images");
            false
        } else {
            true
        };
        if !keep {
            summary.tracks_removed += 1;
        }
        keep
    });
    summary
}

/// Mark every observation that lands in an image with fewer than
/// `min_features` (but more than zero) live observations. Counts come from the
/// first store; every store is marked. Returns the number of observations
/// marked in the first store.
pub fn purge_weak_images(stores: &mut [&mut [Track]], image_count: usize, min_features: usize) -> usize {
    let Some(first) = stores.first() else {
        return 0;
    };
    let counts = feature_counts(first, image_count);
    let weak: HashSet<usize> = counts
        .iter()
        .enumerate()
        .filter(|(_, c)| **c > 0 && **c < min_features)
        .map(|(i, _)| i)
        .collect();
    if weak.is_empty() {
        return 0;
    }
    log::info!("weak images: {:?}", weak);
    let mut marked = Vec::with_capacity(stores.len());
    for store in stores.iter_mut() {
        let mut n = 0;
        for obs in store.iter_mut().flat_map(|t| t.observations.iter_mut()) {
            if obs.live().is_some_and(|(img, _)| weak.contains(&img)) {
                *obs = Observation::Removed;
                n += 1;
            }
        }
        marked.push(n);
    }
    marked[0]
}
