//! Image-pair view of the track list.

use crate::error::{Error, Result};
use crate::image::Image;
use crate::matches::Track;

/// One correspondence between image `i` and image `j`, taken from a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairMatch {
    pub feature_a: usize,
    pub feature_b: usize,
    pub track: usize,
}

/// N×N grid of pair correspondences. Built on demand from the tracks, never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGraph {
    cells: Vec<Vec<Vec<PairMatch>>>,
}

impl MatchGraph {
    pub fn empty(image_count: usize) -> MatchGraph {
        MatchGraph {
            cells: vec![vec![Vec::new(); image_count]; image_count],
        }
    }

    pub fn image_count(&self) -> usize {
        self.cells.len()
    }

    /// Correspondences from image `i` to image `j`.
    ///
    /// # Panics
    /// If `i` or `j` is not below [`MatchGraph::image_count`]; see
    /// [`MatchGraph::get`] for the checked form.
    pub fn pairs(&self, i: usize, j: usize) -> &[PairMatch] {
        &self.cells[i][j]
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&[PairMatch]> {
        self.cells.get(i)?.get(j).map(Vec::as_slice)
    }

    /// Non-empty cells as `(i, j, matches)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &[PairMatch])> {
        self.cells.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, cell)| !cell.is_empty())
                .map(move |(j, cell)| (i, j, cell.as_slice()))
        })
    }
}

/// Every ordered pair of distinct live observations of a track lands in
/// `cell(image_a, image_b)`, so both directions are populated.
pub fn generate_match_pairs(tracks: &[Track], image_count: usize) -> Result<MatchGraph> {
    let mut graph = MatchGraph::empty(image_count);
    for (k, track) in tracks.iter().enumerate() {
        for (o1, p1) in track.observations.iter().enumerate() {
            let Some((i, feat_a)) = p1.live() else {
                continue;
            };
            if i >= image_count {
                return Err(Error::ObservationOutOfRange {
                    track: k,
                    observation: o1,
                    image: i,
                    feature: feat_a,
                });
            }
            for p2 in &track.observations {
                let Some((j, feat_b)) = p2.live() else {
                    continue;
                };
                if p1 == p2 || j >= image_count {
                    continue;
                }
                graph.cells[i][j].push(PairMatch {
                    feature_a: feat_a,
                    feature_b: feat_b,
                    track: k,
                });
            }
        }
    }
    Ok(graph)
}

/// Where keypoint usage comes from.
#[derive(Debug, Clone, Copy)]
pub enum UsageSource<'a> {
    /// Every keypoint is used, e.g. before any matching exists.
    All,
    Tracks(&'a [Track]),
    Graph(&'a MatchGraph),
}

/// Rebuild each image's `kp_used` mask.
pub fn compute_keypoint_usage(images: &mut [Image], source: UsageSource<'_>) -> Result<()> {
    log::info!("Determining feature usage in matching pairs...");
    for image in images.iter_mut() {
        let all = matches!(source, UsageSource::All);
        image.kp_used = vec![all; image.keypoints.len()];
    }
    let mut mark = |image: usize, feature: usize| -> bool {
        match images
            .get_mut(image)
            .and_then(|img| img.kp_used.get_mut(feature))
        {
            Some(used) => {
                *used = true;
                true
            }
            None => false,
        }
    };
    match source {
        UsageSource::All => {}
        UsageSource::Tracks(tracks) => {
            for (t, track) in tracks.iter().enumerate() {
                for (o, ob) in track.observations.iter().enumerate() {
                    let Some((image, feature)) = ob.live() else {
                        continue;
                    };
                    if !mark(image, feature) {
                        return Err(Error::ObservationOutOfRange {
                            track: t,
                            observation: o,
                            image,
                            feature,
                        });
                    }
                }
            }
        }
        UsageSource::Graph(graph) => {
            for (i, j, pairs) in graph.iter() {
                for pair in pairs {
                    for (image, feature) in [(i, pair.feature_a), (j, pair.feature_b)] {
                        if !mark(image, feature) {
                            return Err(Error::PairOutOfRange {
                                track: pair.track,
                                image,
                                feature,
                            });
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Connected components of the image graph (images linked by at least one
/// correspondence), largest first, ties broken by smallest member. Images with
/// no correspondence are left out.
pub fn connected_groups(graph: &MatchGraph) -> Vec<Vec<usize>> {
    let n = graph.image_count();
    let mut parent: Vec<usize> = (0..n).collect();
    let mut linked = vec![false; n];
    for (i, j, _) in graph.iter() {
        linked[i] = true;
        linked[j] = true;
        let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
        if ri != rj {
            parent[ri.max(rj)] = ri.min(rj);
        }
    }
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut root_to_group = vec![usize::MAX; n];
    for img in (0..n).filter(|i| linked[*i]) {
        let root = find(&mut parent, img);
        if root_to_group[root] == usize::MAX {
            root_to_group[root] = groups.len();
            groups.push(Vec::new());
        }
        groups[root_to_group[root]].push(img);
    }
    groups.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));
    groups
}

/// Groups straight from a track list.
pub fn image_groups(tracks: &[Track], image_count: usize) -> Result<Vec<Vec<usize>>> {
    let graph = generate_match_pairs(tracks, image_count)?;
    Ok(connected_groups(&graph))
}
