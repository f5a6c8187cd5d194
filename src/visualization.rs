use std::path::Path;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::{RecordingStream, RecordingStreamResult};

use crate::culling::ScoreEntry;
use crate::image::Image;
use crate::matches::Track;
use crate::types::PoseKind;

pub fn create_recording(name: &str, path: &Path) -> RecordingStreamResult<RecordingStream> {
    rerun::RecordingStreamBuilder::new(name).save(path)
}

/// Stable pseudo-random color per id.
pub fn id_to_color(id: usize) -> rerun::Color {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    rerun::Color::from_rgb(
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
    )
}

/// `t` = 0 worst, 1 best.
pub fn severity_color(t: f64) -> rerun::Color {
    let c = colorous::TURBO.eval_continuous(1.0 - t.clamp(0.0, 1.0));
    rerun::Color::from_rgb(c.r, c.g, c.b)
}

fn to_f32(v: &nalgebra::Vector3<f64>) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

/// Camera positions of every image that has the requested pose.
pub fn log_cameras(recording: &RecordingStream, images: &[Image], pose: PoseKind) -> RecordingStreamResult<()> {
    let (pts, colors_labels): (Vec<_>, Vec<_>) = images
        .iter()
        .enumerate()
        .filter_map(|(i, img)| {
            img.pose(pose, i)
                .ok()
                .map(|p| (to_f32(&p.ned), (id_to_color(i), img.name.clone())))
        })
        .unzip();
    let (colors, labels): (Vec<_>, Vec<_>) = colors_labels.into_iter().unzip();
    recording.log_static(
        "cameras",
        &rerun::Points3D::new(pts)
            .with_colors(colors)
            .with_labels(labels)
            .with_radii([rerun::Radius::new_ui_points(4.0)]),
    )
}

/// One review candidate: its point, the rays from the observing cameras, on
/// the `review` timeline at `step`.
pub fn log_candidate(
    recording: &RecordingStream,
    step: usize,
    total: usize,
    entry: &ScoreEntry,
    track: &Track,
    images: &[Image],
    pose: PoseKind,
) -> RecordingStreamResult<()> {
    recording.set_time("review", rerun::TimeCell::from_sequence(step as i64));
    let color = severity_color(step as f64 / total.max(1) as f64);
    let point = to_f32(&track.point);
    recording.log(
        "candidate/point",
        &rerun::Points3D::new([point])
            .with_colors([color])
            .with_labels([format!("track {} score {:.4}", entry.track, entry.score)])
            .with_radii([rerun::Radius::new_ui_points(8.0)]),
    )?;
    let strips: Vec<Vec<[f32; 3]>> = track
        .live()
        .filter_map(|(img, _)| images.get(img).and_then(|i| i.pose(pose, img).ok()))
        .map(|p| vec![to_f32(&p.ned), point])
        .collect();
    recording.log(
        "candidate/rays",
        &rerun::LineStrips3D::new(strips).with_colors([color]),
    )
}
