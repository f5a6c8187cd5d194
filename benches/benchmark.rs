use aerial_geometry::camera_model::{CameraCalibration, CameraIntrinsics, DistortionCoeffs};
use aerial_geometry::fast_projection::{ProjectionOptions, fast_project_keypoints_to_3d};
use aerial_geometry::image::Image;
use aerial_geometry::interpolate::LinearInterpolator;
use aerial_geometry::match_graph::generate_match_pairs;
use aerial_geometry::matches::{Observation, Track};
use aerial_geometry::surface::GroundModel;
use aerial_geometry::types::Pose;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn calibration() -> CameraCalibration {
    CameraCalibration::new(CameraIntrinsics::new(
        1000.0,
        1000.0,
        960.0,
        540.0,
        1920,
        1080,
        DistortionCoeffs::new(-0.05, 0.01, 0.0005, -0.0003, 0.0),
    ))
}

fn bench_fast_projection(c: &mut Criterion) {
    let camera = calibration();
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let keypoints: Vec<_> = (0..5000)
        .map(|_| na::Vector2::new(rng.random_range(0.0..1920.0), rng.random_range(0.0..1080.0)))
        .collect();
    let pose = Pose::from_ypr_deg(na::Vector3::new(0.0, 0.0, -100.0), 10.0, -85.0, 1.0);
    let mut image = Image::new("bench", pose, keypoints);
    image.kp_used = vec![true; image.keypoints.len()];
    let mut images = vec![image; 4];
    let ground = GroundModel::default();
    let options = ProjectionOptions::default();

    c.bench_function("fast_project_keypoints_to_3d", |b| {
        b.iter(|| fast_project_keypoints_to_3d(&camera, black_box(&mut images), &ground, &options))
    });
}

fn bench_interpolator(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let pts: Vec<_> = (0..1089)
        .map(|_| na::Vector2::new(rng.random_range(0.0..1920.0), rng.random_range(0.0..1080.0)))
        .collect();
    let values: Vec<_> = pts.iter().map(|p| na::Vector3::new(p.x, p.y, 0.0)).collect();

    c.bench_function("linear_interpolator_build", |b| {
        b.iter(|| LinearInterpolator::new(black_box(&pts), black_box(&values)))
    });
}

fn bench_match_pairs(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let tracks: Vec<Track> = (0..20000)
        .map(|i| {
            let n = rng.random_range(2..6);
            let observations = (0..n)
                .map(|_| Observation::new(rng.random_range(0..50), i))
                .collect();
            Track::new(na::Vector3::zeros(), observations)
        })
        .collect();

    c.bench_function("generate_match_pairs", |b| {
        b.iter(|| generate_match_pairs(black_box(&tracks), 50))
    });
}

criterion_group!(benches, bench_fast_projection, bench_interpolator, bench_match_pairs);
criterion_main!(benches);
