use aerial_geometry::interpolate::{LinearInterpolator, delaunay};
use approx::assert_relative_eq;
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn affine(p: &na::Vector2<f64>) -> na::Vector3<f64> {
    na::Vector3::new(2.0 * p.x + 3.0 * p.y + 1.0, -p.x + 0.5 * p.y, 7.0)
}

fn scattered(seed: u64, n: usize) -> Vec<na::Vector2<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pts = vec![
        na::Vector2::new(0.0, 0.0),
        na::Vector2::new(100.0, 0.0),
        na::Vector2::new(100.0, 100.0),
        na::Vector2::new(0.0, 100.0),
    ];
    pts.extend((0..n).map(|_| na::Vector2::new(rng.random_range(0.0..100.0), rng.random_range(0.0..100.0))));
    pts
}

#[test]
fn test_single_triangle() {
    let pts = vec![
        na::Vector2::new(0.0, 0.0),
        na::Vector2::new(1.0, 0.0),
        na::Vector2::new(0.0, 1.0),
    ];
    let tris = delaunay(&pts);
    assert_eq!(tris.len(), 1);
    let mut v = tris[0].to_vec();
    v.sort();
    assert_eq!(v, vec![0, 1, 2]);
}

#[test]
fn test_euler_count_for_points_in_general_position() {
    // square corners plus one interior point: 2n - h - 2 = 4
    let pts = vec![
        na::Vector2::new(0.0, 0.0),
        na::Vector2::new(10.0, 0.0),
        na::Vector2::new(10.0, 10.0),
        na::Vector2::new(0.0, 10.0),
        na::Vector2::new(4.0, 3.0),
    ];
    assert_eq!(delaunay(&pts).len(), 4);
}

#[test]
fn test_reproduces_affine_function() {
    let pts = scattered(7, 200);
    let values: Vec<_> = pts.iter().map(affine).collect();
    let interp = LinearInterpolator::new(&pts, &values).unwrap();
    assert!(interp.triangle_count() > 0);

    let mut rng = ChaCha8Rng::seed_from_u64(99);
    for _ in 0..500 {
        let q = na::Vector2::new(rng.random_range(1.0..99.0), rng.random_range(1.0..99.0));
        let got = interp.interpolate(&q);
        assert_relative_eq!(got, affine(&q), epsilon = 1e-8);
    }
}

#[test]
fn test_sample_points_are_reproduced() {
    let pts = scattered(3, 50);
    let values: Vec<_> = pts.iter().map(affine).collect();
    let interp = LinearInterpolator::new(&pts, &values).unwrap();
    for (p, v) in pts.iter().zip(&values) {
        assert_relative_eq!(interp.interpolate(p), *v, epsilon = 1e-8);
    }
}

#[test]
fn test_regular_grid() {
    let pts: Vec<_> = (0..6)
        .flat_map(|i| (0..6).map(move |j| na::Vector2::new(i as f64 * 20.0, j as f64 * 10.0)))
        .collect();
    let values: Vec<_> = pts.iter().map(affine).collect();
    let interp = LinearInterpolator::new(&pts, &values).unwrap();
    for i in 0..5 {
        for j in 0..5 {
            let q = na::Vector2::new(i as f64 * 20.0 + 7.0, j as f64 * 10.0 + 3.0);
            assert_relative_eq!(interp.interpolate(&q), affine(&q), epsilon = 1e-8);
        }
    }
}

#[test]
fn test_outside_hull_is_nan() {
    let pts = vec![
        na::Vector2::new(0.0, 0.0),
        na::Vector2::new(10.0, 0.0),
        na::Vector2::new(0.0, 10.0),
    ];
    let values: Vec<_> = pts.iter().map(affine).collect();
    let interp = LinearInterpolator::new(&pts, &values).unwrap();
    // inside the bounding box but outside the triangle
    assert!(interp.interpolate(&na::Vector2::new(9.0, 9.0)).x.is_nan());
    assert!(interp.interpolate(&na::Vector2::new(-1.0, 2.0)).x.is_nan());
    assert!(interp.interpolate(&na::Vector2::new(f64::NAN, 2.0)).x.is_nan());
    assert!(!interp.interpolate(&na::Vector2::new(2.0, 2.0)).x.is_nan());
}

#[test]
fn test_degenerate_input() {
    let two = vec![na::Vector2::new(0.0, 0.0), na::Vector2::new(1.0, 1.0)];
    let v2: Vec<_> = two.iter().map(affine).collect();
    assert!(LinearInterpolator::new(&two, &v2).is_none());

    let line: Vec<_> = (0..5).map(|i| na::Vector2::new(i as f64, 2.0 * i as f64)).collect();
    let vl: Vec<_> = line.iter().map(affine).collect();
    assert!(LinearInterpolator::new(&line, &vl).is_none());

    let pts = scattered(1, 3);
    assert!(LinearInterpolator::new(&pts, &[]).is_none());
}

#[test]
fn test_duplicate_samples_are_tolerated() {
    let mut pts = scattered(11, 20);
    pts.push(pts[5]);
    let values: Vec<_> = pts.iter().map(affine).collect();
    let interp = LinearInterpolator::new(&pts, &values).unwrap();
    let q = na::Vector2::new(50.0, 50.0);
    assert_relative_eq!(interp.interpolate(&q), affine(&q), epsilon = 1e-8);
}

#[test]
fn test_dense_grid_has_no_lookup_gaps() {
    let (w, h) = (1919.0, 1079.0);
    let pts: Vec<_> = (0..33)
        .flat_map(|i| (0..33).map(move |j| na::Vector2::new(w * i as f64 / 32.0, h * j as f64 / 32.0)))
        .collect();
    let values: Vec<_> = pts.iter().map(affine).collect();
    let interp = LinearInterpolator::new(&pts, &values).unwrap();
    assert_eq!(interp.triangle_count(), 2 * 32 * 32);

    // includes the corners, sample rows and columns, and many bucket borders
    for i in 0..=320 {
        for j in 0..=64 {
            let q = na::Vector2::new(w * i as f64 / 320.0, h * j as f64 / 64.0);
            assert_relative_eq!(interp.interpolate(&q), affine(&q), epsilon = 1e-6);
        }
    }
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for _ in 0..2000 {
        let q = na::Vector2::new(rng.random_range(0.0..w), rng.random_range(0.0..h));
        assert_relative_eq!(interp.interpolate(&q), affine(&q), epsilon = 1e-6);
    }
}
