use std::path::PathBuf;

use aerial_geometry::camera_model::{CameraModel, DistortionCoeffs};
use aerial_geometry::config::ProjectConfig;
use aerial_geometry::image::Image;
use aerial_geometry::matches::{Observation, Track, TrackStore};
use aerial_geometry::project::ProjectContext;
use aerial_geometry::projection::project_point;
use aerial_geometry::types::{Geodetic, Pose};
use clap::Parser;
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Parser)]
#[command(author, version, about = "Generate a synthetic nadir survey project", long_about = None)]
struct Args {
    /// Output project directory
    #[arg(short, long)]
    output: PathBuf,

    /// Number of images, flown as a lawnmower grid
    #[arg(long, default_value_t = 16)]
    images: usize,

    /// Number of ground points
    #[arg(long, default_value_t = 2000)]
    points: usize,

    /// Number of tracks whose grouped point is displaced far from the truth
    #[arg(long, default_value_t = 20)]
    outliers: usize,

    /// Flight altitude above ground in meters
    #[arg(long, default_value_t = 100.0)]
    altitude: f64,

    /// Spacing between neighbouring exposures in meters
    #[arg(long, default_value_t = 40.0)]
    spacing: f64,

    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    if args.altitude <= 0.0 || args.spacing <= 0.0 {
        return Err("altitude and spacing must be positive".into());
    }
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let mut config = ProjectConfig::default();
    config.camera.original.dist = DistortionCoeffs::new(-0.05, 0.01, 0.0005, -0.0003, 0.0);
    let intrinsics = config.camera.original;
    let mut ctx = ProjectContext::create(&args.output, config)?;

    // exposures
    let cols = (args.images as f64).sqrt().ceil().max(1.0) as usize;
    let truth: Vec<Pose> = (0..args.images)
        .map(|i| {
            let (row, col) = (i / cols, i % cols);
            let ned = na::Vector3::new(
                row as f64 * args.spacing + rng.random_range(-2.0..2.0),
                col as f64 * args.spacing + rng.random_range(-2.0..2.0),
                -args.altitude + rng.random_range(-1.0..1.0),
            );
            let yaw = rng.random_range(-5.0..5.0);
            let roll = rng.random_range(-1.0..1.0);
            Pose::from_ypr_deg(ned, yaw, -90.0 + rng.random_range(-1.0..1.0), roll)
        })
        .collect();

    // ground points on the plane, spread over the flown area plus a margin
    let rows = args.images.div_ceil(cols);
    let margin = args.altitude * 0.5;
    let n_max = (rows.max(1) - 1) as f64 * args.spacing + margin;
    let e_max = (cols - 1) as f64 * args.spacing + margin;
    let ground: Vec<na::Vector3<f64>> = (0..args.points)
        .map(|_| {
            na::Vector3::new(
                rng.random_range(-margin..n_max),
                rng.random_range(-margin..e_max),
                0.0,
            )
        })
        .collect();

    let mut images: Vec<Image> = truth
        .iter()
        .enumerate()
        .map(|(i, pose)| {
            let raw_ned = pose.ned
                + na::Vector3::new(
                    rng.random_range(-3.0..3.0),
                    rng.random_range(-3.0..3.0),
                    rng.random_range(-2.0..2.0),
                );
            let [yaw, pitch, roll] = pose.ypr_deg();
            let raw = Pose::from_ypr_deg(raw_ned, yaw + rng.random_range(-0.5..0.5), pitch, roll);
            let mut image = Image::new(&format!("img_{:04}", i), raw, Vec::new());
            image.camera_pose_sba = Some(*pose);
            image.width = Some(intrinsics.width);
            image.height = Some(intrinsics.height);
            let lat = 45.0 + pose.ned.x / METERS_PER_DEGREE;
            let lon = -93.0 + pose.ned.y / (METERS_PER_DEGREE * 45f64.to_radians().cos());
            image.aircraft_lla = Some(Geodetic {
                lat_deg: lat,
                lon_deg: lon,
                alt_m: -pose.ned.z,
            });
            image
        })
        .collect();

    // observations
    let mut store = TrackStore::default();
    for point in &ground {
        let mut observations = Vec::new();
        for (i, pose) in truth.iter().enumerate() {
            let Some(uv) = project_point(&intrinsics, pose, point) else {
                continue;
            };
            if !intrinsics.in_image(&uv) {
                continue;
            }
            let noisy = uv + na::Vector2::new(rng.random_range(-0.5..0.5), rng.random_range(-0.5..0.5));
            let image = &mut images[i];
            observations.push(Observation::new(i, image.keypoints.len()));
            image.keypoints.push(noisy);
            image.kp_used.push(true);
        }
        if observations.len() < 2 {
            continue;
        }
        let seed = point
            + na::Vector3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
        store.grouped.push(Track::new(seed, observations.clone()));
        store.optimized.push(Track::new(*point, observations));
    }

    let outliers = args.outliers.min(store.grouped.len());
    for idx in rand::seq::index::sample(&mut rng, store.grouped.len(), outliers) {
        let offset = na::Vector3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        )
        .normalize()
            * rng.random_range(30.0..60.0);
        store.grouped[idx].point += offset;
    }

    ctx.images = images;
    let reference = ctx.compute_ned_reference_lla()?;
    ctx.save_config()?;
    ctx.save_images_info()?;
    ctx.save_tracks(&store)?;

    println!(
        "Generated {} images, {} tracks ({} outliers) in {}",
        ctx.images.len(),
        store.grouped.len(),
        outliers,
        args.output.display()
    );
    log::info!("reference: {:?}", reference);
    Ok(())
}
