use std::path::PathBuf;
use std::time::Instant;

use aerial_geometry::fast_projection::{
    ProjectionOptions, fast_project_keypoints_to_3d, project_keypoints_to_ground,
};
use aerial_geometry::match_graph::{UsageSource, compute_keypoint_usage};
use aerial_geometry::matches::seed_track_points;
use aerial_geometry::project::ProjectContext;
use aerial_geometry::surface::GroundModel;
use aerial_geometry::types::{IntrinsicsVariant, PoseKind};
use clap::Parser;

#[derive(Parser)]
#[command(version, about = "Estimate a 3-D ground position for every keypoint", author)]
struct ProjectCli {
    /// project directory
    #[arg(long)]
    project: PathBuf,

    /// which image pose to cast rays from
    #[arg(long, value_enum, default_value = "raw")]
    pose: PoseKind,

    /// which camera calibration to use
    #[arg(long, value_enum, default_value = "original")]
    intrinsics: IntrinsicsVariant,

    /// intersect every keypoint with the ground plane instead of interpolating
    /// from a grid
    #[arg(long)]
    direct: bool,

    /// project every keypoint, not only those referenced by a track
    #[arg(long)]
    all: bool,

    /// refresh the track points from the new estimates and save them
    #[arg(long)]
    seed_tracks: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = ProjectCli::parse();

    let mut ctx = ProjectContext::load(&cli.project)?;
    let options = ProjectionOptions {
        pose: cli.pose,
        intrinsics: cli.intrinsics,
        grid: ctx.config.fast_projection,
    };

    let mut store = if ctx.has_tracks() {
        Some(ctx.load_tracks()?)
    } else {
        log::warn!("no match files found, every keypoint will be projected");
        None
    };
    let source = match &store {
        Some(store) if !cli.all => UsageSource::Tracks(&store.optimized),
        _ => UsageSource::All,
    };
    compute_keypoint_usage(&mut ctx.images, source)?;
    ctx.undistort_keypoints(cli.intrinsics)?;

    let now = Instant::now();
    let camera = ctx.config.camera.clone();
    if cli.direct {
        let ground_m = match &ctx.config.ground {
            GroundModel::Plane { altitude_m } => *altitude_m,
            GroundModel::Polynomial { .. } => {
                return Err("direct projection needs a plane ground model".into());
            }
        };
        project_keypoints_to_ground(&camera, &mut ctx.images, ground_m, &options)?;
    } else {
        let ground = ctx.config.ground.clone();
        let results = fast_project_keypoints_to_3d(&camera, &mut ctx.images, &ground, &options)?;
        let (mut projected, mut invalid, mut failed) = (0, 0, 0);
        for result in &results {
            match result {
                Ok(stats) => {
                    projected += stats.projected;
                    invalid += stats.invalid;
                }
                Err(_) => failed += 1,
            }
        }
        println!(
            "projected {} keypoints, {} outside the grid, {} images failed",
            projected, invalid, failed
        );
    }
    println!("projection took {:.6} sec", now.elapsed().as_secs_f64());

    ctx.save_coords()?;
    if cli.seed_tracks {
        if let Some(store) = store.as_mut() {
            let n = seed_track_points(&mut store.grouped, &ctx.images);
            log::info!("seeded {} of {} tracks", n, store.grouped.len());
            ctx.save_tracks(store)?;
        }
    }
    Ok(())
}
