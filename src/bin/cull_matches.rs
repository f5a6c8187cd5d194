use std::io::Write;
use std::path::PathBuf;

use aerial_geometry::culling::{
    DEFAULT_MAX_SHAKER_ANGLE, DeletionMode, MarkRef, ScoreEntry, compute_movers, compute_shakers,
    delete_marked_matches, mark_using_list, purge_weak_images, select_below, select_outliers,
};
use aerial_geometry::image::Image;
use aerial_geometry::io::{CullReport, report_timestamp, write_cull_report};
use aerial_geometry::match_graph::image_groups;
use aerial_geometry::matches::{Track, feature_counts};
use aerial_geometry::project::ProjectContext;
use aerial_geometry::review::ReviewSession;
use aerial_geometry::types::PoseKind;
use aerial_geometry::visualization::{create_recording, log_cameras, log_candidate};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScoreKind {
    /// tracks whose point moved the most during optimization
    Movers,
    /// tracks seen from nearly colocated cameras
    Shakers,
}

#[derive(Parser)]
#[command(version, about = "Find and remove unreliable feature matches", author)]
struct CullCli {
    /// project directory
    #[arg(long)]
    project: PathBuf,

    /// how many stddevs above the mean for auto discarding features (movers)
    #[arg(long, default_value_t = 3.0)]
    stddev: f64,

    /// remove entire match chain, not just the worst offending element
    #[arg(long)]
    strong: bool,

    /// interactively review candidates from worst to best and select for deletion or keep
    #[arg(long)]
    interactive: bool,

    /// which score drives the cull
    #[arg(long, value_enum, default_value = "shakers")]
    score: ScoreKind,

    /// shaker angle (radians) below which a track is culled
    #[arg(long, default_value_t = DEFAULT_MAX_SHAKER_ANGLE)]
    max_angle: f64,

    /// also drop every observation in images left with fewer than this many features
    #[arg(long)]
    purge_weak: Option<usize>,

    /// write the review candidates to a rerun recording
    #[arg(long)]
    rerun: Option<PathBuf>,
}

fn read_answer(prompt: &str) -> std::io::Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn confirm(prompt: &str) -> std::io::Result<bool> {
    Ok(matches!(read_answer(prompt)?.as_str(), "y" | "Y"))
}

fn review_interactively(
    entries: &[ScoreEntry],
    tracks: &[Track],
    images: &[Image],
    recording: Option<&rerun::RecordingStream>,
) -> Result<Vec<MarkRef>, Box<dyn std::error::Error>> {
    let mut session = ReviewSession::new(entries.to_vec());
    if session.is_empty() {
        println!("Nothing to review.");
        return Ok(Vec::new());
    }
    println!("d = delete, k = keep, b = back, q = finish");
    while let Some(entry) = session.current().copied() {
        let track = &tracks[entry.track];
        if let Some(recording) = recording {
            log_candidate(
                recording,
                session.position(),
                session.len(),
                &entry,
                track,
                images,
                PoseKind::Optimized,
            )?;
        }
        let observers: Vec<&str> = track
            .live()
            .filter_map(|(img, _)| images.get(img).map(|i| i.name.as_str()))
            .collect();
        let state = if session.is_marked(&entry.mark_ref()) {
            "marked"
        } else {
            "kept"
        };
        let answer = read_answer(&format!(
            "[{}/{}] track {} score {:.5} ({}) seen by {:?}: ",
            session.position() + 1,
            session.len(),
            entry.track,
            entry.score,
            state,
            observers
        ))?;
        match answer.as_str() {
            "d" | "D" => {
                session.mark(entry.mark_ref());
                if !session.next() {
                    break;
                }
            }
            "k" | "K" | "" => {
                session.unmark(&entry.mark_ref());
                if !session.next() {
                    break;
                }
            }
            "b" | "B" => {
                session.prev();
            }
            "q" | "Q" => break,
            other => println!("unknown answer {:?}", other),
        }
    }
    Ok(session.mark_list())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = CullCli::parse();

    let ctx = ProjectContext::load(&cli.project)?;
    let mut store = ctx.load_tracks()?;
    let image_count = ctx.images.len();

    let groups = image_groups(&store.optimized, image_count)?;
    let main_group = groups.first().cloned().unwrap_or_default();
    println!("Main group size: {}", main_group.len());

    let entries = match cli.score {
        ScoreKind::Movers => compute_movers(&store.grouped, &store.optimized),
        ScoreKind::Shakers => compute_shakers(
            &store.optimized,
            &ctx.images,
            &main_group,
            PoseKind::Optimized,
        )?,
    };

    let recording = match &cli.rerun {
        Some(path) => {
            let recording = create_recording("cull-matches", path)?;
            log_cameras(&recording, &ctx.images, PoseKind::Optimized)?;
            Some(recording)
        }
        None => None,
    };

    let mark_list = if cli.interactive {
        review_interactively(&entries, &store.optimized, &ctx.images, recording.as_ref())?
    } else {
        match cli.score {
            ScoreKind::Movers => select_outliers(&entries, cli.stddev),
            ScoreKind::Shakers => select_below(&entries, cli.max_angle),
        }
    };

    let mut mark_sum = mark_using_list(
        &mark_list,
        &mut [store.grouped.as_mut_slice(), store.optimized.as_mut_slice()],
    )?;

    let counts = feature_counts(&store.optimized, image_count);
    for (image, count) in ctx.images.iter().zip(&counts) {
        log::debug!("{}: {} features", image.name, count);
    }

    let mut weak_image_marks = 0;
    if let Some(min_features) = cli.purge_weak {
        weak_image_marks = purge_weak_images(
            &mut [store.optimized.as_mut_slice(), store.grouped.as_mut_slice()],
            image_count,
            min_features,
        );
        mark_sum += weak_image_marks;
    }

    let mode = if cli.strong {
        DeletionMode::Strong
    } else {
        DeletionMode::Default
    };
    let mut report = CullReport {
        timestamp: report_timestamp(),
        score: format!("{:?}", cli.score).to_lowercase(),
        candidates: entries.len(),
        marks: mark_list,
        weak_image_marks,
        saved: false,
        grouped: None,
        optimized: None,
        tracks_remaining: store.optimized.len(),
    };

    if mark_sum > 0 {
        println!("Outliers removed from match lists: {}", mark_sum);
        if confirm("Save these changes? (y/n):")? {
            report.grouped = Some(delete_marked_matches(&mut store.grouped, mode));
            report.optimized = Some(delete_marked_matches(&mut store.optimized, mode));
            ctx.save_tracks(&store)?;
            report.saved = true;
            report.tracks_remaining = store.optimized.len();
        }
    } else {
        println!("No outliers found.");
    }
    write_cull_report(&ctx.dir.join("cull_report.json"), &report)?;
    Ok(())
}
