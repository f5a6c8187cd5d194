use aerial_geometry::Error;
use aerial_geometry::culling::{
    DeletionMode, DeletionSummary, MarkRef, ScoreEntry, compute_movers, compute_shakers,
    delete_marked_matches, mark_outliers, mark_using_list, purge_weak_images, score_stats,
    select_below, select_outliers, unmark,
};
use aerial_geometry::image::Image;
use aerial_geometry::matches::{Observation, Track, feature_counts};
use aerial_geometry::review::ReviewSession;
use aerial_geometry::types::{Pose, PoseKind};
use approx::assert_relative_eq;
use nalgebra as na;

fn obs(image: usize, feature: usize) -> Observation {
    Observation::new(image, feature)
}

fn track(observations: Vec<Observation>) -> Track {
    Track::new(na::Vector3::zeros(), observations)
}

fn entry(score: f64, track: usize) -> ScoreEntry {
    ScoreEntry {
        score,
        track,
        observation: 0,
    }
}

fn mark(track: usize, observation: usize) -> MarkRef {
    MarkRef { track, observation }
}

fn image_at(n: f64, e: f64) -> Image {
    let pose = Pose::from_ypr_deg(na::Vector3::new(n, e, -100.0), 0.0, -90.0, 0.0);
    let mut image = Image::new("img", pose, vec![na::Vector2::zeros(); 4]);
    image.camera_pose_sba = Some(pose);
    image
}

#[test]
fn test_mark_outliers_fixture() {
    let entries = vec![
        entry(100.0, 4),
        entry(10.0, 0),
        entry(10.0, 1),
        entry(10.0, 2),
        entry(10.0, 3),
    ];
    let (mean, stddev) = score_stats(&entries).unwrap();
    assert_relative_eq!(mean, 28.0);
    assert_relative_eq!(stddev, 36.0);

    let mut tracks: Vec<Track> = (0..5).map(|i| track(vec![obs(0, i), obs(1, i)])).collect();
    let marked = mark_outliers(&entries, 1.5, &mut tracks).unwrap();
    assert_eq!(marked, 1);
    assert!(tracks[4].observations[0].is_removed());
    assert!(tracks[..4].iter().all(|t| !t.has_removed()));
}

#[test]
fn test_selection_on_empty_and_uniform_lists() {
    assert!(score_stats(&[]).is_none());
    assert!(select_outliers(&[], 1.0).is_empty());
    let uniform = vec![entry(5.0, 0), entry(5.0, 1)];
    assert!(select_outliers(&uniform, 0.0).is_empty());
}

#[test]
fn test_movers_sorted_descending() {
    let mut grouped = vec![
        track(vec![obs(0, 0), obs(1, 0)]),
        track(vec![obs(0, 1), obs(1, 1)]),
        track(vec![obs(0, 2), obs(1, 2)]),
    ];
    let optimized = grouped.clone();
    grouped[0].point = na::Vector3::new(1.0, 0.0, 0.0);
    grouped[1].point = na::Vector3::new(0.0, 0.0, 5.0);
    let movers = compute_movers(&grouped, &optimized);
    assert_eq!(movers.iter().map(|e| e.track).collect::<Vec<_>>(), vec![1, 0, 2]);
    assert_relative_eq!(movers[0].score, 5.0);
    assert_relative_eq!(movers[2].score, 0.0);
    assert!(movers.iter().all(|e| e.observation == 0));
}

#[test]
fn test_shakers_angle_and_order() {
    let images = vec![image_at(0.0, 0.0), image_at(10.0, 0.0), image_at(100.0, 0.0), image_at(500.0, 0.0)];
    let mut narrow = track(vec![obs(0, 0), obs(1, 0)]);
    narrow.point = na::Vector3::new(5.0, 0.0, 0.0);
    let mut wide = track(vec![obs(0, 1), obs(2, 1)]);
    wide.point = na::Vector3::new(50.0, 0.0, 0.0);
    // only seen from outside the group
    let outsider = track(vec![obs(3, 0), obs(3, 1)]);

    let tracks = vec![wide, narrow, outsider];
    let shakers = compute_shakers(&tracks, &images, &[0, 1, 2], PoseKind::Optimized).unwrap();
    assert_eq!(shakers.len(), 2);
    assert_eq!(shakers[0].track, 1);
    assert_relative_eq!(shakers[0].score, 5f64.atan2(100.0), epsilon = 1e-12);
    assert_eq!(shakers[1].track, 0);
    assert_relative_eq!(shakers[1].score, 50f64.atan2(100.0), epsilon = 1e-12);

    let cut = select_below(&shakers, 0.07);
    assert_eq!(cut, vec![mark(1, 0)]);
}

#[test]
fn test_shakers_need_optimized_pose() {
    let mut images = vec![image_at(0.0, 0.0), image_at(10.0, 0.0)];
    images[1].camera_pose_sba = None;
    let tracks = vec![track(vec![obs(0, 0), obs(1, 0)])];
    assert!(matches!(
        compute_shakers(&tracks, &images, &[0, 1], PoseKind::Optimized),
        Err(Error::MissingPose { image: 1, .. })
    ));
    assert!(compute_shakers(&tracks, &images, &[0, 1], PoseKind::Raw).is_ok());
}

#[test]
fn test_mark_using_list_applies_to_every_store() {
    let mut grouped = vec![track(vec![obs(0, 0), obs(1, 0), obs(2, 0)]), track(vec![obs(0, 1), obs(1, 1)])];
    let mut optimized = grouped.clone();
    let n = mark_using_list(
        &[mark(0, 1), mark(1, 0)],
        &mut [grouped.as_mut_slice(), optimized.as_mut_slice()],
    )
    .unwrap();
    assert_eq!(n, 2);
    for store in [&grouped, &optimized] {
        assert!(store[0].observations[1].is_removed());
        assert!(store[1].observations[0].is_removed());
        assert_eq!(store[0].live_count(), 2);
    }
}

#[test]
fn test_mark_using_list_is_all_or_nothing() {
    let mut grouped = vec![track(vec![obs(0, 0), obs(1, 0)])];
    let mut optimized = grouped.clone();
    let before = grouped.clone();
    let result = mark_using_list(
        &[mark(0, 0), mark(0, 5)],
        &mut [grouped.as_mut_slice(), optimized.as_mut_slice()],
    );
    assert!(matches!(result, Err(Error::MarkOutOfRange { track: 0, observation: 5 })));
    assert_eq!(grouped, before);
    assert_eq!(optimized, before);
}

#[test]
fn test_mark_using_list_counts_only_new_removals() {
    let mut grouped = vec![
        track(vec![obs(0, 0), obs(1, 0), obs(2, 0)]),
        track(vec![Observation::Removed, obs(1, 1), obs(2, 1)]),
    ];
    let mut optimized = grouped.clone();
    optimized[1].observations[0] = obs(0, 1);
    let marks = [mark(0, 1), mark(0, 1), mark(1, 0)];
    let n = mark_using_list(&marks, &mut [grouped.as_mut_slice(), optimized.as_mut_slice()]).unwrap();
    assert_eq!(n, 1);
    assert!(optimized[1].observations[0].is_removed());
    assert_eq!(grouped[0].live_count(), 2);

    let again = mark_using_list(&marks, &mut [grouped.as_mut_slice()]).unwrap();
    assert_eq!(again, 0);
}

#[test]
fn test_unmark_rejects_missing_observation() {
    let mut tracks = vec![track(vec![obs(0, 3), obs(1, 4)])];
    let before = tracks.clone();
    assert!(matches!(
        unmark(&mut tracks, &mark(0, 2), obs(2, 0)),
        Err(Error::MarkOutOfRange { track: 0, observation: 2 })
    ));
    assert_eq!(tracks, before);
    unmark(&mut tracks, &mark(0, 1), Observation::Removed).unwrap();
    assert!(tracks[0].observations[1].is_removed());
}

#[test]
fn test_unmark_restores_observation() {
    let mut tracks = vec![track(vec![obs(0, 3), obs(1, 4)])];
    mark_using_list(&[mark(0, 0)], &mut [tracks.as_mut_slice()]).unwrap();
    assert!(tracks[0].has_removed());
    unmark(&mut tracks, &mark(0, 0), obs(0, 3)).unwrap();
    assert_eq!(tracks[0].observations[0], obs(0, 3));
    assert!(unmark(&mut tracks, &mark(3, 0), obs(0, 3)).is_err());
}

fn marked_tracks() -> Vec<Track> {
    vec![
        // keeps two live observations
        track(vec![obs(0, 1), Observation::Removed, obs(2, 3)]),
        // drops to a single observation
        track(vec![obs(0, 2), Observation::Removed]),
        // untouched
        track(vec![obs(1, 1), obs(2, 1)]),
    ]
}

#[test]
fn test_delete_default_mode() {
    let mut tracks = marked_tracks();
    let summary = delete_marked_matches(&mut tracks, DeletionMode::Default);
    assert_eq!(
        summary,
        DeletionSummary {
            observations_removed: 2,
            tracks_removed: 1
        }
    );
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].observations, vec![obs(0, 1), obs(2, 3)]);
    assert_eq!(tracks[1].observations, vec![obs(1, 1), obs(2, 1)]);
}

#[test]
fn test_delete_strong_mode() {
    let mut tracks = marked_tracks();
    let summary = delete_marked_matches(&mut tracks, DeletionMode::Strong);
    assert_eq!(summary.tracks_removed, 2);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].observations, vec![obs(1, 1), obs(2, 1)]);
}

#[test]
fn test_delete_is_idempotent() {
    for mode in [DeletionMode::Default, DeletionMode::Strong] {
        let mut tracks = marked_tracks();
        delete_marked_matches(&mut tracks, mode);
        let once = tracks.clone();
        let summary = delete_marked_matches(&mut tracks, mode);
        assert_eq!(summary, DeletionSummary::default());
        assert_eq!(tracks, once);
        assert!(tracks.iter().all(|t| t.live_count() >= 2 && !t.has_removed()));
    }
}

#[test]
fn test_purge_weak_images() {
    let mut optimized = vec![
        track(vec![obs(0, 0), obs(1, 0)]),
        track(vec![obs(0, 1), obs(1, 1)]),
        track(vec![obs(0, 2), obs(2, 0)]),
    ];
    let mut grouped = optimized.clone();
    assert_eq!(feature_counts(&optimized, 4), vec![3, 2, 1, 0]);

    let n = purge_weak_images(
        &mut [optimized.as_mut_slice(), grouped.as_mut_slice()],
        4,
        2,
    );
    assert_eq!(n, 1);
    assert!(optimized[2].observations[1].is_removed());
    assert!(grouped[2].observations[1].is_removed());
    assert_eq!(feature_counts(&optimized, 4), vec![3, 2, 0, 0]);

    let summary = delete_marked_matches(&mut optimized, DeletionMode::Default);
    assert_eq!(summary.tracks_removed, 1);
    assert_eq!(purge_weak_images(&mut [], 4, 2), 0);
}

#[test]
fn test_review_session() {
    let entries = vec![entry(9.0, 2), entry(5.0, 0), entry(1.0, 1)];
    let mut session = ReviewSession::new(entries);
    assert_eq!(session.len(), 3);
    assert!(!session.prev());
    assert_eq!(session.current().map(|e| e.track), Some(2));

    assert_eq!(session.toggle_current(), Some(true));
    assert!(session.next());
    assert!(session.next());
    assert!(!session.next());
    assert_eq!(session.position(), 2);
    assert_eq!(session.toggle_current(), Some(true));
    assert!(session.prev());
    session.mark(mark(0, 0));
    session.unmark(&mark(0, 0));
    assert_eq!(session.mark_count(), 2);

    assert!(session.prev());
    assert_eq!(session.toggle_current(), Some(false));
    assert_eq!(session.mark_list(), vec![mark(1, 0)]);

    let empty = ReviewSession::new(Vec::new());
    assert!(empty.is_empty());
    assert!(empty.current().is_none());
}
