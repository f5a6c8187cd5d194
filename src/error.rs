use std::path::PathBuf;

use thiserror::Error;

use crate::types::{IntrinsicsVariant, PoseKind};

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid project: {0}")]
    InvalidProject(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(
        "track {track} observation {observation} references image {image} feature {feature}, which does not exist"
    )]
    ObservationOutOfRange {
        track: usize,
        observation: usize,
        image: usize,
        feature: usize,
    },
    #[error("pair from track {track} references image {image} feature {feature}, which does not exist")]
    PairOutOfRange {
        track: usize,
        image: usize,
        feature: usize,
    },
    #[error("mark ({track}, {observation}) does not reference an existing observation")]
    MarkOutOfRange { track: usize, observation: usize },
    #[error("image {image} has no {kind:?} pose")]
    MissingPose { image: usize, kind: PoseKind },
    #[error("no {0:?} intrinsics in the project camera")]
    MissingIntrinsics(IntrinsicsVariant),
    #[error("image {image}: only {count} usable samples, need at least 3 non-collinear points")]
    InsufficientSamples { image: usize, count: usize },
    #[error("no image carries a geodetic position, cannot compute a reference")]
    NoGeodeticPoses,
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
