pub mod camera_model;
pub mod config;
pub mod culling;
pub mod error;
pub mod fast_projection;
pub mod image;
pub mod interpolate;
pub mod io;
pub mod match_graph;
pub mod matches;
pub mod project;
pub mod projection;
pub mod review;
pub mod surface;
pub mod types;
pub mod visualization;

pub use error::{Error, Result};
