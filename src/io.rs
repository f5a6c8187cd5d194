use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::culling::{DeletionSummary, MarkRef};
use crate::error::{Error, Result};

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object).map_err(|source| Error::Json {
        path: output_path.to_path_buf(),
        source,
    })?;
    std::fs::write(output_path, j).map_err(|source| Error::Io {
        path: output_path.to_path_buf(),
        source,
    })
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(file_path).map_err(|source| Error::Io {
        path: file_path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| Error::Json {
        path: file_path.to_path_buf(),
        source,
    })
}

/// Summary written after a cull run.
#[derive(Debug, serde::Serialize)]
pub struct CullReport {
    pub timestamp: String,
    pub score: String,
    pub candidates: usize,
    pub marks: Vec<MarkRef>,
    pub weak_image_marks: usize,
    pub saved: bool,
    pub grouped: Option<DeletionSummary>,
    pub optimized: Option<DeletionSummary>,
    pub tracks_remaining: usize,
}

pub fn report_timestamp() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

pub fn write_cull_report(output_path: &Path, report: &CullReport) -> Result<()> {
    object_to_json(output_path, report)
}
