use std::path::PathBuf;

use thiserror::Error;

/// Why a grade's hidden `_theme` metadata was not accepted.
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("malformed theme JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("theme metadata is not a list of tuples")]
    NotATupleList,
    #[error("theme tuple has {0} fields, expected more than 2")]
    TooFewFields(usize),
    #[error("theme status field is not text")]
    StatusNotText,
    #[error("status `{0}` is not a counted grade state")]
    UncountedStatus(String),
}

/// Why a single grade element was left out of a subject's grades.
#[derive(Debug, Error)]
pub enum GradeRejection {
    #[error(transparent)]
    Theme(#[from] ThemeError),
    #[error("percentage grade `{0}`")]
    Percentage(String),
    #[error("`{0}` is not a number")]
    NotANumber(String),
}

/// Failures talking to the page host. Shown to the user verbatim.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[cfg(feature = "chromium")]
    #[error("could not reach the browser: {0}")]
    Connect(String),
    #[error("{0}")]
    Injection(String),
}
