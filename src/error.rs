use std::io;
use thiserror::Error;

use crate::header::FormatError;
use crate::manifest::ManifestError;

/// Run-level failure.  Any of these stops the current extraction run;
/// per-payload problems are reported through
/// [`ExtractionError`](crate::store::ExtractionError) instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("format error: {0}")]
    Format(#[from] FormatError),
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("report error: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
