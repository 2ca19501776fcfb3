//! Error types for the tagger pipeline

use thiserror::Error;

use crate::backends::BackendError;

pub type TaggerResult<T> = std::result::Result<T, TaggerError>;

/// Errors that abort a command.
///
/// Deliberately narrow: analysis and parse failures are not here. Those are
/// soft outcomes carried inside
/// [`TrackOutcome`](crate::models::TrackOutcome) so one bad model response
/// can never abort a batch.
#[derive(Error, Debug)]
pub enum TaggerError {
    /// Store, taxonomy, or configuration failure from the common layer
    #[error(transparent)]
    Common(#[from] djcrate_common::Error),

    /// Backend construction failure (missing credentials, bad client config)
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
