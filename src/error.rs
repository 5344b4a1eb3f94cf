use thiserror::Error;

use crate::api::ApiError;

/// Failure taxonomy for the slideshow engine. Nothing here is fatal to the
/// process; each variant maps to a specific degradation path.
#[derive(Debug, Error)]
pub enum Error {
    /// The collaborator's startup configuration was unreachable; built-in
    /// defaults apply.
    #[error("remote config unavailable: {0}")]
    ConfigLoad(#[source] ApiError),

    /// The initial metadata page could not be loaded; nothing is
    /// displayable until a reload succeeds.
    #[error("metadata load failed: {0}")]
    MetadataLoad(#[source] ApiError),

    /// A pagination request failed; existing entries remain usable.
    #[error("metadata extension from {start} failed: {source}")]
    MetadataExtend {
        start: usize,
        #[source]
        source: ApiError,
    },

    /// The currently displayed image failed to load.
    #[error("image load failed at position {index}: {source}")]
    ImageLoad {
        index: usize,
        #[source]
        source: ApiError,
    },

    /// A liveness probe failed; drives automatic offline entry, silent
    /// otherwise.
    #[error("probe failed: {0}")]
    Probe(#[source] ApiError),

    /// A lookahead fetch failed; logged and ignored.
    #[error("prefetch failed at position {index}: {source}")]
    Prefetch {
        index: usize,
        #[source]
        source: ApiError,
    },
}
