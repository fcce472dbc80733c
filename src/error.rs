use thiserror::Error;

use crate::config::ConfigError;
use crate::event::EventError;
use crate::output::EncodeError;
use crate::pna::result::MappingError;
use crate::route::ResolveError;
use crate::storage::StorageError;

/// Failures that end a run without output.
///
/// Routing decisions that lead to no output (wrong bucket, unrelated key,
/// no store configured) are not errors; see [`crate::pipeline::SkipReason`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Trigger event is missing or malformed")]
    InvalidEvent(#[from] EventError),
    #[error("Unable to fetch the product mapping file")]
    MappingFetch(#[source] StorageError),
    #[error("Unable to load the product mapping file")]
    MappingLoad(#[from] MappingError),
    #[error("Unable to fetch the PnA export")]
    SourceFetch(#[source] StorageError),
    #[error("Unable to resolve the destination store")]
    ConfigFetch(#[from] ResolveError),
    #[error("Unable to encode normalized records")]
    Encode(#[from] EncodeError),
    #[error("Unable to write normalized records")]
    Emit(#[source] StorageError),
    #[error("Invalid configuration")]
    Config(#[from] ConfigError),
}
impl PipelineError {
    /// Short label used for the `reason` of a failed run.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidEvent(_) => "invalid_event",
            PipelineError::MappingFetch(_) | PipelineError::MappingLoad(_) => "mapping_load",
            PipelineError::SourceFetch(_) => "source_fetch",
            PipelineError::ConfigFetch(_) => "config_fetch",
            PipelineError::Encode(_) | PipelineError::Emit(_) => "emit",
            PipelineError::Config(_) => "config",
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
