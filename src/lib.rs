//! pna-transfer: turns WinePoS price and availability exports into store
//! updates.
//!
//! An upload under `userUploads/{owner}/{route key}` triggers one run: the
//! product mapping table and the export are loaded, the export's positional
//! columns are decoded and joined against the mapping, and the result is
//! written for the store the route key resolves to.
//!
//! ```ignore
//! use pna_transfer::{Config, Pipeline};
//!
//! let pipeline = Pipeline::s3(Config::from_env()?).await?;
//! let outcome = pipeline.handle_json(&raw_event).await?;
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod pna;
pub mod route;
pub mod storage;

pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{InvocationResponse, Outcome, Pipeline, SkipReason};
