//! `devconf-runtime` – the lifecycle around the configuration engine.
//!
//! # Modules
//!
//! - [`lifecycle`] – inbound configuration callback, the apply cycle and
//!   notification dispatch to a [`StateSink`][lifecycle::StateSink].
//! - [`params`] – [`ParamCell`][params::ParamCell], the locked snapshot cell
//!   shared with the analysis path, and the
//!   [`ParameterExtractor`][params::ParameterExtractor] that fills it.
//! - [`worker`] – [`AnalysisWorker`][worker::AnalysisWorker], a background
//!   thread reading parameter snapshots.
//! - [`telemetry`] – tracing initialisation with a run-time log level handle.

pub mod lifecycle;
pub mod params;
pub mod telemetry;
pub mod worker;

use devconf_types::ConfigError;
use thiserror::Error;

pub use lifecycle::{Lifecycle, Processed, StateSink};
pub use params::{ParamCell, ParameterExtractor};
pub use telemetry::{init_tracing, LogLevelHandle, TracerProviderGuard};
pub use worker::AnalysisWorker;

/// Errors raised by the lifecycle layer itself.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("State dispatch failed: {0}")]
    Dispatch(String),

    #[error("Log filter reload failed: {0}")]
    Telemetry(String),

    #[error("Worker error: {0}")]
    Worker(#[from] std::io::Error),
}
