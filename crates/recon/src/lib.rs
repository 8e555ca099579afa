//! `pedidos-recon`: sales report reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns the parsed,
//! classified and joined records plus a run summary. No CLI or IO
//! dependencies.

pub mod config;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod join;
pub mod matcher;
pub mod model;
pub mod parser;
pub mod similarity;

pub use config::PipelineConfig;
pub use engine::{run, PipelineInput, PipelineOutput};
pub use error::ReconError;
pub use model::{CellValue, Report, RunSummary, SalesRecord, Table};
