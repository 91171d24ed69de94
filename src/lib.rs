//! Heavy-metal pollution index service.
//!
//! Computes the Heavy Metal Pollution Index (HPI), Heavy Metal Evaluation
//! Index (HEI) and Metal Index (MI) for water samples against WHO, EPA or
//! custom permissible limits, classifies each sample and produces a
//! per-metal breakdown.
//!
//! The calculation engine (`analysis`, `assessment`, `standards`) is pure.
//! `ingest`, `service`, `config` and `logging` are the boundary around it.

pub mod analysis;
pub mod assessment;
pub mod config;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod service;
pub mod standards;

pub use analysis::IndexCalculator;
pub use model::{HmpiError, IndexResult, MetalMeasurement, Result};
pub use standards::StandardSet;
