/// Index calculation for the pollution index service.
///
/// The pipeline for one sample is short and deterministic:
///   normalize units → resolve non-detects → HPI/HEI/MI → classify → per-metal analysis
///
/// Submodules:
/// - `units`: converts reported concentrations to mg/L.
/// - `non_detect`: resolves below-detection-limit readings under a policy.
/// - `indices`: `IndexCalculator`, bound to one standard set.
///
/// Nothing in here performs I/O or logging.

pub mod indices;
pub mod non_detect;
pub mod units;

pub use indices::{IndexCalculator, round2};
