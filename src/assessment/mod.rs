/// Risk assessment of computed indices.
///
/// Submodules:
/// - `thresholds`: sample category and per-metal flag rules.

pub mod thresholds;
