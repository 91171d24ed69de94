//! Concentration unit normalization.

use crate::model::ConcentrationUnit;

/// Largest concentration accepted at the service boundary, in mg/L (1 kg/L).
///
/// Together with the bounds on standard rows this keeps every ratio and
/// index finite.
pub const MAX_MG_PER_L: f64 = 1.0e6;

/// Converts a concentration to mg/L.
///
/// ppm is taken as equal to mg/L, which holds for dilute aqueous samples
/// near unit density; no density correction is applied. Unrecognized units
/// pass through unchanged.
pub fn to_mg_per_l(concentration: f64, unit: &ConcentrationUnit) -> f64 {
    match unit {
        ConcentrationUnit::MilligramsPerLiter => concentration,
        ConcentrationUnit::MicrogramsPerLiter | ConcentrationUnit::PartsPerBillion => {
            concentration / 1000.0
        }
        ConcentrationUnit::PartsPerMillion => concentration,
        ConcentrationUnit::Other(_) => concentration,
    }
}

/// True when the reading is finite, non-negative and at most `MAX_MG_PER_L`
/// once normalized.
pub fn in_accepted_range(concentration: f64, unit: &ConcentrationUnit) -> bool {
    concentration.is_finite()
        && concentration >= 0.0
        && to_mg_per_l(concentration, unit) <= MAX_MG_PER_L
}
