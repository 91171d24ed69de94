//! Pollution category and per-metal flag thresholds.
//!
//! Category cut-offs come from the heavy-metal index literature:
//!   HPI: <15 Safe, 15–30 Moderate, 30–70 Poor, >70 Hazardous
//!   HEI and MI: <10 Safe, 10–20 Moderate, 20–40 Poor, >40 Hazardous
//!
//! They are fixed constants, not configuration.

use crate::model::{MetalFlag, PollutionCategory};

/// Lower bounds (exclusive) of one category tier, per index.
#[derive(Debug, Clone, Copy)]
pub struct TierThresholds {
    pub category: PollutionCategory,
    pub hpi: f64,
    pub hei: f64,
    pub mi: f64,
}

/// Tiers from most to least severe. A sample takes the first tier any of
/// its indices exceeds.
pub const CATEGORY_TIERS: [TierThresholds; 3] = [
    TierThresholds { category: PollutionCategory::Hazardous, hpi: 70.0, hei: 40.0, mi: 40.0 },
    TierThresholds { category: PollutionCategory::Poor, hpi: 30.0, hei: 20.0, mi: 20.0 },
    TierThresholds { category: PollutionCategory::Moderate, hpi: 15.0, hei: 10.0, mi: 10.0 },
];

/// Ratio at or below which a metal is `Safe`.
pub const SAFE_RATIO_MAX: f64 = 0.5;

/// Ratio at or below which a metal is `Caution`; above it is `Exceeded`.
pub const CAUTION_RATIO_MAX: f64 = 1.0;

/// Classifies a sample from its three indices.
///
/// Any single index crossing a tier's threshold is enough; the sample
/// inherits the worst tier indicated by any index.
pub fn classify(hpi: f64, hei: f64, mi: f64) -> PollutionCategory {
    CATEGORY_TIERS
        .iter()
        .find(|tier| hpi > tier.hpi || hei > tier.hei || mi > tier.mi)
        .map(|tier| tier.category)
        .unwrap_or(PollutionCategory::Safe)
}

/// Flags one metal from its concentration-to-limit ratio.
///
/// Boundaries are inclusive on the lower tier: a ratio of exactly 1.0 is
/// `Caution`, not `Exceeded`.
pub fn flag_for_ratio(ratio: f64) -> MetalFlag {
    if ratio <= SAFE_RATIO_MAX {
        MetalFlag::Safe
    } else if ratio <= CAUTION_RATIO_MAX {
        MetalFlag::Caution
    } else {
        MetalFlag::Exceeded
    }
}
