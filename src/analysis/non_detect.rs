//! Resolution of non-detect readings.
//!
//! A non-detect has no observed concentration; the configured
//! `NonDetectPolicy` decides what value stands in for it, or whether the
//! reading is dropped. Detected readings pass through unchanged.

use crate::model::NonDetectPolicy;

/// Returns the value to use for a reading, or `None` when the policy
/// excludes it.
///
/// `concentration` should already be in mg/L. A missing detection limit
/// resolves to 0 under `HalfLod` and `Lod`.
pub fn resolve(
    concentration: f64,
    is_non_detect: bool,
    detection_limit: Option<f64>,
    policy: NonDetectPolicy,
) -> Option<f64> {
    if !is_non_detect {
        return Some(concentration);
    }

    match policy {
        NonDetectPolicy::Zero => Some(0.0),
        NonDetectPolicy::HalfLod => Some(detection_limit.map_or(0.0, |lod| lod / 2.0)),
        NonDetectPolicy::Lod => Some(detection_limit.unwrap_or(0.0)),
        NonDetectPolicy::Exclude => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_POLICIES: [NonDetectPolicy; 4] = [
        NonDetectPolicy::Zero,
        NonDetectPolicy::HalfLod,
        NonDetectPolicy::Lod,
        NonDetectPolicy::Exclude,
    ];

    #[test]
    fn test_detected_reading_passes_through_under_every_policy() {
        for policy in ALL_POLICIES {
            assert_eq!(
                resolve(0.037, false, Some(0.002), policy),
                Some(0.037),
                "detected reading must not be altered by {}",
                policy
            );
        }
    }

    #[test]
    fn test_half_lod_halves_detection_limit() {
        assert_eq!(resolve(0.0, true, Some(0.002), NonDetectPolicy::HalfLod), Some(0.001));
    }

    #[test]
    fn test_lod_uses_detection_limit() {
        assert_eq!(resolve(0.0, true, Some(0.002), NonDetectPolicy::Lod), Some(0.002));
    }

    #[test]
    fn test_missing_limit_resolves_to_zero() {
        assert_eq!(resolve(0.5, true, None, NonDetectPolicy::HalfLod), Some(0.0));
        assert_eq!(resolve(0.5, true, None, NonDetectPolicy::Lod), Some(0.0));
    }

    #[test]
    fn test_zero_policy_ignores_reported_value() {
        assert_eq!(resolve(0.5, true, Some(0.002), NonDetectPolicy::Zero), Some(0.0));
    }

    #[test]
    fn test_exclude_drops_non_detect() {
        assert_eq!(resolve(0.0, true, Some(0.002), NonDetectPolicy::Exclude), None);
    }
}
