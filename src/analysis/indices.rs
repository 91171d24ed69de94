//! Heavy-metal pollution indices.
//!
//! Formulas, with Ci the resolved concentration (mg/L), Li the permissible
//! limit and Wi the health weight of metal i:
//!
//!   Qi  = Ci / Li × 100          (sub-index, ideal concentration taken as 0)
//!   HPI = Σ(Wi × Qi) / Σ(Wi)
//!   HEI = Σ(Ci / Li)
//!   MI  = HEI / n
//!
//! Only measurements with a matching standard row and a resolved
//! (non-excluded) value take part; everything else is skipped silently.
//! Empty sums yield 0, never NaN.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rayon::prelude::*;

use crate::analysis::{non_detect, units};
use crate::assessment::thresholds::{classify, flag_for_ratio};
use crate::model::{
    CalculationDetails, CalculationParameters, IndexResult, MetalAnalysisEntry, MetalMeasurement,
    NonDetectPolicy, RegulatoryStandard, SampleInput, SampleResult,
};
use crate::standards::StandardSet;

pub const FORMULA: &str = "HPI = Σ(Wi × Qi) / Σ(Wi), HEI = Σ(Ci / Li), MI = HEI / n";

/// Rounds to two decimal places, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A measurement that survived standard lookup and non-detect resolution.
struct Resolved<'a> {
    standard: &'a RegulatoryStandard,
    concentration: f64,
}

impl Resolved<'_> {
    fn ratio(&self) -> f64 {
        self.concentration / self.standard.permissible_limit
    }
}

/// Computes pollution indices against one standard set.
///
/// The set and the non-detect policy are fixed at construction; use a new
/// calculator to switch standards. Instances hold no mutable state and can
/// be shared across threads.
#[derive(Debug, Clone)]
pub struct IndexCalculator {
    standards: Arc<StandardSet>,
    policy: NonDetectPolicy,
}

impl IndexCalculator {
    /// A calculator using the default non-detect policy (half the LOD).
    pub fn new(standards: Arc<StandardSet>) -> Self {
        Self::with_policy(standards, NonDetectPolicy::default())
    }

    pub fn with_policy(standards: Arc<StandardSet>, policy: NonDetectPolicy) -> Self {
        Self { standards, policy }
    }

    pub fn standards(&self) -> &StandardSet {
        &self.standards
    }

    pub fn policy(&self) -> NonDetectPolicy {
        self.policy
    }

    fn resolve<'a>(&'a self, measurement: &MetalMeasurement) -> Option<Resolved<'a>> {
        let standard = self.standards.get(&measurement.metal)?;
        let mg_per_l = units::to_mg_per_l(measurement.concentration, &measurement.unit);
        let concentration = non_detect::resolve(
            mg_per_l,
            measurement.is_non_detect,
            measurement.detection_limit,
            self.policy,
        )?;
        Some(Resolved { standard, concentration })
    }

    fn resolved<'a>(
        &'a self,
        measurements: &'a [MetalMeasurement],
    ) -> impl Iterator<Item = Resolved<'a>> + 'a {
        measurements.iter().filter_map(move |m| self.resolve(m))
    }

    /// Heavy Metal Pollution Index: health-weighted mean of percent-of-limit.
    pub fn compute_hpi(&self, measurements: &[MetalMeasurement]) -> f64 {
        let (numerator, denominator) =
            self.resolved(measurements)
                .fold((0.0_f64, 0.0_f64), |(num, den), r| {
                    let qi = r.ratio() * 100.0;
                    let wi = r.standard.health_weight;
                    (num + wi * qi, den + wi)
                });

        if denominator > 0.0 {
            numerator / denominator
        } else {
            0.0
        }
    }

    /// Heavy Metal Evaluation Index: unweighted sum of concentration-to-limit ratios.
    pub fn compute_hei(&self, measurements: &[MetalMeasurement]) -> f64 {
        self.resolved(measurements).map(|r| r.ratio()).sum()
    }

    /// Metal Index: HEI divided by the number of contributing measurements.
    pub fn compute_mi(&self, measurements: &[MetalMeasurement]) -> f64 {
        let n = self.resolved(measurements).count();
        if n > 0 {
            self.compute_hei(measurements) / n as f64
        } else {
            0.0
        }
    }

    /// Per-metal breakdown, in input order.
    pub fn analyze_metals(&self, measurements: &[MetalMeasurement]) -> Vec<MetalAnalysisEntry> {
        measurements
            .iter()
            .filter_map(|m| self.resolve(m).map(|r| (m, r)))
            .map(|(m, r)| {
                let ratio = r.ratio();
                MetalAnalysisEntry {
                    metal: m.metal.clone(),
                    concentration: r.concentration,
                    permissible_limit: r.standard.permissible_limit,
                    ratio,
                    contribution: ratio * r.standard.health_weight,
                    flag: flag_for_ratio(ratio),
                }
            })
            .collect()
    }

    /// Full result for one sample, stamped with the current time.
    pub fn calculate(&self, measurements: &[MetalMeasurement]) -> IndexResult {
        self.calculate_at(measurements, Utc::now())
    }

    /// Full result for one sample, stamped with `now`.
    ///
    /// The category is decided on the unrounded indices; the reported
    /// indices are rounded to two decimals.
    pub fn calculate_at(&self, measurements: &[MetalMeasurement], now: DateTime<Utc>) -> IndexResult {
        let hpi = self.compute_hpi(measurements);
        let hei = self.compute_hei(measurements);
        let mi = self.compute_mi(measurements);

        IndexResult {
            hpi: round2(hpi),
            hei: round2(hei),
            mi: round2(mi),
            category: classify(hpi, hei, mi),
            metal_analysis: self.analyze_metals(measurements),
            calculation_details: CalculationDetails {
                formula: FORMULA.to_string(),
                parameters: CalculationParameters {
                    standard: self.standards.family(),
                    non_detect_handling: self.policy,
                    metals: measurements.iter().map(|m| m.metal.clone()).collect(),
                },
                timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        }
    }

    /// Calculates every sample independently, preserving input order.
    pub fn batch_calculate(&self, samples: &[SampleInput]) -> Vec<SampleResult> {
        self.batch_calculate_at(samples, Utc::now())
    }

    pub fn batch_calculate_at(&self, samples: &[SampleInput], now: DateTime<Utc>) -> Vec<SampleResult> {
        samples.iter().map(|s| self.sample_result(s, now)).collect()
    }

    /// Same as `batch_calculate`, spread over the rayon thread pool.
    /// Output order still follows input order.
    pub fn batch_calculate_parallel(&self, samples: &[SampleInput]) -> Vec<SampleResult> {
        self.batch_calculate_parallel_at(samples, Utc::now())
    }

    pub fn batch_calculate_parallel_at(
        &self,
        samples: &[SampleInput],
        now: DateTime<Utc>,
    ) -> Vec<SampleResult> {
        samples.par_iter().map(|s| self.sample_result(s, now)).collect()
    }

    fn sample_result(&self, sample: &SampleInput, now: DateTime<Utc>) -> SampleResult {
        SampleResult {
            sample_id: sample.sample_id.clone(),
            result: self.calculate_at(&sample.concentrations, now),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConcentrationUnit, MetalFlag, PollutionCategory, StandardFamily};
    use chrono::TimeZone;

    /// A fixed "now" used across all tests: 2024-05-01 13:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn who() -> IndexCalculator {
        IndexCalculator::new(StandardSet::who())
    }

    fn mg(metal: &str, concentration: f64) -> MetalMeasurement {
        MetalMeasurement::detected(metal, concentration, ConcentrationUnit::MilligramsPerLiter)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {} but got {}",
            expected,
            actual
        );
    }

    // --- single-metal reference cases --------------------------------------

    #[test]
    fn test_arsenic_at_twice_the_limit() {
        let result = who().calculate_at(&[mg("As", 0.02)], fixed_now());

        assert_eq!(result.hpi, 200.0);
        assert_eq!(result.hei, 2.0);
        assert_eq!(result.mi, 2.0);
        assert_eq!(result.category, PollutionCategory::Hazardous);
        assert_eq!(result.metal_analysis.len(), 1);

        let entry = &result.metal_analysis[0];
        assert_eq!(entry.metal, "As");
        assert_eq!(entry.concentration, 0.02);
        assert_eq!(entry.permissible_limit, 0.01);
        assert_close(entry.ratio, 2.0);
        assert_close(entry.contribution, 20.0);
        assert_eq!(entry.flag, MetalFlag::Exceeded);
    }

    #[test]
    fn test_mercury_non_detect_uses_half_detection_limit() {
        let measurement =
            MetalMeasurement::non_detect("Hg", Some(0.002), ConcentrationUnit::MilligramsPerLiter);
        let calc = who();

        assert_close(calc.compute_hei(&[measurement.clone()]), 0.001 / 0.006);
        assert_close(calc.compute_mi(&[measurement.clone()]), 0.001 / 0.006);

        let result = calc.calculate_at(&[measurement], fixed_now());
        let entry = &result.metal_analysis[0];
        assert_close(entry.concentration, 0.001);
        assert_close(entry.ratio, 1.0 / 6.0);
        assert_eq!(entry.flag, MetalFlag::Safe);
        assert_eq!(result.hei, 0.17);
        assert_eq!(result.mi, 0.17);
        // HPI for this sample is 16.67, which alone reaches Moderate.
        assert_eq!(result.hpi, 16.67);
        assert_eq!(result.category, PollutionCategory::Moderate);
    }

    #[test]
    fn test_concentration_at_limit_is_caution() {
        let result = who().calculate_at(&[mg("Pb", 0.01)], fixed_now());
        assert_eq!(result.metal_analysis[0].ratio, 1.0);
        assert_eq!(result.metal_analysis[0].flag, MetalFlag::Caution);
    }

    // --- exclusion rules ---------------------------------------------------

    #[test]
    fn test_unknown_metals_yield_zero_safe_result() {
        let result = who().calculate_at(&[mg("U", 0.5), mg("Sb", 1.0)], fixed_now());
        assert_eq!(result.hpi, 0.0);
        assert_eq!(result.hei, 0.0);
        assert_eq!(result.mi, 0.0);
        assert_eq!(result.category, PollutionCategory::Safe);
        assert!(result.metal_analysis.is_empty());
        // The metadata still lists every input metal.
        assert_eq!(result.calculation_details.parameters.metals, ["U", "Sb"]);
    }

    #[test]
    fn test_empty_sample_is_zero_not_nan() {
        let calc = who();
        assert_eq!(calc.compute_hpi(&[]), 0.0);
        assert_eq!(calc.compute_hei(&[]), 0.0);
        assert_eq!(calc.compute_mi(&[]), 0.0);
    }

    #[test]
    fn test_unmatched_metal_does_not_dilute_mi() {
        let calc = who();
        let with_unknown = [mg("As", 0.02), mg("U", 3.0)];
        assert_close(calc.compute_mi(&with_unknown), 2.0);
    }

    #[test]
    fn test_exclude_policy_drops_non_detect_from_mi_denominator() {
        let calc = IndexCalculator::with_policy(StandardSet::who(), NonDetectPolicy::Exclude);
        let sample = [
            mg("As", 0.02),
            MetalMeasurement::non_detect("Cd", Some(0.001), ConcentrationUnit::MilligramsPerLiter),
        ];
        assert_close(calc.compute_mi(&sample), 2.0);
        assert_eq!(calc.analyze_metals(&sample).len(), 1);
        assert_eq!(
            calc.calculate_at(&sample, fixed_now()).calculation_details.parameters.non_detect_handling,
            NonDetectPolicy::Exclude
        );
    }

    #[test]
    fn test_zero_policy_counts_non_detect_in_mi_denominator() {
        let calc = IndexCalculator::with_policy(StandardSet::who(), NonDetectPolicy::Zero);
        let sample = [
            mg("As", 0.02),
            MetalMeasurement::non_detect("Cd", Some(0.001), ConcentrationUnit::MilligramsPerLiter),
        ];
        assert_close(calc.compute_mi(&sample), 1.0);
    }

    // --- units and weighting -----------------------------------------------

    #[test]
    fn test_micrograms_are_normalized_before_ratio() {
        let sample = [MetalMeasurement::detected("As", 20.0, ConcentrationUnit::MicrogramsPerLiter)];
        let entry = &who().analyze_metals(&sample)[0];
        assert_close(entry.concentration, 0.02);
        assert_close(entry.ratio, 2.0);
    }

    #[test]
    fn test_hpi_is_weighted_by_health_weight() {
        // As at the limit (Qi 100, Wi 10), Zn at zero (Qi 0, Wi 2).
        let hpi = who().compute_hpi(&[mg("As", 0.01), mg("Zn", 0.0)]);
        assert_close(hpi, 100.0 * 10.0 / 12.0);
    }

    #[test]
    fn test_same_sample_scores_differently_under_epa() {
        let sample = [mg("Hg", 0.004)];
        let who_ratio = who().analyze_metals(&sample)[0].ratio;
        let epa_ratio = IndexCalculator::new(StandardSet::epa()).analyze_metals(&sample)[0].ratio;
        assert!(epa_ratio > who_ratio, "EPA Hg limit is stricter than WHO");
    }

    #[test]
    fn test_analysis_follows_input_order() {
        let sample = [mg("Zn", 1.0), mg("U", 1.0), mg("As", 0.001), mg("Cu", 0.5)];
        let metals: Vec<_> = who().analyze_metals(&sample).into_iter().map(|e| e.metal).collect();
        assert_eq!(metals, ["Zn", "As", "Cu"]);
    }

    // --- metadata ----------------------------------------------------------

    #[test]
    fn test_calculation_details_are_populated() {
        let result = who().calculate_at(&[mg("As", 0.001)], fixed_now());
        let details = &result.calculation_details;
        assert_eq!(details.formula, FORMULA);
        assert_eq!(details.parameters.standard, StandardFamily::Who);
        assert_eq!(details.parameters.non_detect_handling, NonDetectPolicy::HalfLod);
        assert_eq!(details.timestamp, "2024-05-01T13:00:00.000Z");
    }

    // --- batch ---------------------------------------------------------------

    fn samples() -> Vec<SampleInput> {
        (0..50)
            .map(|i| SampleInput {
                sample_id: format!("W-{:03}", i),
                concentrations: vec![mg("As", 0.001 * i as f64), mg("Pb", 0.002)],
            })
            .collect()
    }

    #[test]
    fn test_batch_preserves_order_and_pairing() {
        let input = samples();
        let output = who().batch_calculate_at(&input, fixed_now());
        assert_eq!(output.len(), input.len());
        for (sample, result) in input.iter().zip(&output) {
            assert_eq!(sample.sample_id, result.sample_id);
            assert_eq!(result.result, who().calculate_at(&sample.concentrations, fixed_now()));
        }
    }

    #[test]
    fn test_parallel_batch_matches_sequential() {
        let input = samples();
        let calc = who();
        assert_eq!(
            calc.batch_calculate_parallel_at(&input, fixed_now()),
            calc.batch_calculate_at(&input, fixed_now())
        );
    }

    #[test]
    fn test_empty_batch() {
        assert!(who().batch_calculate_at(&[], fixed_now()).is_empty());
    }

    // --- rounding ------------------------------------------------------------

    #[test]
    fn test_round2() {
        assert_eq!(round2(16.666_666), 16.67);
        assert_eq!(round2(0.166_666), 0.17);
        assert_eq!(round2(200.0), 200.0);
        assert_eq!(round2(round2(3.14159)), round2(3.14159));
    }
}
