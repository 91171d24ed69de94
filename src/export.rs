//! Flat tabular export of index results.
//!
//! One row per result, in input order:
//!   Sample,HPI,HEI,MI,Category,Metals_Analyzed,High_Risk_Metals
//!
//! `High_Risk_Metals` is the `;`-joined list of metals flagged `Exceeded`,
//! or the literal `None`. Consumers depend on this exact shape.

use serde::Serialize;

use crate::model::{IndexResult, PollutionCategory};

pub const CSV_HEADER: [&str; 7] = [
    "Sample",
    "HPI",
    "HEI",
    "MI",
    "Category",
    "Metals_Analyzed",
    "High_Risk_Metals",
];

/// Sentinel written when no metal exceeded its limit.
pub const NO_HIGH_RISK: &str = "None";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    /// Ordinal label, `Sample_1` for the first result.
    pub sample: String,
    pub hpi: f64,
    pub hei: f64,
    pub mi: f64,
    pub category: PollutionCategory,
    pub metals_analyzed: usize,
    pub high_risk_metals: String,
}

impl SummaryRow {
    fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.sample,
            self.hpi,
            self.hei,
            self.mi,
            self.category,
            self.metals_analyzed,
            self.high_risk_metals
        )
    }
}

pub fn export_summary(results: &[IndexResult]) -> Vec<SummaryRow> {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let exceeded = result.exceeded_metals();
            SummaryRow {
                sample: format!("Sample_{}", i + 1),
                hpi: result.hpi,
                hei: result.hei,
                mi: result.mi,
                category: result.category,
                metals_analyzed: result.metal_analysis.len(),
                high_risk_metals: if exceeded.is_empty() {
                    NO_HIGH_RISK.to_string()
                } else {
                    exceeded.join(";")
                },
            }
        })
        .collect()
}

/// Header line plus one line per row, `\n`-separated, no trailing newline.
pub fn summary_to_csv(rows: &[SummaryRow]) -> String {
    std::iter::once(CSV_HEADER.join(","))
        .chain(rows.iter().map(SummaryRow::to_csv_line))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn export_csv(results: &[IndexResult]) -> String {
    summary_to_csv(&export_summary(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::IndexCalculator;
    use crate::model::{ConcentrationUnit, MetalMeasurement};
    use crate::standards::StandardSet;
    use chrono::{TimeZone, Utc};

    fn result_for(measurements: &[(&str, f64)]) -> IndexResult {
        let sample: Vec<_> = measurements
            .iter()
            .map(|(metal, c)| MetalMeasurement::detected(metal, *c, ConcentrationUnit::MilligramsPerLiter))
            .collect();
        IndexCalculator::new(StandardSet::who())
            .calculate_at(&sample, Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap())
    }

    #[test]
    fn test_empty_export_is_header_only() {
        assert_eq!(
            export_csv(&[]),
            "Sample,HPI,HEI,MI,Category,Metals_Analyzed,High_Risk_Metals"
        );
    }

    #[test]
    fn test_row_shape_for_arsenic_exceedance() {
        let csv = export_csv(&[result_for(&[("As", 0.02)])]);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "Sample_1,200,2,2,Hazardous,1,As");
    }

    #[test]
    fn test_none_sentinel_when_nothing_exceeded() {
        let rows = export_summary(&[result_for(&[("Cu", 0.1), ("Zn", 0.2)])]);
        assert_eq!(rows[0].high_risk_metals, NO_HIGH_RISK);
        assert_eq!(rows[0].metals_analyzed, 2);
        assert_eq!(rows[0].category, PollutionCategory::Safe);
    }

    #[test]
    fn test_multiple_exceeded_metals_are_semicolon_joined() {
        let rows = export_summary(&[result_for(&[("Pb", 0.05), ("Cu", 0.1), ("Cd", 0.01)])]);
        assert_eq!(rows[0].high_risk_metals, "Pb;Cd");
    }

    #[test]
    fn test_labels_are_ordinal_and_order_preserving() {
        let rows = export_summary(&[
            result_for(&[("As", 0.02)]),
            result_for(&[]),
            result_for(&[("Cu", 0.1)]),
        ]);
        let labels: Vec<_> = rows.iter().map(|r| r.sample.as_str()).collect();
        assert_eq!(labels, ["Sample_1", "Sample_2", "Sample_3"]);
        assert_eq!(rows[0].category, PollutionCategory::Hazardous);
        assert_eq!(rows[1].metals_analyzed, 0);
    }

    #[test]
    fn test_no_trailing_newline() {
        assert!(!export_csv(&[result_for(&[("As", 0.001)])]).ends_with('\n'));
    }
}
