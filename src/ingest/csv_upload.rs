/// Wide-format CSV upload parsing
///
/// Field teams upload one row per sample with a column per metal:
///
/// ```text
/// sample_id,location_name,latitude,longitude,date,unit,as,pb,hg,lod_hg
/// W-01,North well,22.57,88.36,2024-03-02,mg/L,0.02,0.004,ND,0.002
/// ```
///
/// Headers are case-insensitive. A metal column may also be named
/// `<metal>_concentration`. `ND` (or `<0.001`) marks a non-detect whose
/// limit comes from `lod_<metal>`, defaulting to 0.001. A leading UTF-8
/// byte order mark, as written by spreadsheet exports, is ignored.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::analysis::units;
use crate::logging::{self, Component};
use crate::model::{ConcentrationUnit, HmpiError, MetalMeasurement, Result, SampleInput};

/// Lower-case column key and canonical symbol for every metal read from uploads.
pub const UPLOAD_METALS: [(&str, &str); 10] = [
    ("as", "As"),
    ("pb", "Pb"),
    ("cd", "Cd"),
    ("cr", "Cr"),
    ("hg", "Hg"),
    ("ni", "Ni"),
    ("cu", "Cu"),
    ("zn", "Zn"),
    ("fe", "Fe"),
    ("mn", "Mn"),
];

/// Detection limit assumed when a non-detect has no `lod_<metal>` value.
pub const DEFAULT_DETECTION_LIMIT: f64 = 0.001;

const NON_DETECT_MARKERS: [&str; 2] = ["ND", "<0.001"];

// ============================================================================
// Parsed Sample
// ============================================================================

/// Where and when a sample was taken, echoed back in the upload response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSite {
    pub sample_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
    pub location: String,
}

/// One uploaded sample with its site metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedSample {
    pub sample_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
    pub location: String,
    pub concentrations: Vec<MetalMeasurement>,
}

impl UploadedSample {
    pub fn to_input(&self) -> SampleInput {
        SampleInput {
            sample_id: self.sample_id.clone(),
            concentrations: self.concentrations.clone(),
        }
    }

    pub fn site(&self) -> SampleSite {
        SampleSite {
            sample_id: self.sample_id.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            date: self.date.clone(),
            location: self.location.clone(),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses an upload into samples. Rows without any usable metal reading
/// are dropped; so are rows with fewer fields than the header.
///
/// `today` fills in the date of rows that have none.
pub fn parse_upload(text: &str, today: NaiveDate) -> Result<Vec<UploadedSample>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines();
    let headers: Vec<String> = match lines.next() {
        Some(line) if !line.trim().is_empty() => {
            line.split(',').map(|h| h.trim().to_lowercase()).collect()
        }
        _ => return Err(HmpiError::Csv("upload has no header row".to_string())),
    };

    let data_rows = lines
        .map(|line| line.split(',').collect::<Vec<_>>())
        .filter(|fields| fields.len() > 1);

    let mut samples = Vec::new();
    for (i, fields) in data_rows.enumerate() {
        if fields.len() < headers.len() {
            logging::debug(
                Component::Ingest,
                None,
                &format!("row {} skipped: {} of {} fields", i + 1, fields.len(), headers.len()),
            );
            continue;
        }

        let row: HashMap<&str, &str> = headers
            .iter()
            .map(String::as_str)
            .zip(fields.iter().map(|f| f.trim()))
            .collect();

        let sample = parse_row(&row, i, today);
        if sample.concentrations.is_empty() {
            logging::debug(
                Component::Ingest,
                Some(&sample.sample_id),
                "row skipped: no metal readings",
            );
            continue;
        }
        samples.push(sample);
    }

    Ok(samples)
}

fn non_empty<'a>(row: &HashMap<&str, &'a str>, key: &str) -> Option<&'a str> {
    row.get(key).copied().filter(|v| !v.is_empty())
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_row(row: &HashMap<&str, &str>, index: usize, today: NaiveDate) -> UploadedSample {
    let unit = non_empty(row, "unit")
        .map(ConcentrationUnit::from)
        .unwrap_or_default();

    let concentrations = UPLOAD_METALS
        .iter()
        .filter_map(|(key, symbol)| {
            let value = non_empty(row, key)
                .or_else(|| non_empty(row, &format!("{}_concentration", key)))?;
            parse_reading(row, key, symbol, value, &unit)
        })
        .collect();

    UploadedSample {
        sample_id: non_empty(row, "sample_id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Sample_{}", index + 1)),
        latitude: parse_number(non_empty(row, "latitude")).unwrap_or(0.0),
        longitude: parse_number(non_empty(row, "longitude")).unwrap_or(0.0),
        date: non_empty(row, "date")
            .map(str::to_string)
            .unwrap_or_else(|| today.format("%Y-%m-%d").to_string()),
        location: non_empty(row, "location_name").unwrap_or_default().to_string(),
        concentrations,
    }
}

fn parse_reading(
    row: &HashMap<&str, &str>,
    key: &str,
    symbol: &str,
    value: &str,
    unit: &ConcentrationUnit,
) -> Option<MetalMeasurement> {
    if NON_DETECT_MARKERS.contains(&value) {
        let lod = parse_number(non_empty(row, &format!("lod_{}", key)))
            .filter(|lod| *lod > 0.0 && *lod <= units::MAX_MG_PER_L)
            .unwrap_or(DEFAULT_DETECTION_LIMIT);
        return Some(MetalMeasurement::non_detect(symbol, Some(lod), unit.clone()));
    }

    parse_number(Some(value))
        .filter(|c| units::in_accepted_range(*c, unit))
        .map(|c| MetalMeasurement::detected(symbol, c, unit.clone()))
}
