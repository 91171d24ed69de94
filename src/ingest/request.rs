/// JSON request and response shapes exchanged with the web layer.
///
/// Parsing here is where structurally invalid input is rejected: bodies
/// that are not the expected shape, measurements with an empty metal
/// symbol, negative or out-of-range concentrations and detection limits
/// (see `units::MAX_MG_PER_L`). Anything that passes is handed to the
/// engine, which is permissive about the rest (unknown metals and units).

use serde::{Deserialize, Serialize};

use crate::analysis::units;
use crate::ingest::csv_upload::SampleSite;
use crate::model::{
    HmpiError, IndexResult, MetalMeasurement, RegulatoryStandard, Result, SampleInput,
    SampleResult,
};

// ============================================================================
// Requests
// ============================================================================

/// Single-sample calculation: `{ concentrations, standard? }`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculateRequest {
    pub concentrations: Vec<MetalMeasurement>,
    #[serde(default)]
    pub standard: Option<String>,
}

/// Batch calculation: `{ samples: [{sampleId, concentrations}], standard? }`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub samples: Vec<SampleInput>,
    #[serde(default)]
    pub standard: Option<String>,
}

/// Export of earlier batch output: `{ results: [{sampleId?, result}] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    pub results: Vec<ExportEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEntry {
    #[serde(default)]
    pub sample_id: Option<String>,
    pub result: IndexResult,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CalculateResponse {
    pub success: bool,
    pub result: IndexResult,
    pub standard: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub results: Vec<SampleResult>,
    pub standard: String,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandardsResponse {
    pub standards: Vec<RegulatoryStandard>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub samples: usize,
    pub results: Vec<SampleResult>,
    /// Site metadata per sample, in the same order as `results`.
    pub sites: Vec<SampleSite>,
    pub processed_at: String,
}

/// Body returned alongside a client or server error.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&HmpiError> for ErrorResponse {
    fn from(err: &HmpiError) -> Self {
        Self { error: err.to_string() }
    }
}

// ============================================================================
// Parsing and validation
// ============================================================================

fn parse_json<'a, T: Deserialize<'a>>(body: &'a str, what: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| HmpiError::InvalidRequest(format!("invalid {} data: {}", what, e)))
}

pub fn parse_calculate_request(body: &str) -> Result<CalculateRequest> {
    let request: CalculateRequest = parse_json(body, "concentrations")?;
    validate_measurements("concentrations", &request.concentrations)?;
    Ok(request)
}

pub fn parse_batch_request(body: &str) -> Result<BatchRequest> {
    let request: BatchRequest = parse_json(body, "samples")?;
    validate_samples(&request.samples)?;
    Ok(request)
}

pub fn parse_export_request(body: &str) -> Result<ExportRequest> {
    parse_json(body, "results")
}

pub fn validate_samples(samples: &[SampleInput]) -> Result<()> {
    for (i, sample) in samples.iter().enumerate() {
        if sample.sample_id.trim().is_empty() {
            return Err(HmpiError::InvalidRequest(format!("samples[{}]: sampleId is empty", i)));
        }
        validate_measurements(&format!("samples[{}].concentrations", i), &sample.concentrations)?;
    }
    Ok(())
}

/// Checks the fields the engine assumes are well-formed.
///
/// Unknown metals and units are not checked; the engine skips or passes
/// them through.
pub fn validate_measurements(path: &str, measurements: &[MetalMeasurement]) -> Result<()> {
    for (i, m) in measurements.iter().enumerate() {
        if m.metal.trim().is_empty() {
            return Err(HmpiError::InvalidRequest(format!("{}[{}]: metal is empty", path, i)));
        }
        if !units::in_accepted_range(m.concentration, &m.unit) {
            return Err(HmpiError::InvalidRequest(format!(
                "{}[{}]: concentration must be a non-negative number of at most {} mg/L, got {} {}",
                path, i, units::MAX_MG_PER_L, m.concentration, m.unit
            )));
        }
        if let Some(lod) = m.detection_limit {
            if !(lod.is_finite() && (0.0..=units::MAX_MG_PER_L).contains(&lod)) {
                return Err(HmpiError::InvalidRequest(format!(
                    "{}[{}]: detectionLimit must be a non-negative number of at most {} mg/L, got {}",
                    path, i, units::MAX_MG_PER_L, lod
                )));
            }
        }
    }
    Ok(())
}
