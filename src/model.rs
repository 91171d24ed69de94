/// Core data types for the heavy-metal pollution index service.
///
/// This module defines the shared domain model imported by all other modules:
/// measurements as they arrive from the field, regulatory reference rows,
/// and the structured result of one index calculation. It contains no
/// calculation logic and no I/O.
///
/// Serialized field names follow the JSON boundary used by the web layer
/// (`isNonDetect`, `permissibleLimit`, `metalAnalysis`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Unit tag attached to a reported concentration.
///
/// Unrecognized tags are kept verbatim in `Other` rather than rejected;
/// field data arrives with all sorts of spellings and the normalizer treats
/// anything it does not know as already being mg/L.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConcentrationUnit {
    #[default]
    MilligramsPerLiter,
    MicrogramsPerLiter,
    PartsPerBillion,
    PartsPerMillion,
    Other(String),
}

impl From<&str> for ConcentrationUnit {
    fn from(tag: &str) -> Self {
        match tag.trim() {
            "mg/L" => ConcentrationUnit::MilligramsPerLiter,
            "ug/L" | "µg/L" | "μg/L" => ConcentrationUnit::MicrogramsPerLiter,
            "ppb" => ConcentrationUnit::PartsPerBillion,
            "ppm" => ConcentrationUnit::PartsPerMillion,
            other => ConcentrationUnit::Other(other.to_string()),
        }
    }
}

impl From<String> for ConcentrationUnit {
    fn from(tag: String) -> Self {
        ConcentrationUnit::from(tag.as_str())
    }
}

impl From<ConcentrationUnit> for String {
    fn from(unit: ConcentrationUnit) -> Self {
        unit.to_string()
    }
}

impl fmt::Display for ConcentrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcentrationUnit::MilligramsPerLiter => write!(f, "mg/L"),
            ConcentrationUnit::MicrogramsPerLiter => write!(f, "ug/L"),
            ConcentrationUnit::PartsPerBillion => write!(f, "ppb"),
            ConcentrationUnit::PartsPerMillion => write!(f, "ppm"),
            ConcentrationUnit::Other(tag) => write!(f, "{}", tag),
        }
    }
}

// ---------------------------------------------------------------------------
// Measurement types
// ---------------------------------------------------------------------------

/// A single heavy-metal reading for one water sample.
///
/// `detection_limit` is only consulted when `is_non_detect` is set, and is
/// taken as-is (mg/L); it is not run through the unit normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalMeasurement {
    pub metal: String,
    pub concentration: f64,
    #[serde(default)]
    pub unit: ConcentrationUnit,
    #[serde(default)]
    pub is_non_detect: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_limit: Option<f64>,
}

impl MetalMeasurement {
    /// A detected reading in the given unit.
    pub fn detected(metal: &str, concentration: f64, unit: ConcentrationUnit) -> Self {
        Self {
            metal: metal.to_string(),
            concentration,
            unit,
            is_non_detect: false,
            detection_limit: None,
        }
    }

    /// A reading below the instrument's detection limit.
    pub fn non_detect(metal: &str, detection_limit: Option<f64>, unit: ConcentrationUnit) -> Self {
        Self {
            metal: metal.to_string(),
            concentration: 0.0,
            unit,
            is_non_detect: true,
            detection_limit,
        }
    }
}

/// One sample's measurements, keyed by the caller's sample identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleInput {
    pub sample_id: String,
    pub concentrations: Vec<MetalMeasurement>,
}

// ---------------------------------------------------------------------------
// Regulatory reference types
// ---------------------------------------------------------------------------

/// Regulatory regime a standard row comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardFamily {
    #[serde(rename = "WHO")]
    Who,
    #[serde(rename = "EPA")]
    Epa,
    #[serde(rename = "IS_10500")]
    Is10500,
    Custom,
}

impl fmt::Display for StandardFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StandardFamily::Who => write!(f, "WHO"),
            StandardFamily::Epa => write!(f, "EPA"),
            StandardFamily::Is10500 => write!(f, "IS_10500"),
            StandardFamily::Custom => write!(f, "Custom"),
        }
    }
}

/// Permissible limit and health weight for one metal under one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulatoryStandard {
    pub metal: String,
    /// Maximum permissible concentration, in mg/L.
    pub permissible_limit: f64,
    /// Relative health significance used as the HPI weight.
    pub health_weight: f64,
    pub standard: StandardFamily,
}

// ---------------------------------------------------------------------------
// Non-detect policy
// ---------------------------------------------------------------------------

/// How a reading flagged as below detection limit is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonDetectPolicy {
    /// Treat the reading as zero.
    Zero,
    /// Half the detection limit (0 when no limit was reported).
    #[default]
    HalfLod,
    /// The detection limit itself (0 when no limit was reported).
    Lod,
    /// Drop the reading from every index.
    Exclude,
}

impl NonDetectPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            NonDetectPolicy::Zero => "zero",
            NonDetectPolicy::HalfLod => "half_lod",
            NonDetectPolicy::Lod => "lod",
            NonDetectPolicy::Exclude => "exclude",
        }
    }
}

impl fmt::Display for NonDetectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NonDetectPolicy {
    type Err = HmpiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(NonDetectPolicy::Zero),
            "half_lod" => Ok(NonDetectPolicy::HalfLod),
            "lod" => Ok(NonDetectPolicy::Lod),
            "exclude" => Ok(NonDetectPolicy::Exclude),
            other => Err(HmpiError::Config(format!(
                "unknown non-detect policy '{}' (expected zero, half_lod, lod or exclude)",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Per-metal verdict based on the concentration-to-limit ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetalFlag {
    Safe,
    Caution,
    Exceeded,
}

impl fmt::Display for MetalFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetalFlag::Safe => write!(f, "Safe"),
            MetalFlag::Caution => write!(f, "Caution"),
            MetalFlag::Exceeded => write!(f, "Exceeded"),
        }
    }
}

/// Overall pollution category of a sample, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PollutionCategory {
    Safe,
    Moderate,
    Poor,
    Hazardous,
}

impl fmt::Display for PollutionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollutionCategory::Safe => write!(f, "Safe"),
            PollutionCategory::Moderate => write!(f, "Moderate"),
            PollutionCategory::Poor => write!(f, "Poor"),
            PollutionCategory::Hazardous => write!(f, "Hazardous"),
        }
    }
}

/// Computed breakdown for one metal of one sample.
///
/// `concentration` is the resolved value in mg/L (unit-normalized and
/// non-detect adjusted), never the raw reported figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalAnalysisEntry {
    pub metal: String,
    pub concentration: f64,
    pub permissible_limit: f64,
    pub ratio: f64,
    pub contribution: f64,
    pub flag: MetalFlag,
}

/// What went into a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationParameters {
    pub standard: StandardFamily,
    pub non_detect_handling: NonDetectPolicy,
    /// Metal symbols of every input measurement, in input order.
    pub metals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationDetails {
    pub formula: String,
    pub parameters: CalculationParameters,
    /// RFC 3339 generation time.
    pub timestamp: String,
}

/// Index values, category and per-metal breakdown for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResult {
    pub hpi: f64,
    pub hei: f64,
    pub mi: f64,
    pub category: PollutionCategory,
    pub metal_analysis: Vec<MetalAnalysisEntry>,
    pub calculation_details: CalculationDetails,
}

impl IndexResult {
    /// Symbols of metals flagged `Exceeded`, in analysis order.
    pub fn exceeded_metals(&self) -> Vec<&str> {
        self.metal_analysis
            .iter()
            .filter(|m| m.flag == MetalFlag::Exceeded)
            .map(|m| m.metal.as_str())
            .collect()
    }
}

/// A batch output entry pairing a result with its sample identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResult {
    pub sample_id: String,
    pub result: IndexResult,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised outside the calculation engine: building standard sets,
/// validating requests, loading configuration, parsing uploads.
///
/// The engine operations themselves never fail.
#[derive(Debug, thiserror::Error)]
pub enum HmpiError {
    /// Structurally invalid input, rejected before it reaches the engine.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// The requested standard set is not known.
    #[error("Unknown standard: {0}")]
    UnknownStandard(String),
    /// A standard set listed the same metal twice.
    #[error("Duplicate standard row for metal: {0}")]
    DuplicateStandard(String),
    #[error("Invalid standard for {metal}: {reason}")]
    InvalidStandard { metal: String, reason: String },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HmpiError>;
