//! Request orchestration around the calculation engine.
//!
//! `HmpiService` owns the configuration, picks the standard set a request
//! asks for, builds an `IndexCalculator` with the configured non-detect
//! policy, and wraps results in the response shapes of `ingest::request`.
//! It is also the layer that logs; the engine does not.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::analysis::IndexCalculator;
use crate::config::ServiceConfig;
use crate::export;
use crate::ingest::csv_upload;
use crate::ingest::request::{
    self, BatchRequest, BatchResponse, CalculateRequest, CalculateResponse, ExportRequest,
    StandardsResponse, UploadResponse,
};
use crate::logging::{self, Component};
use crate::model::{HmpiError, Result, SampleInput, SampleResult};
use crate::standards::StandardSet;

/// Selector naming the configured custom standard set.
pub const CUSTOM_STANDARD: &str = "CUSTOM";

pub struct HmpiService {
    config: ServiceConfig,
    custom: Option<Arc<StandardSet>>,
}

impl HmpiService {
    /// Builds the service, validating custom standard rows and the default
    /// standard name up front.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let custom = config.custom_standard_set()?;
        let service = Self { config, custom };
        service.resolve_standard(&service.config.engine.default_standard)?;
        Ok(service)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Resolves WHO, EPA or CUSTOM (case-insensitive) to a standard set.
    pub fn resolve_standard(&self, name: &str) -> Result<Arc<StandardSet>> {
        if name.trim().eq_ignore_ascii_case(CUSTOM_STANDARD) {
            return self
                .custom
                .clone()
                .ok_or_else(|| HmpiError::UnknownStandard(format!("{} (no custom standards configured)", name)));
        }
        StandardSet::by_name(name)
    }

    /// Standard set for a calculation request.
    ///
    /// Calculation is permissive about the selector: an unknown name falls
    /// back to the default standard with a warning.
    fn standard_for_request(&self, selector: Option<&str>) -> (String, Arc<StandardSet>) {
        let default_name = self.config.engine.default_standard.trim().to_ascii_uppercase();
        if let Some(name) = selector {
            match self.resolve_standard(name) {
                Ok(set) => return (name.trim().to_ascii_uppercase(), set),
                Err(_) => logging::warn(
                    Component::Service,
                    None,
                    &format!("unknown standard '{}', using {}", name, default_name),
                ),
            }
        }
        // Checked in `new`.
        let set = self
            .resolve_standard(&default_name)
            .unwrap_or_else(|_| StandardSet::who());
        (default_name, set)
    }

    pub fn calculator(&self, standards: Arc<StandardSet>) -> IndexCalculator {
        IndexCalculator::with_policy(standards, self.config.engine.non_detect_policy)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    pub fn calculate(&self, request: CalculateRequest) -> Result<CalculateResponse> {
        self.calculate_at(request, Utc::now())
    }

    pub fn calculate_at(&self, request: CalculateRequest, now: DateTime<Utc>) -> Result<CalculateResponse> {
        if let Err(e) = request::validate_measurements("concentrations", &request.concentrations) {
            logging::log_rejected_request("calculate", &e);
            return Err(e);
        }

        let (standard, set) = self.standard_for_request(request.standard.as_deref());
        let result = self.calculator(set).calculate_at(&request.concentrations, now);
        logging::debug(
            Component::Service,
            None,
            &format!(
                "calculated {} metals against {}: {}",
                result.metal_analysis.len(),
                standard,
                result.category
            ),
        );

        Ok(CalculateResponse {
            success: true,
            result,
            standard,
        })
    }

    pub fn batch(&self, request: BatchRequest) -> Result<BatchResponse> {
        self.batch_at(request, Utc::now())
    }

    pub fn batch_at(&self, request: BatchRequest, now: DateTime<Utc>) -> Result<BatchResponse> {
        if let Err(e) = request::validate_samples(&request.samples) {
            logging::log_rejected_request("batch", &e);
            return Err(e);
        }

        let (standard, set) = self.standard_for_request(request.standard.as_deref());
        let results = self.run_batch(&self.calculator(set), &request.samples, now);

        Ok(BatchResponse {
            success: true,
            total: results.len(),
            results,
            standard,
        })
    }

    fn run_batch(&self, calculator: &IndexCalculator, samples: &[SampleInput], now: DateTime<Utc>) -> Vec<SampleResult> {
        let results = if self.config.engine.parallel_batch {
            calculator.batch_calculate_parallel_at(samples, now)
        } else {
            calculator.batch_calculate_at(samples, now)
        };
        logging::log_batch_summary(Component::Engine, &results);
        results
    }

    /// Reference table lookup. Unlike calculation, an unknown name is an error.
    pub fn standards(&self, name: &str) -> Result<StandardsResponse> {
        match self.resolve_standard(name) {
            Ok(set) => Ok(StandardsResponse {
                standards: set.rows().to_vec(),
                kind: name.trim().to_ascii_uppercase(),
            }),
            Err(e) => {
                logging::log_rejected_request("standards", &e);
                Err(e)
            }
        }
    }

    pub fn upload_csv(&self, text: &str) -> Result<UploadResponse> {
        self.upload_csv_at(text, Utc::now())
    }

    /// Parses an upload and batch-calculates it against the default standard.
    pub fn upload_csv_at(&self, text: &str, now: DateTime<Utc>) -> Result<UploadResponse> {
        let uploaded = match csv_upload::parse_upload(text, now.date_naive()) {
            Ok(samples) => samples,
            Err(e) => {
                logging::log_rejected_request("upload", &e);
                return Err(e);
            }
        };
        let inputs: Vec<SampleInput> = uploaded.iter().map(|s| s.to_input()).collect();
        logging::info(
            Component::Ingest,
            None,
            &format!("parsed {} samples from upload", inputs.len()),
        );

        let (_, set) = self.standard_for_request(None);
        let results = self.run_batch(&self.calculator(set), &inputs, now);

        Ok(UploadResponse {
            success: true,
            message: format!("Processed {} samples", inputs.len()),
            samples: inputs.len(),
            results,
            sites: uploaded.iter().map(|s| s.site()).collect(),
            processed_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }

    /// CSV summary of previously computed results, in request order.
    pub fn export(&self, request: &ExportRequest) -> String {
        let results: Vec<_> = request.results.iter().map(|e| e.result.clone()).collect();
        logging::debug(
            Component::Export,
            None,
            &format!("exporting {} results", results.len()),
        );
        export::export_csv(&results)
    }

    // ------------------------------------------------------------------
    // JSON entry points
    // ------------------------------------------------------------------

    pub fn handle_calculate_json(&self, body: &str) -> Result<CalculateResponse> {
        let request = request::parse_calculate_request(body)
            .inspect_err(|e| logging::log_rejected_request("calculate", e))?;
        self.calculate(request)
    }

    pub fn handle_batch_json(&self, body: &str) -> Result<BatchResponse> {
        let request = request::parse_batch_request(body)
            .inspect_err(|e| logging::log_rejected_request("batch", e))?;
        self.batch(request)
    }

    pub fn handle_export_json(&self, body: &str) -> Result<String> {
        let request = request::parse_export_request(body)
            .inspect_err(|e| logging::log_rejected_request("export", e))?;
        Ok(self.export(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ConcentrationUnit, MetalMeasurement, NonDetectPolicy, PollutionCategory, RegulatoryStandard,
        StandardFamily,
    };
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn service() -> HmpiService {
        HmpiService::new(ServiceConfig::default()).expect("default config is valid")
    }

    fn request(standard: Option<&str>, measurements: Vec<MetalMeasurement>) -> CalculateRequest {
        CalculateRequest {
            concentrations: measurements,
            standard: standard.map(str::to_string),
        }
    }

    fn mg(metal: &str, c: f64) -> MetalMeasurement {
        MetalMeasurement::detected(metal, c, ConcentrationUnit::MilligramsPerLiter)
    }

    #[test]
    fn test_calculate_defaults_to_who() {
        let response = service().calculate_at(request(None, vec![mg("Hg", 0.004)]), fixed_now()).unwrap();
        assert!(response.success);
        assert_eq!(response.standard, "WHO");
        assert_eq!(response.result.calculation_details.parameters.standard, StandardFamily::Who);
    }

    #[test]
    fn test_calculate_with_epa_selector() {
        let response = service()
            .calculate_at(request(Some("epa"), vec![mg("Hg", 0.004)]), fixed_now())
            .unwrap();
        assert_eq!(response.standard, "EPA");
        assert_eq!(response.result.hei, 2.0);
    }

    #[test]
    fn test_unknown_selector_falls_back_to_default() {
        let response = service()
            .calculate_at(request(Some("ISO"), vec![mg("As", 0.02)]), fixed_now())
            .unwrap();
        assert_eq!(response.standard, "WHO");
        assert_eq!(response.result.category, PollutionCategory::Hazardous);
    }

    #[test]
    fn test_negative_concentration_is_rejected() {
        let err = service()
            .calculate_at(request(None, vec![mg("As", -1.0)]), fixed_now())
            .unwrap_err();
        assert!(matches!(err, HmpiError::InvalidRequest(_)));
    }

    #[test]
    fn test_standards_lookup_rejects_unknown_name() {
        let svc = service();
        let who = svc.standards("who").unwrap();
        assert_eq!(who.kind, "WHO");
        assert_eq!(who.standards.len(), 10);
        assert!(matches!(svc.standards("ISO"), Err(HmpiError::UnknownStandard(_))));
        assert!(svc.standards("custom").is_err(), "no custom rows configured");
    }

    #[test]
    fn test_custom_standard_set_from_config() {
        let mut config = ServiceConfig::default();
        config.custom_standards = vec![RegulatoryStandard {
            metal: "As".into(),
            permissible_limit: 0.05,
            health_weight: 10.0,
            standard: StandardFamily::Is10500,
        }];
        let svc = HmpiService::new(config).unwrap();

        let response = svc
            .calculate_at(request(Some("CUSTOM"), vec![mg("As", 0.02)]), fixed_now())
            .unwrap();
        assert_eq!(response.standard, "CUSTOM");
        assert_eq!(response.result.hei, 0.4);
        assert_eq!(response.result.calculation_details.parameters.standard, StandardFamily::Is10500);
    }

    #[test]
    fn test_invalid_default_standard_fails_construction() {
        let mut config = ServiceConfig::default();
        config.engine.default_standard = "ISO".into();
        assert!(HmpiService::new(config).is_err());
    }

    #[test]
    fn test_configured_policy_reaches_engine() {
        let mut config = ServiceConfig::default();
        config.engine.non_detect_policy = NonDetectPolicy::Exclude;
        let svc = HmpiService::new(config).unwrap();
        let nd = MetalMeasurement::non_detect("Hg", Some(0.002), ConcentrationUnit::MilligramsPerLiter);

        let response = svc.calculate_at(request(None, vec![nd]), fixed_now()).unwrap();
        assert!(response.result.metal_analysis.is_empty());
        assert_eq!(response.result.calculation_details.parameters.non_detect_handling, NonDetectPolicy::Exclude);
    }

    #[test]
    fn test_parallel_and_sequential_batches_agree() {
        let samples: Vec<SampleInput> = (0..20)
            .map(|i| SampleInput {
                sample_id: format!("S{}", i),
                concentrations: vec![mg("Pb", 0.001 * i as f64)],
            })
            .collect();
        let sequential = service()
            .batch_at(BatchRequest { samples: samples.clone(), standard: None }, fixed_now())
            .unwrap();

        let mut config = ServiceConfig::default();
        config.engine.parallel_batch = true;
        let parallel = HmpiService::new(config)
            .unwrap()
            .batch_at(BatchRequest { samples, standard: None }, fixed_now())
            .unwrap();

        assert_eq!(sequential.total, 20);
        assert_eq!(sequential.results, parallel.results);
    }

    #[test]
    fn test_upload_is_calculated_against_default_standard() {
        let response = service()
            .upload_csv_at("sample_id,as,hg\nW-1,0.02,ND\nW-2,0.001,0.0001", fixed_now())
            .unwrap();
        assert_eq!(response.samples, 2);
        assert_eq!(response.message, "Processed 2 samples");
        assert_eq!(response.results[0].sample_id, "W-1");
        assert_eq!(response.results[0].result.category, PollutionCategory::Hazardous);
        assert_eq!(response.processed_at, "2024-05-01T13:00:00.000Z");
        assert_eq!(response.sites.len(), 2);
        assert_eq!(response.sites[1].sample_id, "W-2");
        assert_eq!(response.sites[1].date, "2024-05-01");
    }

    #[test]
    fn test_export_json_round_trip_through_service() {
        let svc = service();
        let batch = svc
            .batch_at(
                BatchRequest {
                    samples: vec![SampleInput { sample_id: "W-1".into(), concentrations: vec![mg("Cd", 0.01)] }],
                    standard: None,
                },
                fixed_now(),
            )
            .unwrap();
        let body = serde_json::json!({ "results": batch.results }).to_string();
        let csv = svc.handle_export_json(&body).unwrap();
        assert_eq!(csv.lines().nth(1), Some("Sample_1,333.33,3.33,3.33,Hazardous,1,Cd"));
    }
}
