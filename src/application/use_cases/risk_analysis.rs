// ============================================================
// RISK ANALYSIS USE CASE
// ============================================================
// Received -> Parsed -> Classified -> Scored -> Serialized

use std::time::Instant;

use tracing::{info, warn};

use crate::application::use_cases::column_classifier;
use crate::application::use_cases::risk_engine::RiskEngine;
use crate::domain::column_role::ColumnRole;
use crate::domain::error::AppError;
use crate::domain::pipeline::{PipelineError, PipelineStage};
use crate::domain::risk::{RiskRecord, RiskSummary};
use crate::infrastructure::csv::{CsvParser, CsvWriter};

/// Suggested download name for the enriched table
pub const OUTPUT_FILENAME: &str = "risk_analysis.csv";

/// Everything produced for one upload
#[derive(Debug, Clone)]
pub struct RiskAnalysis {
    pub role: ColumnRole,
    pub records: Vec<RiskRecord>,

    /// Enriched table in the upload's delimited format
    pub csv: Vec<u8>,

    pub processing_time_ms: u64,
}

impl RiskAnalysis {
    pub fn summary(&self) -> RiskSummary {
        RiskSummary::from_records(&self.records)
    }
}

pub struct RiskAnalysisUseCase {
    engine: RiskEngine,
}

impl RiskAnalysisUseCase {
    pub fn new(engine: RiskEngine) -> Self {
        Self { engine }
    }

    /// Run the whole pipeline over an uploaded payload
    pub fn execute(&self, payload: &[u8]) -> Result<RiskAnalysis, PipelineError> {
        let start = Instant::now();
        let mut stage = PipelineStage::Received;

        let result = self.run(payload, &mut stage);
        match &result {
            Ok(analysis) => info!(
                samples = analysis.records.len(),
                analytes = analysis.role.analytes.len(),
                sample_column = %analysis.role.sample_identifier,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "risk analysis completed"
            ),
            Err(err) => warn!(
                stage = %err.stage,
                kind = err.error.kind(),
                error = %err.error,
                "risk analysis failed"
            ),
        }
        result.map(|mut analysis| {
            analysis.processing_time_ms = start.elapsed().as_millis() as u64;
            analysis
        })
    }

    fn run(
        &self,
        payload: &[u8],
        stage: &mut PipelineStage,
    ) -> Result<RiskAnalysis, PipelineError> {
        let fail = |stage: PipelineStage| move |error: AppError| PipelineError::new(stage, error);

        let dataset = CsvParser::new()
            .parse_bytes(payload)
            .map_err(fail(*stage))?;
        *stage = PipelineStage::Parsed;

        let role = column_classifier::classify(&dataset.headers).map_err(fail(*stage))?;
        *stage = PipelineStage::Classified;

        let records = self
            .engine
            .compute(&dataset, &role)
            .map_err(fail(*stage))?;
        *stage = PipelineStage::Scored;

        let table = RiskEngine::enrich(&dataset, &role, &records);
        let csv = CsvWriter::new(dataset.delimiter)
            .write(&table)
            .map_err(fail(*stage))?;
        *stage = PipelineStage::Serialized;

        Ok(RiskAnalysis {
            role,
            records,
            csv,
            processing_time_ms: 0,
        })
    }
}

impl Default for RiskAnalysisUseCase {
    fn default() -> Self {
        Self::new(RiskEngine::default())
    }
}
