// ============================================================
// RISK ENGINE
// ============================================================
// Normalise analyte cells, derive dose and risk metrics, assign a tier

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::column_role::{ColumnRole, CANONICAL_SAMPLE_COLUMN};
use crate::domain::dataset::Dataset;
use crate::domain::error::{AppError, Result};
use crate::domain::risk::{
    format_number, EnrichedTable, ExposureModel, RiskRecord, RiskStatus, RiskSummary,
    DERIVED_COLUMNS,
};

/// Characters dropped from analyte cells before parsing. Detection-limit
/// qualifiers are discarded, so "<0.5" counts as 0.5.
const QUALIFIER_CHARS: [char; 3] = ['<', '>', ','];

/// Cell contents read as missing rather than as a parse failure
const MISSING_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Rows handed to the observer as a preview
const PREVIEW_ROWS: usize = 5;

/// Receives a summary after each scoring run. Never affects the result.
pub trait RiskObserver: Send + Sync {
    fn on_scored(&self, summary: &RiskSummary, preview: &[RiskRecord]);
}

/// Writes the status counts and a preview of the first rows as tracing events
pub struct TracingObserver;

impl RiskObserver for TracingObserver {
    fn on_scored(&self, summary: &RiskSummary, preview: &[RiskRecord]) {
        info!(
            total_samples = summary.total_samples,
            at_risk = summary.count(RiskStatus::AtRisk),
            needs_monitoring = summary.count(RiskStatus::NeedsMonitoring),
            safe = summary.count(RiskStatus::Safe),
            "risk level summary"
        );
        for record in preview {
            debug!(
                sample_id = %record.sample_id,
                total_pcb = record.total_concentration,
                add = record.average_daily_dose,
                hq = record.hazard_quotient,
                cr_high = record.cancer_risk_high,
                status = %record.status,
                "risk preview row"
            );
        }
    }
}

pub struct RiskEngine {
    model: ExposureModel,
    observer: Option<Arc<dyn RiskObserver>>,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self {
            model: ExposureModel::STANDARD,
            observer: Some(Arc::new(TracingObserver)),
        }
    }
}

impl RiskEngine {
    pub fn new(model: ExposureModel) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    /// Replace the observer; `None` disables the diagnostic output
    pub fn with_observer(mut self, observer: Option<Arc<dyn RiskObserver>>) -> Self {
        self.observer = observer;
        self
    }

    /// Strip qualifiers and parse. `Ok(None)` for missing cells.
    pub fn normalize_value(raw: &str) -> std::result::Result<Option<f64>, ()> {
        let trimmed = raw.trim();
        if MISSING_MARKERS.contains(&trimmed) {
            return Ok(None);
        }

        let stripped: String = trimmed
            .chars()
            .filter(|c| !QUALIFIER_CHARS.contains(c))
            .collect();
        let stripped = stripped.trim();
        if stripped.is_empty() {
            // a bare qualifier such as "<" carries no value
            return Err(());
        }

        match stripped.parse::<f64>() {
            Ok(value) if value.is_nan() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(()),
        }
    }

    /// `normalize_value` for a cell of `delimiter`-separated input. Outside
    /// comma-separated files a comma is a decimal separator, which qualifier
    /// stripping would silently scale, so such cells are rejected.
    fn normalize_cell(raw: &str, delimiter: u8) -> std::result::Result<Option<f64>, ()> {
        if delimiter != b',' && raw.contains(',') {
            return Err(());
        }
        Self::normalize_value(raw)
    }

    /// Score every row of `dataset`, preserving row order
    pub fn compute(&self, dataset: &Dataset, role: &ColumnRole) -> Result<Vec<RiskRecord>> {
        let id_index = Self::require_column(dataset, &role.sample_identifier)?;
        let analyte_indices = role
            .analytes
            .iter()
            .map(|column| Self::require_column(dataset, column).map(|idx| (column, idx)))
            .collect::<Result<Vec<_>>>()?;

        let mut records = Vec::with_capacity(dataset.len());
        for row in &dataset.rows {
            let mut analytes = Vec::with_capacity(analyte_indices.len());
            for (column, idx) in &analyte_indices {
                let raw = row.get(*idx).unwrap_or("");
                let value = Self::normalize_cell(raw, dataset.delimiter).map_err(|_| {
                    AppError::Conversion {
                        column: column.to_string(),
                        row: row.index,
                        value: raw.to_string(),
                    }
                })?;
                analytes.push(value);
            }

            // fold from +0.0: `Sum` for f64 starts at -0.0, which an all-missing row would keep
            let total_concentration = analytes.iter().flatten().fold(0.0, |acc, v| acc + v);
            let average_daily_dose = total_concentration / self.model.dose_divisor;
            let lifetime_average_daily_dose = average_daily_dose;
            let hazard_quotient = average_daily_dose / self.model.reference_dose;
            let cancer_risk_high = lifetime_average_daily_dose * self.model.slope_factor;
            let status = self.model.classify(hazard_quotient, cancer_risk_high);

            records.push(RiskRecord {
                row: row.index,
                sample_id: row.get(id_index).unwrap_or("").to_string(),
                analytes,
                total_concentration,
                average_daily_dose,
                lifetime_average_daily_dose,
                hazard_quotient,
                cancer_risk_high,
                status,
            });
        }

        if let Some(observer) = &self.observer {
            let preview_len = records.len().min(PREVIEW_ROWS);
            observer.on_scored(&RiskSummary::from_records(&records), &records[..preview_len]);
        }

        Ok(records)
    }

    /// Original columns with parsed analyte values, the canonical identifier
    /// column in front and the derived columns appended
    pub fn enrich(dataset: &Dataset, role: &ColumnRole, records: &[RiskRecord]) -> EnrichedTable {
        let add_canonical = role.sample_identifier != CANONICAL_SAMPLE_COLUMN;

        let mut headers = Vec::with_capacity(dataset.headers.len() + DERIVED_COLUMNS.len() + 1);
        if add_canonical {
            headers.push(CANONICAL_SAMPLE_COLUMN.to_string());
        }
        headers.extend(dataset.headers.iter().cloned());
        headers.extend(DERIVED_COLUMNS.iter().map(|c| c.to_string()));

        // analyte position in header order -> position in record.analytes
        let analyte_slots: Vec<Option<usize>> = dataset
            .headers
            .iter()
            .map(|h| role.analytes.iter().position(|a| a == h))
            .collect();

        let rows = dataset
            .rows
            .iter()
            .zip(records)
            .map(|(row, record)| {
                let mut cells = Vec::with_capacity(headers.len());
                if add_canonical {
                    cells.push(record.sample_id.clone());
                }
                for (idx, raw) in row.values.iter().enumerate() {
                    match analyte_slots[idx] {
                        Some(slot) => cells.push(
                            record.analytes[slot]
                                .map(format_number)
                                .unwrap_or_default(),
                        ),
                        None => cells.push(raw.clone()),
                    }
                }
                cells.extend(record.derived_cells());
                cells
            })
            .collect();

        EnrichedTable { headers, rows }
    }

    fn require_column(dataset: &Dataset, column: &str) -> Result<usize> {
        dataset.column_index(column).ok_or_else(|| {
            AppError::Unexpected(format!("Column '{}' is not part of the dataset", column))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::column_role::RuleTag;
    use crate::domain::dataset::DatasetRow;
    use std::sync::Mutex;

    fn dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .enumerate()
                .map(|(i, r)| DatasetRow::new(i, r.iter().map(|v| v.to_string()).collect()))
                .collect(),
            b',',
        )
    }

    fn role(id: &str, analytes: &[&str]) -> ColumnRole {
        ColumnRole {
            sample_identifier: id.to_string(),
            identifier_rule: RuleTag::SampleKeyword,
            analytes: analytes.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn quiet_engine() -> RiskEngine {
        RiskEngine::default().with_observer(None)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1e-12)
    }

    #[test]
    fn test_normalize_strips_qualifiers() {
        assert_eq!(RiskEngine::normalize_value("<0.5"), Ok(Some(0.5)));
        assert_eq!(RiskEngine::normalize_value(">2"), Ok(Some(2.0)));
        assert_eq!(RiskEngine::normalize_value("1,250.5"), Ok(Some(1250.5)));
        assert_eq!(RiskEngine::normalize_value(" 0.25 "), Ok(Some(0.25)));
    }

    #[test]
    fn test_normalize_missing_and_invalid() {
        assert_eq!(RiskEngine::normalize_value(""), Ok(None));
        assert_eq!(RiskEngine::normalize_value("NA"), Ok(None));
        assert_eq!(RiskEngine::normalize_value("nan"), Ok(None));
        assert_eq!(RiskEngine::normalize_value("<"), Err(()));
        assert_eq!(RiskEngine::normalize_value(" > "), Err(()));
        assert_eq!(RiskEngine::normalize_value("n.d."), Err(()));
        assert_eq!(RiskEngine::normalize_value("abc"), Err(()));
    }

    #[test]
    fn test_at_risk_example() {
        let data = dataset(&["Sample", "PCB_28", "PCB_52"], &[&["A1", "0.4", "0.3"]]);
        let records = quiet_engine()
            .compute(&data, &role("Sample", &["PCB_28", "PCB_52"]))
            .unwrap();
        let r = &records[0];

        assert!(approx(r.total_concentration, 0.7));
        assert!(approx(r.average_daily_dose, 0.0007));
        assert_eq!(r.lifetime_average_daily_dose, r.average_daily_dose);
        assert!(approx(r.hazard_quotient, 35.0));
        assert!(approx(r.cancer_risk_high, 0.0014));
        assert_eq!(r.status, RiskStatus::AtRisk);
    }

    #[test]
    fn test_needs_monitoring_example() {
        let data = dataset(&["Sample", "PCB_28", "PCB_52"], &[&["A1", "0.015", "0.005"]]);
        let records = quiet_engine()
            .compute(&data, &role("Sample", &["PCB_28", "PCB_52"]))
            .unwrap();
        let r = &records[0];

        assert!(approx(r.total_concentration, 0.02));
        assert!(approx(r.average_daily_dose, 2e-5));
        assert!(approx(r.hazard_quotient, 1.0));
        assert!(approx(r.cancer_risk_high, 4e-5));
        assert_eq!(r.status, RiskStatus::NeedsMonitoring);
    }

    #[test]
    fn test_safe_example() {
        let data = dataset(&["Sample", "PCB_28"], &[&["A1", "0.001"]]);
        let records = quiet_engine()
            .compute(&data, &role("Sample", &["PCB_28"]))
            .unwrap();
        let r = &records[0];

        assert!(approx(r.average_daily_dose, 1e-6));
        assert!(approx(r.hazard_quotient, 0.05));
        assert!(approx(r.cancer_risk_high, 2e-6));
        assert_eq!(r.status, RiskStatus::Safe);
    }

    #[test]
    fn test_missing_cells_are_skipped_in_total() {
        let data = dataset(&["Sample", "PCB_28", "PCB_52"], &[&["A1", "", "<0.5"]]);
        let records = quiet_engine()
            .compute(&data, &role("Sample", &["PCB_28", "PCB_52"]))
            .unwrap();

        assert_eq!(records[0].analytes, vec![None, Some(0.5)]);
        assert_eq!(records[0].total_concentration, 0.5);
    }

    #[test]
    fn test_conversion_error_names_column_and_value() {
        let data = dataset(
            &["Sample", "PCB_28"],
            &[&["A1", "0.1"], &["A2", "pending"]],
        );
        let err = quiet_engine()
            .compute(&data, &role("Sample", &["PCB_28"]))
            .unwrap_err();

        assert_eq!(
            err,
            AppError::Conversion {
                column: "PCB_28".to_string(),
                row: 1,
                value: "pending".to_string(),
            }
        );
    }

    #[test]
    fn test_row_order_is_preserved() {
        let data = dataset(
            &["Sample", "PCB_28"],
            &[&["Z9", "5"], &["A1", "0.0001"], &["M4", "0.01"]],
        );
        let records = quiet_engine()
            .compute(&data, &role("Sample", &["PCB_28"]))
            .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["Z9", "A1", "M4"]);
    }

    struct Recording {
        calls: Mutex<Vec<(usize, usize)>>,
    }

    impl RiskObserver for Recording {
        fn on_scored(&self, summary: &RiskSummary, preview: &[RiskRecord]) {
            self.calls
                .lock()
                .unwrap()
                .push((summary.total_samples, preview.len()));
        }
    }

    #[test]
    fn test_observer_sees_summary_without_changing_result() {
        let rows: Vec<Vec<String>> = (0..7)
            .map(|i| vec![format!("S{}", i), format!("0.{}", i)])
            .collect();
        let row_refs: Vec<Vec<&str>> = rows
            .iter()
            .map(|r| r.iter().map(|v| v.as_str()).collect())
            .collect();
        let row_slices: Vec<&[&str]> = row_refs.iter().map(|r| r.as_slice()).collect();
        let data = dataset(&["Sample", "PCB_28"], &row_slices);
        let role = role("Sample", &["PCB_28"]);

        let recording = Arc::new(Recording {
            calls: Mutex::new(Vec::new()),
        });
        let observed = RiskEngine::default()
            .with_observer(Some(recording.clone()))
            .compute(&data, &role)
            .unwrap();
        let silent = quiet_engine().compute(&data, &role).unwrap();

        assert_eq!(observed, silent);
        assert_eq!(*recording.calls.lock().unwrap(), vec![(7, 5)]);
    }

    #[test]
    fn test_enrich_keeps_columns_and_appends_derived() {
        let data = dataset(
            &["Sample", "Site", "PCB_28"],
            &[&["A1", "North", "<0.5"], &["A2", "South", ""]],
        );
        let role = role("Sample", &["PCB_28"]);
        let records = quiet_engine().compute(&data, &role).unwrap();
        let table = RiskEngine::enrich(&data, &role, &records);

        assert_eq!(
            table.headers,
            vec![
                "sample_id", "Sample", "Site", "PCB_28", "Total_PCB", "ADD", "LADD", "HQ",
                "CR_high", "Status"
            ]
        );
        assert_eq!(&table.rows[0][..4], &["A1", "A1", "North", "0.5"]);
        assert_eq!(table.rows[0][9], "At Risk");
        assert_eq!(&table.rows[1][..4], &["A2", "A2", "South", ""]);
        assert_eq!(table.rows[1][4], "0.0");
        assert_eq!(table.rows[1][9], "Safe");
    }

    #[test]
    fn test_enrich_does_not_duplicate_canonical_column() {
        let data = dataset(&["sample_id", "PCB_28"], &[&["A1", "1"]]);
        let role = role("sample_id", &["PCB_28"]);
        let records = quiet_engine().compute(&data, &role).unwrap();
        let table = RiskEngine::enrich(&data, &role, &records);

        assert_eq!(table.headers[0], "sample_id");
        assert_eq!(table.headers[1], "PCB_28");
        assert_eq!(table.rows[0].len(), table.headers.len());
    }

    #[test]
    fn test_all_missing_row_totals_positive_zero() {
        let data = dataset(&["Sample", "PCB_28", "PCB_52"], &[&["A1", "", "NA"]]);
        let records = quiet_engine()
            .compute(&data, &role("Sample", &["PCB_28", "PCB_52"]))
            .unwrap();
        let r = &records[0];

        assert!(r.total_concentration.is_sign_positive());
        assert!(r.hazard_quotient.is_sign_positive());
        assert_eq!(r.derived_cells()[0], "0.0");
        assert_eq!(r.status, RiskStatus::Safe);
    }

    #[test]
    fn test_bare_qualifier_is_conversion_error() {
        let data = dataset(&["Sample", "PCB_28"], &[&["A1", "0.1"], &["A2", "<"]]);
        let err = quiet_engine()
            .compute(&data, &role("Sample", &["PCB_28"]))
            .unwrap_err();

        assert_eq!(
            err,
            AppError::Conversion {
                column: "PCB_28".to_string(),
                row: 1,
                value: "<".to_string(),
            }
        );
    }

    #[test]
    fn test_decimal_comma_rejected_outside_comma_files() {
        let semicolon = Dataset::new(
            vec!["Sample".to_string(), "PCB_28".to_string()],
            vec![DatasetRow::new(0, vec!["A1".to_string(), "0,004".to_string()])],
            b';',
        );
        let err = quiet_engine()
            .compute(&semicolon, &role("Sample", &["PCB_28"]))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Conversion { ref column, ref value, .. } if column == "PCB_28" && value == "0,004"
        ));

        let plain = Dataset::new(
            vec!["Sample".to_string(), "PCB_28".to_string()],
            vec![DatasetRow::new(0, vec!["A1".to_string(), "0.004".to_string()])],
            b';',
        );
        let records = quiet_engine()
            .compute(&plain, &role("Sample", &["PCB_28"]))
            .unwrap();
        assert!(approx(records[0].total_concentration, 0.004));
        assert_eq!(records[0].status, RiskStatus::Safe);
    }
}
