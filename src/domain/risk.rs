// ============================================================
// RISK TYPES
// ============================================================
// Exposure constants, per-sample records and their status tiers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header names of the derived output columns, in output order
pub const DERIVED_COLUMNS: [&str; 6] = ["Total_PCB", "ADD", "LADD", "HQ", "CR_high", "Status"];

/// Fixed dose and threshold constants of the exposure model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureModel {
    /// Divisor turning a total concentration into an average daily dose
    pub dose_divisor: f64,

    /// Reference dose the hazard quotient is measured against
    pub reference_dose: f64,

    /// Cancer slope factor applied to the lifetime dose
    pub slope_factor: f64,

    /// HQ strictly above this is "At Risk"
    pub hq_at_risk: f64,

    /// CR strictly above this is "At Risk"
    pub cr_at_risk: f64,

    /// CR strictly above this is "Needs Monitoring"
    pub cr_monitoring: f64,
}

impl ExposureModel {
    pub const STANDARD: ExposureModel = ExposureModel {
        dose_divisor: 1000.0,
        reference_dose: 2e-5,
        slope_factor: 2.0,
        hq_at_risk: 5.0,
        cr_at_risk: 5e-4,
        cr_monitoring: 1e-5,
    };

    /// Evaluates the tier rules top to bottom; first match wins.
    pub fn classify(&self, hazard_quotient: f64, cancer_risk: f64) -> RiskStatus {
        if hazard_quotient > self.hq_at_risk || cancer_risk > self.cr_at_risk {
            RiskStatus::AtRisk
        } else if cancer_risk > self.cr_monitoring {
            RiskStatus::NeedsMonitoring
        } else {
            RiskStatus::Safe
        }
    }
}

impl Default for ExposureModel {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Risk tier assigned to a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskStatus {
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Needs Monitoring")]
    NeedsMonitoring,
    #[serde(rename = "Safe")]
    Safe,
}

impl RiskStatus {
    pub const ALL: [RiskStatus; 3] = [
        RiskStatus::AtRisk,
        RiskStatus::NeedsMonitoring,
        RiskStatus::Safe,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RiskStatus::AtRisk => "At Risk",
            RiskStatus::NeedsMonitoring => "Needs Monitoring",
            RiskStatus::Safe => "Safe",
        }
    }
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One scored sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    /// Source row index (0-based)
    pub row: usize,

    pub sample_id: String,

    /// Parsed analyte values in analyte column order; `None` for empty cells
    pub analytes: Vec<Option<f64>>,

    pub total_concentration: f64,
    pub average_daily_dose: f64,
    pub lifetime_average_daily_dose: f64,
    pub hazard_quotient: f64,
    pub cancer_risk_high: f64,
    pub status: RiskStatus,
}

impl RiskRecord {
    /// Derived values rendered for the output table, in `DERIVED_COLUMNS` order
    pub fn derived_cells(&self) -> [String; 6] {
        [
            format_number(self.total_concentration),
            format_number(self.average_daily_dose),
            format_number(self.lifetime_average_daily_dose),
            format_number(self.hazard_quotient),
            format_number(self.cancer_risk_high),
            self.status.to_string(),
        ]
    }
}

/// Shortest round-trip form, always with a fractional part or exponent ("1.0", "1e-6")
pub fn format_number(value: f64) -> String {
    format!("{:?}", value)
}

/// Aggregate view over a scored dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub total_samples: usize,

    /// Count per status label; every status is present
    pub risk_distribution: BTreeMap<String, usize>,

    /// Up to three records with the highest total concentration
    pub top_risky: Vec<RiskRecord>,
}

impl RiskSummary {
    pub fn from_records(records: &[RiskRecord]) -> Self {
        let mut risk_distribution: BTreeMap<String, usize> = RiskStatus::ALL
            .iter()
            .map(|s| (s.label().to_string(), 0))
            .collect();
        for record in records {
            *risk_distribution
                .entry(record.status.label().to_string())
                .or_insert(0) += 1;
        }

        let mut ranked: Vec<&RiskRecord> = records.iter().collect();
        // stable sort: equal totals keep input order
        ranked.sort_by(|a, b| {
            b.total_concentration
                .partial_cmp(&a.total_concentration)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let top_risky = ranked.into_iter().take(3).cloned().collect();

        Self {
            total_samples: records.len(),
            risk_distribution,
            top_risky,
        }
    }

    pub fn count(&self, status: RiskStatus) -> usize {
        self.risk_distribution
            .get(status.label())
            .copied()
            .unwrap_or(0)
    }
}

/// Output table: original columns, canonical identifier and derived columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(row: usize, total: f64) -> RiskRecord {
        let model = ExposureModel::STANDARD;
        let add = total / model.dose_divisor;
        let hq = add / model.reference_dose;
        let cr = add * model.slope_factor;
        RiskRecord {
            row,
            sample_id: format!("S{}", row),
            analytes: vec![Some(total)],
            total_concentration: total,
            average_daily_dose: add,
            lifetime_average_daily_dose: add,
            hazard_quotient: hq,
            cancer_risk_high: cr,
            status: model.classify(hq, cr),
        }
    }

    #[test]
    fn test_hazard_quotient_alone_triggers_at_risk() {
        let model = ExposureModel::STANDARD;
        assert_eq!(model.classify(5.1, 0.0), RiskStatus::AtRisk);
        assert_eq!(model.classify(0.0, 5.1e-4), RiskStatus::AtRisk);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let model = ExposureModel::STANDARD;
        assert_eq!(model.classify(5.0, 1e-5), RiskStatus::Safe);
        assert_eq!(model.classify(5.0, 5e-4), RiskStatus::NeedsMonitoring);
    }

    #[test]
    fn test_format_number_round_trips() {
        assert_eq!(format_number(35.0), "35.0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(0.0014), "0.0014");
        assert_eq!(format_number(2e-6).parse::<f64>().unwrap(), 2e-6);
    }

    #[test]
    fn test_status_labels_serialize_as_display_text() {
        let json = serde_json::to_string(&RiskStatus::NeedsMonitoring).unwrap();
        assert_eq!(json, "\"Needs Monitoring\"");
        assert_eq!(RiskStatus::AtRisk.to_string(), "At Risk");
    }

    #[test]
    fn test_summary_counts_every_status() {
        let records = vec![record(0, 0.7), record(1, 0.001)];
        let summary = RiskSummary::from_records(&records);

        assert_eq!(summary.total_samples, 2);
        assert_eq!(summary.count(RiskStatus::AtRisk), 1);
        assert_eq!(summary.count(RiskStatus::Safe), 1);
        assert_eq!(summary.count(RiskStatus::NeedsMonitoring), 0);
    }

    #[test]
    fn test_summary_top_risky_keeps_input_order_on_ties() {
        let records = vec![
            record(0, 0.1),
            record(1, 2.7),
            record(2, 0.1),
            record(3, 0.1),
            record(4, 0.5),
        ];
        let summary = RiskSummary::from_records(&records);

        let rows: Vec<usize> = summary.top_risky.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![1, 4, 0]);
    }
}
