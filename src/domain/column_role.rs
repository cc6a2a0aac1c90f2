use serde::{Deserialize, Serialize};

/// Name the identifier column is additionally exposed under in the output
pub const CANONICAL_SAMPLE_COLUMN: &str = "sample_id";

/// Which rule tagged a column during classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTag {
    SampleKeyword,
    IdKeyword,
    PatientKeyword,
    SubjectKeyword,
    CaseKeyword,
    NoKeyword,
    NumberKeyword,
    CodeKeyword,
    PidPrefix,
    SpPrefix,
    PtPrefix,
    LabPrefix,
    /// `letters` optionally followed by `digits`, used only when no keyword matched
    BareCode,
    CongenerName,
    NumericRun,
    NumericSuffix,
}

/// Classification result for one dataset's columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRole {
    pub sample_identifier: String,

    /// Which rule selected the identifier
    pub identifier_rule: RuleTag,

    /// Analyte columns in original column order; never contains the identifier
    pub analytes: Vec<String>,
}
