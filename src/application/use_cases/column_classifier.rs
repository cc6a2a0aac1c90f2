// ============================================================
// COLUMN CLASSIFIER
// ============================================================
// Pick the sample identifier and the analyte columns from header names.
// Rules are ordered lists evaluated top to bottom against lower-cased names.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::column_role::{ColumnRole, RuleTag};
use crate::domain::error::{AppError, Result};

enum NamePattern {
    Contains(&'static str),
    Regex(Regex),
}

/// A tagged header-name test
pub struct ColumnRule {
    pub tag: RuleTag,
    pattern: NamePattern,
}

impl ColumnRule {
    fn contains(tag: RuleTag, needle: &'static str) -> Self {
        Self {
            tag,
            pattern: NamePattern::Contains(needle),
        }
    }

    fn regex(tag: RuleTag, pattern: &str) -> Self {
        Self {
            tag,
            pattern: NamePattern::Regex(Regex::new(pattern).unwrap()),
        }
    }

    /// `lower` must already be lower-cased
    pub fn matches(&self, lower: &str) -> bool {
        match &self.pattern {
            NamePattern::Contains(needle) => lower.contains(needle),
            NamePattern::Regex(re) => re.is_match(lower),
        }
    }
}

static IDENTIFIER_RULES: Lazy<Vec<ColumnRule>> = Lazy::new(|| {
    vec![
        ColumnRule::contains(RuleTag::SampleKeyword, "sample"),
        ColumnRule::contains(RuleTag::IdKeyword, "id"),
        ColumnRule::contains(RuleTag::PatientKeyword, "patient"),
        ColumnRule::contains(RuleTag::SubjectKeyword, "subject"),
        ColumnRule::contains(RuleTag::CaseKeyword, "case"),
        ColumnRule::contains(RuleTag::NoKeyword, "no"),
        ColumnRule::contains(RuleTag::NumberKeyword, "number"),
        ColumnRule::contains(RuleTag::CodeKeyword, "code"),
        ColumnRule::regex(RuleTag::PidPrefix, r"^pid"),
        ColumnRule::regex(RuleTag::SpPrefix, r"^sp"),
        ColumnRule::regex(RuleTag::PtPrefix, r"^pt"),
        ColumnRule::regex(RuleTag::LabPrefix, r"^lab"),
    ]
});

static BARE_CODE_RULE: Lazy<ColumnRule> =
    Lazy::new(|| ColumnRule::regex(RuleTag::BareCode, r"^[a-z]+\d*$"));

/// Columns containing any of these are never analytes. This also drops real
/// analytes whose names happen to contain "id" and similar; kept as is.
const ANALYTE_EXCLUSIONS: [&str; 4] = ["date", "time", "id", "sample"];

static ANALYTE_RULES: Lazy<Vec<ColumnRule>> = Lazy::new(|| {
    vec![
        ColumnRule::regex(RuleTag::CongenerName, r"pcb|congener|biphenyl"),
        ColumnRule::regex(RuleTag::NumericRun, r"\d{2,3}"),
        ColumnRule::regex(RuleTag::NumericSuffix, r"_\d+[a-z]?$"),
    ]
});

fn first_match<'r>(rules: &'r [ColumnRule], lower: &str) -> Option<&'r ColumnRule> {
    rules.iter().find(|rule| rule.matches(lower))
}

/// First column matching an identifier keyword, else the first bare code-like name
pub fn detect_sample_column(columns: &[String]) -> Option<(String, RuleTag)> {
    for column in columns {
        let lower = column.to_lowercase();
        if let Some(rule) = first_match(&IDENTIFIER_RULES, &lower) {
            return Some((column.clone(), rule.tag));
        }
    }

    columns
        .iter()
        .find(|column| BARE_CODE_RULE.matches(&column.to_lowercase()))
        .map(|column| (column.clone(), RuleTag::BareCode))
}

/// Analyte columns in original order, each with the rule that admitted it
pub fn detect_analyte_columns(columns: &[String]) -> Vec<(String, RuleTag)> {
    columns
        .iter()
        .filter_map(|column| {
            let lower = column.to_lowercase();
            if ANALYTE_EXCLUSIONS.iter().any(|x| lower.contains(x)) {
                return None;
            }
            first_match(&ANALYTE_RULES, &lower).map(|rule| (column.clone(), rule.tag))
        })
        .collect()
}

pub fn classify(columns: &[String]) -> Result<ColumnRole> {
    let detection_error = |message: &str| AppError::Detection {
        message: message.to_string(),
        available_columns: columns.to_vec(),
    };

    let (sample_identifier, identifier_rule) = detect_sample_column(columns)
        .ok_or_else(|| detection_error("Cannot identify sample ID column"))?;

    let analytes: Vec<String> = detect_analyte_columns(columns)
        .into_iter()
        .filter(|(column, _)| column != &sample_identifier)
        .map(|(column, tag)| {
            debug!(column = %column, rule = ?tag, "analyte column detected");
            column
        })
        .collect();

    if analytes.is_empty() {
        return Err(detection_error("No PCB columns detected"));
    }

    debug!(
        sample_identifier = %sample_identifier,
        rule = ?identifier_rule,
        analyte_count = analytes.len(),
        "columns classified"
    );

    Ok(ColumnRole {
        sample_identifier,
        identifier_rule,
        analytes,
    })
}
