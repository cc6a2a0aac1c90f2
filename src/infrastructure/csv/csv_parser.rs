// ============================================================
// CSV PARSER
// ============================================================
// Decode uploaded bytes and parse them into a Dataset

use std::collections::HashSet;

use csv::{ReaderBuilder, Trim};

use crate::domain::dataset::{Dataset, DatasetRow};
use crate::domain::error::{AppError, Result};

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV parser with encoding and delimiter detection. Headers and values are
/// trimmed of surrounding whitespace.
#[derive(Debug, Default)]
pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        Self
    }

    /// Decode and parse an uploaded payload
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Dataset> {
        let content = Self::decode(bytes);
        self.parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<Dataset> {
        if content.trim().is_empty() {
            return Err(AppError::Format("No columns to parse from file".to_string()));
        }

        let delimiter = Self::detect_delimiter(content);

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::Format(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        Self::validate_headers(&headers)?;

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::Format(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            if record.len() > headers.len() {
                return Err(AppError::Format(format!(
                    "Expected {} fields in row {}, saw {}",
                    headers.len(),
                    index + 1,
                    record.len()
                )));
            }

            // Short rows are padded so every row shares the header set
            let values = (0..headers.len())
                .map(|idx| record.get(idx).unwrap_or("").to_string())
                .collect();
            rows.push(DatasetRow::new(index, values));
        }

        if rows.is_empty() {
            return Err(AppError::Format("Empty CSV file".to_string()));
        }

        Ok(Dataset::new(headers, rows, delimiter))
    }

    /// UTF-8 (BOM stripped) with a Windows-1252 fallback for spreadsheet exports
    fn decode(bytes: &[u8]) -> String {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        match std::str::from_utf8(bytes) {
            Ok(content) => content.to_string(),
            Err(_) => {
                let (content, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
                content.into_owned()
            }
        }
    }

    fn validate_headers(headers: &[String]) -> Result<()> {
        let mut seen = HashSet::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                return Err(AppError::Format(format!(
                    "Column {} has an empty header",
                    idx + 1
                )));
            }
            if !seen.insert(header.as_str()) {
                return Err(AppError::Format(format!(
                    "Duplicate column name '{}'",
                    header
                )));
            }
        }
        Ok(())
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str) -> u8 {
        let sample_lines: Vec<&str> = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .take(10)
            .collect();

        if sample_lines.is_empty() {
            return b',';
        }

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        for &delimiter in &CANDIDATE_DELIMITERS {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by frequency, penalised by inconsistency across lines
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let content = "Sample,PCB_28,PCB_52\nS1,0.4,0.3\nS2,<0.1,0.2";
        let dataset = CsvParser::new().parse_content(content).unwrap();

        assert_eq!(dataset.headers, vec!["Sample", "PCB_28", "PCB_52"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows[1].values, vec!["S2", "<0.1", "0.2"]);
        assert_eq!(dataset.delimiter, b',');
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvParser::detect_delimiter("a,b,c\nd,e,f"), b',');
        assert_eq!(CsvParser::detect_delimiter("a;b;c\nd;e;f"), b';');
        assert_eq!(CsvParser::detect_delimiter("a\tb\nd\te"), b'\t');
        assert_eq!(CsvParser::detect_delimiter("single\nvalue"), b',');
    }

    #[test]
    fn test_semicolon_file_keeps_its_delimiter() {
        let dataset = CsvParser::new()
            .parse_content("id;PCB 153\nA1;0,5\nA2;1,2")
            .unwrap();

        assert_eq!(dataset.delimiter, b';');
        assert_eq!(dataset.rows[0].values, vec!["A1", "0,5"]);
    }

    #[test]
    fn test_empty_payload_is_format_error() {
        let err = CsvParser::new().parse_bytes(b"").unwrap_err();
        assert!(matches!(err, AppError::Format(_)));

        let err = CsvParser::new().parse_bytes(b"  \n \n").unwrap_err();
        assert!(matches!(err, AppError::Format(_)));
    }

    #[test]
    fn test_header_only_is_empty_csv() {
        let err = CsvParser::new().parse_content("Sample,PCB_28\n").unwrap_err();
        assert_eq!(err, AppError::Format("Empty CSV file".to_string()));
    }

    #[test]
    fn test_duplicate_header_is_rejected() {
        let err = CsvParser::new()
            .parse_content("Sample,PCB_28,PCB_28\nS1,1,2")
            .unwrap_err();
        assert_eq!(
            err,
            AppError::Format("Duplicate column name 'PCB_28'".to_string())
        );
    }

    #[test]
    fn test_ragged_rows() {
        let dataset = CsvParser::new()
            .parse_content("Sample,PCB_28,PCB_52\nS1,0.4")
            .unwrap();
        assert_eq!(dataset.rows[0].values, vec!["S1", "0.4", ""]);

        let err = CsvParser::new()
            .parse_content("Sample,PCB_28\nS1,0.4,0.9")
            .unwrap_err();
        assert!(matches!(err, AppError::Format(msg) if msg.contains("Expected 2 fields")));
    }

    #[test]
    fn test_bom_and_latin1_decoding() {
        let dataset = CsvParser::new()
            .parse_bytes(b"\xEF\xBB\xBFSample,PCB_28\nS1,0.4")
            .unwrap();
        assert_eq!(dataset.headers[0], "Sample");

        // 0xB5 is the micro sign in Windows-1252
        let dataset = CsvParser::new()
            .parse_bytes(b"Sample,PCB_28 \xB5g\nS1,0.4")
            .unwrap();
        assert_eq!(dataset.headers[1], "PCB_28 \u{b5}g");
    }
}
