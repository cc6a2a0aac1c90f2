// ============================================================
// DATASET TYPES
// ============================================================
// Parsed upload content: headers plus raw string cells

use serde::{Deserialize, Serialize};

/// A single row of an uploaded table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    /// Row index (0-based, header excluded)
    pub index: usize,

    /// One raw cell per header, in header order
    pub values: Vec<String>,
}

impl DatasetRow {
    pub fn new(index: usize, values: Vec<String>) -> Self {
        Self { index, values }
    }

    pub fn get(&self, position: usize) -> Option<&str> {
        self.values.get(position).map(|v| v.as_str())
    }
}

/// An uploaded table with unique headers and at least one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<DatasetRow>,

    /// Field delimiter the table was read with; output reuses it
    pub delimiter: u8,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<DatasetRow>, delimiter: u8) -> Self {
        Self {
            headers,
            rows,
            delimiter,
        }
    }

    /// Position of a header, by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
