// ============================================================
// CSV WRITER
// ============================================================
// Render an enriched table back into delimited text

use csv::WriterBuilder;

use crate::domain::error::{AppError, Result};
use crate::domain::risk::EnrichedTable;

pub struct CsvWriter {
    delimiter: u8,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvWriter {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn write(&self, table: &EnrichedTable) -> Result<Vec<u8>> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }

        writer
            .into_inner()
            .map_err(|e| AppError::Unexpected(format!("Failed to flush CSV output: {}", e)))
    }
}
