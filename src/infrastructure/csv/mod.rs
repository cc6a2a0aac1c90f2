// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Upload decoding, delimiter detection and output rendering

mod csv_parser;
mod csv_writer;

pub use csv_parser::CsvParser;
pub use csv_writer::CsvWriter;
