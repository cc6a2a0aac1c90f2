// ============================================================
// DOCUMENT CONVERSION
// ============================================================
// Remote conversion of spreadsheets and other documents into CSV

pub mod cloudconvert;

use crate::domain::error::Result;
use async_trait::async_trait;

pub use cloudconvert::CloudConvertClient;

#[async_trait]
pub trait DocumentConverter {
    /// Convert `bytes` (named `filename`) into `output_format`, e.g. "csv"
    async fn convert(&self, filename: &str, bytes: Vec<u8>, output_format: &str) -> Result<Vec<u8>>;
}
