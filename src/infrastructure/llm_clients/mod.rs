pub mod deepseek;

use crate::domain::error::Result;
use async_trait::async_trait;

pub use deepseek::DeepSeekClient;

/// Text-generation collaborator; configuration is bound at construction
#[async_trait]
pub trait LLMClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}
