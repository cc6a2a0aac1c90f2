use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct LLMConfig {
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: Option<f32>,
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            api_key: None,
            max_tokens: Some(1000),
            temperature: Some(0.3),
            timeout_secs: 30,
        }
    }
}
