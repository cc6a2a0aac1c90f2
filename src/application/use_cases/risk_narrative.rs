use crate::domain::error::{AppError, Result};
use crate::domain::risk::RiskSummary;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::clean_llm_response;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are an environmental health expert analyzing PCB exposure data.";

const DEFAULT_INSTRUCTIONS: &str = "Provide:\n1. Overall risk assessment\n2. Notable high-risk cases\n3. Recommended actions\n4. Data quality observations";

pub struct RiskNarrativeUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
}

impl RiskNarrativeUseCase {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>) -> Self {
        Self { llm_client }
    }

    /// Ask for an expert reading of `summary`. A custom prompt replaces the
    /// default list of questions; the statistics are always included.
    pub async fn execute(
        &self,
        summary: &RiskSummary,
        custom_prompt: Option<String>,
    ) -> Result<String> {
        let stats = serde_json::to_string_pretty(summary)
            .map_err(|e| AppError::Unexpected(format!("Failed to serialize summary: {}", e)))?;

        let instructions = custom_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_INSTRUCTIONS);

        let user_prompt = format!(
            "As a toxicology expert, analyze this PCB exposure data:\n{}\n\n{}",
            stats, instructions
        );

        let raw = self.llm_client.generate(SYSTEM_PROMPT, &user_prompt).await?;
        Ok(clean_llm_response(&raw))
    }
}
