use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// OpenAI-compatible chat completions client for DeepSeek
pub struct DeepSeekClient {
    client: reqwest::Client,
    config: LLMConfig,
}

impl DeepSeekClient {
    pub fn new(config: LLMConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::Config("DEEPSEEK_API_KEY missing from environment".to_string()))
    }

    fn completions_url(&self) -> String {
        if self.config.base_url.ends_with('/') {
            format!("{}chat/completions", self.config.base_url)
        } else {
            format!("{}/chat/completions", self.config.base_url)
        }
    }
}

#[async_trait]
impl LLMClient for DeepSeekClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let api_key = self.api_key()?;

        let body = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": user
                }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::LLMError("Unexpected API response: missing content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockRoute, MockServer};

    fn config(base_url: &str, api_key: Option<&str>) -> LLMConfig {
        LLMConfig {
            base_url: base_url.to_string(),
            api_key: api_key.map(|k| k.to_string()),
            ..LLMConfig::default()
        }
    }

    #[actix_web::test]
    async fn test_generate_returns_message_content() {
        let server = MockServer::start(vec![MockRoute::new(
            "POST",
            "/v1/chat/completions",
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"Two samples are At Risk."}}]}"#,
        )])
        .await;

        let client = DeepSeekClient::new(config(&server.url("/v1"), Some("sk-test")));
        let text = client.generate("system text", "user text").await.unwrap();
        assert_eq!(text, "Two samples are At Risk.");

        let recorded = server.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].authorization.as_deref(), Some("Bearer sk-test"));
        let sent: serde_json::Value = serde_json::from_slice(&recorded[0].body).unwrap();
        assert_eq!(sent["model"], "deepseek-chat");
        assert_eq!(sent["messages"][0]["role"], "system");
        assert_eq!(sent["messages"][1]["content"], "user text");
        assert_eq!(sent["max_tokens"], 1000);

        server.stop().await;
    }

    #[actix_web::test]
    async fn test_missing_key_fails_before_request() {
        let client = DeepSeekClient::new(config("http://127.0.0.1:9", None));
        let err = client.generate("s", "u").await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let client = DeepSeekClient::new(config("http://127.0.0.1:9", Some("  ")));
        assert!(matches!(
            client.generate("s", "u").await.unwrap_err(),
            AppError::Config(_)
        ));
    }

    #[actix_web::test]
    async fn test_error_status_and_malformed_response() {
        let server = MockServer::start(vec![
            MockRoute::new("POST", "/chat/completions", 401, r#"{"error":"bad key"}"#),
            MockRoute::new("POST", "/chat/completions", 200, r#"{"choices":[]}"#),
        ])
        .await;
        let client = DeepSeekClient::new(config(&format!("{}/", server.base_url), Some("k")));

        let err = client.generate("s", "u").await.unwrap_err();
        assert!(matches!(err, AppError::LLMError(ref msg) if msg.contains("401")));

        let err = client.generate("s", "u").await.unwrap_err();
        assert!(matches!(err, AppError::LLMError(ref msg) if msg.contains("missing content")));

        server.stop().await;
    }
}
