use std::io;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::application::use_cases::risk_engine::RiskEngine;
use crate::application::{RiskAnalysisUseCase, RiskNarrativeUseCase};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::conversion::CloudConvertClient;
use crate::infrastructure::llm_clients::DeepSeekClient;
use crate::interfaces::http::{start_server, HttpState};

/// Wire the collaborators from `config`
pub fn build_state(config: &AppConfig) -> HttpState {
    if config.deepseek.api_key.is_none() {
        warn!("DEEPSEEK_API_KEY is not set; /analyze/ will answer 503");
    }
    if config.cloudconvert.api_key.is_none() {
        warn!("CLOUDCONVERT_API_KEY is not set; /convert/ will answer 503");
    }

    HttpState {
        analysis: Arc::new(RiskAnalysisUseCase::new(RiskEngine::default())),
        narrative: RiskNarrativeUseCase::new(Arc::new(DeepSeekClient::new(
            config.deepseek.clone(),
        ))),
        converter: Arc::new(CloudConvertClient::new(config.cloudconvert.clone())),
        max_upload_bytes: config.server.max_upload_bytes,
    }
}

pub async fn run() -> io::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    let config = AppConfig::load()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        max_upload_bytes = config.server.max_upload_bytes,
        "configuration loaded"
    );

    let state = build_state(&config);
    start_server(&config.server, state)?.await
}
