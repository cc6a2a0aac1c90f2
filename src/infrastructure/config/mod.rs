use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const CONFIG_FILE: &str = "PcbRisk.toml";
pub const ENV_PREFIX: &str = "PCB_RISK_";

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    pub port: u16,

    /// Largest accepted multipart file, in bytes
    #[validate(range(min = 1))]
    pub max_upload_bytes: usize,

    /// Empty means any origin
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CloudConvertConfig {
    pub api_key: Option<String>,
    #[validate(url)]
    pub base_url: String,
    pub poll_interval_ms: u64,
    #[validate(range(min = 1))]
    pub max_polls: u32,
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
}

impl Default for CloudConvertConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.cloudconvert.com/v2".to_string(),
            poll_interval_ms: 2000,
            max_polls: 60,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub deepseek: LLMConfig,
    #[validate(nested)]
    pub cloudconvert: CloudConvertConfig,
}

impl AppConfig {
    /// Defaults, then `PcbRisk.toml`, then `PCB_RISK_*` variables
    /// (`__` separates sections), then the provider keys under their usual names.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&["DEEPSEEK_API_KEY"]).map(|_| "deepseek.api_key".into()))
            .merge(
                Env::raw()
                    .only(&["CLOUDCONVERT_API_KEY"])
                    .map(|_| "cloudconvert.api_key".into()),
            );

        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))?;
        config
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        Ok(config)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}
