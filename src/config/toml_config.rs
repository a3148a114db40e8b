use crate::adapters::source::Marketplace;
use crate::domain::model::{DEFAULT_POST_COUNT, MAX_POST_COUNT};
use crate::utils::error::{DealError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_STORE_PATH: &str = "./data/seen_products.txt";
pub const DEFAULT_CATEGORIES: [&str; 5] = [
    "laptops",
    "smartphones",
    "headphones",
    "smartwatches",
    "tablets",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub telegram: TelegramConfig,
    pub source: SourceConfig,
    pub affiliate: AffiliateConfig,
    pub store: Option<StoreConfig>,
    pub pipeline: Option<PipelineConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub channel_id: String,
    pub api_base: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub poll_timeout_seconds: Option<u64>,
    pub min_interval_ms: Option<u64>,
    pub send_photos: Option<bool>,
    pub allowed_user_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub marketplace: Marketplace,
    pub base_url: Option<String>,
    pub categories: Option<Vec<String>>,
    pub timeout_seconds: Option<u64>,
    pub request_delay_ms: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AffiliateMode {
    #[default]
    Template,
    Api,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateConfig {
    #[serde(default)]
    pub mode: AffiliateMode,
    pub template: Option<String>,
    pub tracking_id: Option<String>,
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub default_count: Option<usize>,
    pub max_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub json: Option<bool>,
    /// 額外寫入的日誌檔 (純文字，附加模式)
    pub file: Option<String>,
}

impl TelegramConfig {
    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or(crate::adapters::telegram::DEFAULT_API_BASE)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(10)
    }

    pub fn poll_timeout_seconds(&self) -> u64 {
        self.poll_timeout_seconds.unwrap_or(30)
    }

    pub fn min_interval_ms(&self) -> u64 {
        self.min_interval_ms.unwrap_or(500)
    }

    pub fn allowed_user_ids(&self) -> Vec<i64> {
        self.allowed_user_ids.clone().unwrap_or_default()
    }
}

impl SourceConfig {
    pub fn categories(&self) -> Vec<String> {
        match &self.categories {
            Some(categories) => categories.clone(),
            None => DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(10)
    }

    pub fn request_delay_ms(&self) -> u64 {
        self.request_delay_ms.unwrap_or(1000)
    }
}

impl AffiliateConfig {
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(10)
    }
}

impl BotConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DealError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| DealError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn store_path(&self) -> &str {
        self.store
            .as_ref()
            .map(|s| s.path.as_str())
            .unwrap_or(DEFAULT_STORE_PATH)
    }

    pub fn default_count(&self) -> usize {
        self.pipeline
            .as_ref()
            .and_then(|p| p.default_count)
            .unwrap_or(DEFAULT_POST_COUNT)
    }

    pub fn max_count(&self) -> usize {
        self.pipeline
            .as_ref()
            .and_then(|p| p.max_count)
            .unwrap_or(MAX_POST_COUNT)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.logging
            .as_ref()
            .and_then(|l| l.file.as_deref())
            .map(Path::new)
    }
}

/// 替換環境變數 (例如 ${TELEGRAM_BOT_TOKEN})；未設定的變數保持原樣，交給驗證處理
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DealError::ConfigError {
        message: e.to_string(),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.into_owned())
}

impl Validate for BotConfig {
    fn validate(&self) -> Result<()> {
        // 憑證必須存在
        validation::validate_resolved("telegram.bot_token", &self.telegram.bot_token)?;
        validation::validate_non_empty_string("telegram.bot_token", &self.telegram.bot_token)?;
        validation::validate_resolved("telegram.channel_id", &self.telegram.channel_id)?;
        validation::validate_non_empty_string("telegram.channel_id", &self.telegram.channel_id)?;
        validation::validate_url("telegram.api_base", self.telegram.api_base())?;
        validation::validate_positive_number(
            "telegram.timeout_seconds",
            self.telegram.timeout_seconds(),
            1,
        )?;

        if let Some(base_url) = &self.source.base_url {
            validation::validate_url("source.base_url", base_url)?;
        }
        let categories = self.source.categories();
        if categories.is_empty() {
            return Err(DealError::ConfigValidationError {
                field: "source.categories".to_string(),
                message: "at least one category is required".to_string(),
            });
        }
        for category in &categories {
            validation::validate_non_empty_string("source.categories", category)?;
        }
        validation::validate_positive_number(
            "source.timeout_seconds",
            self.source.timeout_seconds(),
            1,
        )?;

        match self.affiliate.mode {
            AffiliateMode::Template => {
                if let Some(template) = &self.affiliate.template {
                    if !template.contains("{url}") {
                        return Err(DealError::InvalidConfigValueError {
                            field: "affiliate.template".to_string(),
                            value: template.clone(),
                            reason: "template must contain {url}".to_string(),
                        });
                    }
                }
                if let Some(tracking_id) = &self.affiliate.tracking_id {
                    validation::validate_resolved("affiliate.tracking_id", tracking_id)?;
                }
            }
            AffiliateMode::Api => {
                let endpoint =
                    self.affiliate
                        .endpoint
                        .as_deref()
                        .ok_or_else(|| DealError::MissingConfigError {
                            field: "affiliate.endpoint".to_string(),
                        })?;
                validation::validate_url("affiliate.endpoint", endpoint)?;
                let token = self.affiliate.api_token.as_deref().ok_or_else(|| {
                    DealError::MissingConfigError {
                        field: "affiliate.api_token".to_string(),
                    }
                })?;
                validation::validate_resolved("affiliate.api_token", token)?;
                validation::validate_non_empty_string("affiliate.api_token", token)?;
            }
        }

        validation::validate_path("store.path", self.store_path())?;
        if let Some(file) = self.logging.as_ref().and_then(|l| l.file.as_deref()) {
            validation::validate_path("logging.file", file)?;
        }

        // 發文數量範圍
        validation::validate_range("pipeline.max_count", self.max_count(), 1, MAX_POST_COUNT)?;
        validation::validate_range(
            "pipeline.default_count",
            self.default_count(),
            1,
            self.max_count(),
        )?;

        Ok(())
    }
}
