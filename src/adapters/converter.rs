use crate::config::toml_config::{AffiliateConfig, AffiliateMode};
use crate::domain::ports::LinkConverter;
use crate::utils::error::{DealError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_TEMPLATE: &str = "https://earnkaro.com/flipkart?url={url}&subid={tracking_id}";

fn conversion_failed(url: &str, reason: impl Into<String>) -> DealError {
    DealError::ConversionFailed {
        url: url.to_string(),
        reason: reason.into(),
    }
}

fn parse_http_url(original_url: &str) -> Result<Url> {
    let url = Url::parse(original_url)
        .map_err(|e| conversion_failed(original_url, format!("invalid URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(conversion_failed(
            original_url,
            format!("unsupported scheme {}", scheme),
        )),
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Builds the affiliate URL locally from a template such as
/// `https://earnkaro.com/flipkart?url={url}&subid={tracking_id}`.
#[derive(Debug, Clone)]
pub struct TemplateLinkConverter {
    template: String,
    tracking_id: String,
}

impl TemplateLinkConverter {
    pub fn new(template: impl Into<String>, tracking_id: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            tracking_id: tracking_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl LinkConverter for TemplateLinkConverter {
    async fn convert(&self, original_url: &str) -> Result<String> {
        let url = parse_http_url(original_url)?;
        let converted = self
            .template
            .replace("{url}", &encode(url.as_str()))
            .replace("{tracking_id}", &encode(&self.tracking_id));

        parse_http_url(&converted)
            .map(|u| u.to_string())
            .map_err(|_| conversion_failed(original_url, "template produced an invalid URL"))
    }
}

#[derive(Debug, Serialize)]
struct ConvertRequest<'a> {
    deal: &'a str,
    convert_option: &'a str,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    success: serde_json::Value,
    data: Option<String>,
    message: Option<String>,
}

impl ConvertResponse {
    fn succeeded(&self) -> bool {
        match &self.success {
            serde_json::Value::Bool(ok) => *ok,
            serde_json::Value::Number(n) => n.as_i64() == Some(1),
            _ => false,
        }
    }
}

/// Asks a remote affiliate service (EarnKaro style `{"deal": ..}` API) to convert the link.
#[derive(Debug, Clone)]
pub struct ApiLinkConverter {
    client: Client,
    endpoint: String,
    api_token: String,
}

impl ApiLinkConverter {
    pub fn new(
        endpoint: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.into(),
            api_token: api_token.into(),
        })
    }
}

#[async_trait::async_trait]
impl LinkConverter for ApiLinkConverter {
    async fn convert(&self, original_url: &str) -> Result<String> {
        parse_http_url(original_url)?;

        tracing::debug!("Converting {} via {}", original_url, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&ConvertRequest {
                deal: original_url,
                convert_option: "convert_only",
            })
            .send()
            .await
            .map_err(|e| conversion_failed(original_url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(conversion_failed(
                original_url,
                format!("affiliate service returned HTTP {}", status.as_u16()),
            ));
        }

        let body: ConvertResponse = response
            .json()
            .await
            .map_err(|e| conversion_failed(original_url, format!("unreadable reply: {}", e)))?;

        if !body.succeeded() {
            return Err(conversion_failed(
                original_url,
                body.message.unwrap_or_else(|| "conversion rejected".to_string()),
            ));
        }

        let converted = body.data.unwrap_or_default();
        let converted = converted.trim();
        parse_http_url(converted)
            .map(|u| u.to_string())
            .map_err(|_| conversion_failed(original_url, "affiliate service returned no link"))
    }
}

/// The converter picked by `[affiliate] mode`.
#[derive(Debug, Clone)]
pub enum AffiliateConverter {
    Template(TemplateLinkConverter),
    Api(ApiLinkConverter),
}

impl AffiliateConverter {
    pub fn from_config(config: &AffiliateConfig) -> Result<Self> {
        match config.mode {
            AffiliateMode::Template => Ok(AffiliateConverter::Template(TemplateLinkConverter::new(
                config.template.as_deref().unwrap_or(DEFAULT_TEMPLATE),
                config.tracking_id.clone().unwrap_or_default(),
            ))),
            AffiliateMode::Api => {
                let endpoint = config.endpoint.clone().ok_or_else(|| DealError::MissingConfigError {
                    field: "affiliate.endpoint".to_string(),
                })?;
                let token = config.api_token.clone().ok_or_else(|| DealError::MissingConfigError {
                    field: "affiliate.api_token".to_string(),
                })?;
                Ok(AffiliateConverter::Api(ApiLinkConverter::new(
                    endpoint,
                    token,
                    Duration::from_secs(config.timeout_seconds()),
                )?))
            }
        }
    }
}

#[async_trait::async_trait]
impl LinkConverter for AffiliateConverter {
    async fn convert(&self, original_url: &str) -> Result<String> {
        match self {
            AffiliateConverter::Template(converter) => converter.convert(original_url).await,
            AffiliateConverter::Api(converter) => converter.convert(original_url).await,
        }
    }
}
