use crate::adapters::source::html::{self, Tag};
use crate::config::toml_config::SourceConfig;
use crate::domain::model::DealListing;
use crate::domain::ports::DealSource;
use crate::utils::error::{DealError, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    Amazon,
    Flipkart,
}

/// Where a marketplace's search page lives and how its result cards are marked up.
#[derive(Debug)]
pub struct MarketplaceProfile {
    pub display_name: &'static str,
    pub base_url: &'static str,
    pub search_path: &'static str,
    pub query_param: &'static str,
    pub extra_params: &'static [(&'static str, &'static str)],
    pub container_marker: &'static str,
    pub id_attribute: &'static str,
    pub title_classes: &'static [&'static str],
    pub price_classes: &'static [&'static str],
    pub rating_classes: &'static [&'static str],
    pub image_classes: &'static [&'static str],
    pub link_hints: &'static [&'static str],
    pub currency: &'static str,
}

static AMAZON: MarketplaceProfile = MarketplaceProfile {
    display_name: "Amazon",
    base_url: "https://www.amazon.in",
    search_path: "/s",
    query_param: "k",
    extra_params: &[("ref", "nb_sb_noss"), ("sort", "popularity-rank")],
    container_marker: "data-component-type=\"s-search-result\"",
    id_attribute: "data-asin",
    title_classes: &["a-size-medium", "a-size-base-plus"],
    price_classes: &["a-price-whole", "a-offscreen"],
    rating_classes: &["a-icon-alt"],
    image_classes: &["s-image"],
    link_hints: &["/dp/"],
    currency: "₹",
};

static FLIPKART: MarketplaceProfile = MarketplaceProfile {
    display_name: "Flipkart",
    base_url: "https://www.flipkart.com",
    search_path: "/search",
    query_param: "q",
    extra_params: &[
        ("otracker", "search"),
        ("marketplace", "FLIPKART"),
        ("sort", "popularity"),
    ],
    container_marker: "data-id=\"",
    id_attribute: "data-id",
    title_classes: &["KzDlHZ", "wjcEIp", "_4rR01T", "s1Q9rs", "_2WkVRV"],
    price_classes: &["Nx9bqj", "_30jeq3"],
    rating_classes: &["XQDdHH", "_3LWZlK"],
    image_classes: &["DByuf4", "_396cs4", "_2r_T1I"],
    link_hints: &["/p/"],
    currency: "₹",
};

impl Marketplace {
    pub fn profile(&self) -> &'static MarketplaceProfile {
        match self {
            Marketplace::Amazon => &AMAZON,
            Marketplace::Flipkart => &FLIPKART,
        }
    }
}

/// First number in `text`, thousands separators removed: `"₹1,299.00"` → `1299.0`.
pub fn parse_price(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];

    let mut end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ','))
        .unwrap_or(rest.len());
    if rest[end..].starts_with('.') {
        let decimals = rest[end + 1..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len() - end - 1);
        if decimals > 0 {
            end += 1 + decimals;
        }
    }

    rest[..end].replace(',', "").parse().ok()
}

/// Stable product key from a product URL: Amazon `/dp/<ASIN>`, Flipkart `pid=`,
/// otherwise the URL path.
pub fn product_id_from_url(url: &Url) -> Option<String> {
    if let Some(segments) = url.path_segments() {
        let segments: Vec<&str> = segments.collect();
        if let Some(pos) = segments.iter().position(|s| *s == "dp") {
            if let Some(asin) = segments.get(pos + 1).filter(|s| !s.is_empty()) {
                return Some(asin.to_string());
            }
        }
    }

    if let Some((_, pid)) = url.query_pairs().find(|(key, _)| key == "pid") {
        let pid = pid.trim();
        if !pid.is_empty() {
            return Some(pid.to_string());
        }
    }

    let path = url.path().trim_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

fn product_link(tags: &[Tag<'_>], profile: &MarketplaceProfile, base: &Url) -> Option<Url> {
    let hrefs: Vec<String> = tags
        .iter()
        .filter(|tag| tag.name == "a")
        .filter_map(|tag| tag.attr("href"))
        .filter(|href| {
            !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript")
        })
        .collect();

    let href = hrefs
        .iter()
        .find(|href| profile.link_hints.iter().any(|hint| href.contains(hint)))
        .or_else(|| hrefs.first())?;

    base.join(href).ok()
}

fn image_url(tags: &[Tag<'_>], profile: &MarketplaceProfile) -> Option<String> {
    tags.iter()
        .filter(|tag| tag.name == "img")
        .filter(|tag| profile.image_classes.iter().any(|class| tag.has_class(class)))
        .find_map(|tag| tag.attr("src").or_else(|| tag.attr("data-src")))
        .filter(|src| src.starts_with("http://") || src.starts_with("https://"))
}

fn title(block: &str, tags: &[Tag<'_>], profile: &MarketplaceProfile) -> Option<String> {
    html::text_by_classes(block, tags, profile.title_classes)
        .or_else(|| {
            tags.iter()
                .filter(|tag| tag.name == "h2")
                .find_map(|tag| html::inner_text(block, tag))
        })
        .or_else(|| {
            tags.iter()
                .filter(|tag| tag.name == "a")
                .find_map(|tag| tag.attr("title"))
        })
        .or_else(|| {
            tags.iter()
                .filter(|tag| tag.name == "img")
                .find_map(|tag| tag.attr("alt"))
        })
        .map(|t| html::normalize_ws(&t))
        .filter(|t| !t.is_empty())
}

fn price(block: &str, tags: &[Tag<'_>], profile: &MarketplaceProfile) -> Option<f64> {
    html::text_by_classes(block, tags, profile.price_classes)
        .and_then(|text| parse_price(&text))
        .or_else(|| {
            let text = html::strip_tags(block);
            let at = text.find(profile.currency)?;
            parse_price(&text[at..])
        })
}

fn parse_block(
    block: &str,
    profile: &MarketplaceProfile,
    base: &Url,
    fetched_at: DateTime<Utc>,
) -> Option<DealListing> {
    let tags = html::open_tags(block);

    let Some(title) = title(block, &tags, profile) else {
        tracing::warn!("Missing title in {} result container", profile.display_name);
        return None;
    };
    let Some(price) = price(block, &tags, profile) else {
        tracing::warn!("Missing price for '{}'", title);
        return None;
    };
    let Some(link) = product_link(&tags, profile, base) else {
        tracing::warn!("Missing product link for '{}'", title);
        return None;
    };

    let product_id = tags
        .first()
        .and_then(|tag| tag.attr(profile.id_attribute))
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .or_else(|| product_id_from_url(&link))?;

    let rating = html::text_by_classes(block, &tags, profile.rating_classes);

    Some(DealListing {
        product_id,
        title,
        price,
        currency: profile.currency.to_string(),
        original_url: link.to_string(),
        image_url: image_url(&tags, profile),
        rating,
        marketplace: profile.display_name.to_string(),
        fetched_at,
    })
}

/// Every complete listing on one search page, in page order.
pub fn extract_listings(
    page: &str,
    profile: &MarketplaceProfile,
    base: &Url,
    fetched_at: DateTime<Utc>,
) -> Vec<DealListing> {
    let blocks = html::result_blocks(page, profile.container_marker);
    tracing::debug!(
        "Found {} result containers with marker {}",
        blocks.len(),
        profile.container_marker
    );

    blocks
        .into_iter()
        .filter_map(|block| parse_block(block, profile, base, fetched_at))
        .collect()
}

/// Scrapes marketplace search pages, one request per category.
pub struct MarketplaceSource {
    client: Client,
    profile: &'static MarketplaceProfile,
    base_url: Url,
    categories: Vec<String>,
    request_delay: Duration,
}

impl MarketplaceSource {
    pub fn new(
        marketplace: Marketplace,
        base_url: Option<&str>,
        categories: Vec<String>,
        timeout: Duration,
        request_delay: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let profile = marketplace.profile();
        let base = base_url.unwrap_or(profile.base_url);
        let base_url = Url::parse(base).map_err(|e| DealError::InvalidConfigValueError {
            field: "source.base_url".to_string(),
            value: base.to_string(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            profile,
            base_url,
            categories,
            request_delay,
        })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Self::new(
            config.marketplace,
            config.base_url.as_deref(),
            config.categories(),
            Duration::from_secs(config.timeout_seconds()),
            Duration::from_millis(config.request_delay_ms()),
            config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT),
        )
    }

    async fn fetch_category(&self, category: &str) -> Result<Vec<DealListing>> {
        let url = self
            .base_url
            .join(self.profile.search_path)
            .map_err(|e| DealError::SourceUnavailable {
                reason: format!("bad search URL: {}", e),
            })?;

        let mut params = vec![(self.profile.query_param, category)];
        params.extend(self.profile.extra_params.iter().copied());

        tracing::debug!("Making search request to: {} ({})", url, category);
        let response = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(|e| DealError::SourceUnavailable {
                reason: format!("request for '{}' failed: {}", category, e),
            })?;

        let status = response.status();
        tracing::debug!("Search response status: {}", status);
        if !status.is_success() {
            return Err(DealError::SourceUnavailable {
                reason: format!("HTTP {} for category '{}'", status.as_u16(), category),
            });
        }

        let page = response
            .text()
            .await
            .map_err(|e| DealError::SourceUnavailable {
                reason: format!("unreadable page for '{}': {}", category, e),
            })?;

        Ok(extract_listings(&page, self.profile, &self.base_url, Utc::now()))
    }
}

#[async_trait::async_trait]
impl DealSource for MarketplaceSource {
    async fn fetch_candidates(&self) -> Result<Vec<DealListing>> {
        let mut listings = Vec::new();
        let mut seen = HashSet::new();
        let mut failures = Vec::new();
        let mut pages = 0;

        for (i, category) in self.categories.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            tracing::info!(
                "🔎 Searching for {} on {}...",
                category,
                self.profile.display_name
            );
            match self.fetch_category(category).await {
                Ok(found) => {
                    pages += 1;
                    tracing::info!("Found {} products for {}", found.len(), category);
                    for listing in found {
                        if seen.insert(listing.product_id.clone()) {
                            listings.push(listing);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("⚠️ {}", e);
                    failures.push(e.to_string());
                }
            }
        }

        if pages == 0 {
            let reason = if failures.is_empty() {
                "no categories configured".to_string()
            } else {
                failures.join("; ")
            };
            return Err(DealError::SourceUnavailable { reason });
        }
        if listings.is_empty() {
            return Err(DealError::SourceUnavailable {
                reason: format!(
                    "no product listings could be parsed from {} search pages",
                    self.profile.display_name
                ),
            });
        }

        Ok(listings)
    }
}
