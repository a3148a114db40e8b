use crate::utils::error::{DealError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_POST_COUNT: usize = 5;
pub const MAX_POST_COUNT: usize = 10;

/// One product scraped from a marketplace search page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealListing {
    pub product_id: String,
    pub title: String,
    pub price: f64,
    pub currency: String,
    pub original_url: String,
    pub image_url: Option<String>,
    pub rating: Option<String>,
    pub marketplace: String,
    pub fetched_at: DateTime<Utc>,
}

/// How many listings an operator asked for. Always within `1..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostRequest {
    count: usize,
}

impl PostRequest {
    pub fn new(count: usize) -> Result<Self> {
        Self::with_limit(count, MAX_POST_COUNT)
    }

    pub fn with_limit(count: usize, max: usize) -> Result<Self> {
        if count == 0 || count > max {
            return Err(DealError::InvalidRequestCount {
                value: count.to_string(),
                min: 1,
                max,
            });
        }
        Ok(Self { count })
    }

    /// Parses an operator-supplied argument such as the `3` in `/post_count 3`.
    pub fn parse(raw: &str, max: usize) -> Result<Self> {
        let count = raw
            .trim()
            .parse::<usize>()
            .map_err(|_| DealError::InvalidRequestCount {
                value: raw.trim().to_string(),
                min: 1,
                max,
            })?;
        Self::with_limit(count, max)
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Text ready for the channel, plus an optional photo to attach it to.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedMessage {
    pub product_id: String,
    pub text: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineResult {
    pub requested: usize,
    pub candidates: usize,
    pub posted: Vec<String>,
    pub skipped: usize,
}

impl PipelineResult {
    pub fn new(requested: usize, candidates: usize) -> Self {
        Self {
            requested,
            candidates,
            posted: Vec::new(),
            skipped: 0,
        }
    }

    pub fn posted_count(&self) -> usize {
        self.posted.len()
    }

    pub fn is_complete(&self) -> bool {
        self.posted.len() >= self.requested
    }
}

/// A text message received by the bot from an operator chat.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub text: String,
}
