//! Operator command surface: parsing chat text into commands and the reply texts.

use crate::domain::model::{PipelineResult, PostRequest};
use crate::utils::error::{DealError, Result};

pub const START_TEXT: &str = "Welcome! I'm your Product Bot. Use /post to share products or \
/post_count <number> to specify how many products to post.";

pub const ECHO_TEXT: &str = "I'm a product bot that posts products to a channel. \
Use /post to share products or /help for more information.";

pub const UNAUTHORIZED_TEXT: &str = "Sorry, you are not allowed to control this bot.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Help,
    Post(PostRequest),
    /// Plain text that is not a command.
    Text,
    Unknown(String),
}

impl Command {
    /// `/post` uses `default_count`; `/post N` and `/post_count N` use `N`.
    /// Counts outside `1..=max_count` are rejected here, before any pipeline run.
    pub fn parse(text: &str, default_count: usize, max_count: usize) -> Result<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return Ok(Command::Text);
        }

        let mut parts = text.split_whitespace();
        let head = parts.next().unwrap_or_default();
        let name = head
            .trim_start_matches('/')
            .split('@')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let arg = parts.next();

        match name.as_str() {
            "start" => Ok(Command::Start),
            "help" => Ok(Command::Help),
            "post" => {
                let request = match arg {
                    Some(raw) => PostRequest::parse(raw, max_count)?,
                    None => PostRequest::with_limit(default_count, max_count)?,
                };
                Ok(Command::Post(request))
            }
            "post_count" => {
                let raw = arg.ok_or_else(|| DealError::InvalidRequestCount {
                    value: String::new(),
                    min: 1,
                    max: max_count,
                })?;
                Ok(Command::Post(PostRequest::parse(raw, max_count)?))
            }
            other => Ok(Command::Unknown(other.to_string())),
        }
    }
}

pub fn help_text(default_count: usize, max_count: usize) -> String {
    format!(
        "Available commands:\n\
         /start - Start the bot\n\
         /post - Post {} products to the channel\n\
         /post_count <number> - Post specified number of products (max {})\n\
         /help - Show this help message",
        default_count, max_count
    )
}

pub fn unknown_text(name: &str) -> String {
    format!("Unknown command /{}. Use /help to see what I can do.", name)
}

pub fn progress_text(request: &PostRequest) -> String {
    format!("Searching for {} products. Please wait...", request.count())
}

pub fn summary_text(result: &PipelineResult) -> String {
    let posted = result.posted_count();
    match (posted, result.skipped) {
        (0, 0) => "No new products found at the moment. Please try again later.".to_string(),
        (0, skipped) => format!(
            "Failed to post any products ({} skipped). Please check the logs for details.",
            skipped
        ),
        (posted, 0) if posted >= result.requested => {
            format!("Successfully posted {} products to the channel!", posted)
        }
        (posted, skipped) => format!(
            "Posted {} of {} requested products ({} skipped, {} new candidates available).",
            posted, result.requested, skipped, result.candidates
        ),
    }
}

pub fn failure_text(error: &DealError) -> String {
    format!("{}\nReason: {}", error.user_friendly_message(), error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(Command::parse("/start", 5, 10).unwrap(), Command::Start);
        assert_eq!(Command::parse("/help", 5, 10).unwrap(), Command::Help);
        assert_eq!(Command::parse("hello there", 5, 10).unwrap(), Command::Text);
        assert_eq!(
            Command::parse("/deals", 5, 10).unwrap(),
            Command::Unknown("deals".to_string())
        );
    }

    #[test]
    fn test_parse_post_uses_default_count() {
        let command = Command::parse("/post", 5, 10).unwrap();
        assert_eq!(command, Command::Post(PostRequest::new(5).unwrap()));
    }

    #[test]
    fn test_parse_post_with_count_and_bot_suffix() {
        let command = Command::parse("/post_count@DealsBot 3", 5, 10).unwrap();
        assert_eq!(command, Command::Post(PostRequest::new(3).unwrap()));

        let command = Command::parse("/post 8", 5, 10).unwrap();
        assert_eq!(command, Command::Post(PostRequest::new(8).unwrap()));
    }

    #[test]
    fn test_parse_rejects_out_of_range_counts() {
        for text in ["/post_count 0", "/post_count 11", "/post_count abc", "/post_count"] {
            let err = Command::parse(text, 5, 10).unwrap_err();
            assert!(
                matches!(err, DealError::InvalidRequestCount { .. }),
                "{} should be rejected",
                text
            );
        }
    }

    #[test]
    fn test_summary_text_variants() {
        let mut result = PipelineResult::new(5, 7);
        assert!(summary_text(&result).starts_with("No new products"));

        result.skipped = 2;
        assert!(summary_text(&result).starts_with("Failed to post any products"));

        result.skipped = 0;
        result.posted = (1..=5).map(|i| format!("P{}", i)).collect();
        assert_eq!(
            summary_text(&result),
            "Successfully posted 5 products to the channel!"
        );

        result.posted.truncate(2);
        result.skipped = 1;
        assert!(summary_text(&result).starts_with("Posted 2 of 5 requested products"));
    }

    #[test]
    fn test_help_text_mentions_limits() {
        let text = help_text(5, 10);
        assert!(text.contains("/post - Post 5 products"));
        assert!(text.contains("(max 10)"));
    }
}
