use thiserror::Error;

#[derive(Error, Debug)]
pub enum DealError {
    #[error("Deal source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("Affiliate conversion failed for {url}: {reason}")]
    ConversionFailed { url: String, reason: String },

    #[error("Publishing failed: {reason}")]
    PublishFailed {
        reason: String,
        retry_after: Option<u64>,
    },

    #[error("Invalid request count '{value}': must be between {min} and {max}")]
    InvalidRequestCount {
        value: String,
        min: usize,
        max: usize,
    },

    #[error("Telegram API error ({code}): {description}")]
    TelegramApi { code: i64, description: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Posted {posted} products but could not record {product_id} as posted: {reason}")]
    RecordFailed {
        product_id: String,
        posted: usize,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Source,
    Affiliate,
    Publishing,
    Request,
    Network,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code for a failure of this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl DealError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DealError::SourceUnavailable { .. } => ErrorCategory::Source,
            DealError::ConversionFailed { .. } => ErrorCategory::Affiliate,
            DealError::PublishFailed { .. } | DealError::TelegramApi { .. } => {
                ErrorCategory::Publishing
            }
            DealError::InvalidRequestCount { .. } => ErrorCategory::Request,
            DealError::Http(_) => ErrorCategory::Network,
            DealError::Io(_) | DealError::RecordFailed { .. } => ErrorCategory::Storage,
            DealError::ConfigError { .. }
            | DealError::MissingConfigError { .. }
            | DealError::InvalidConfigValueError { .. }
            | DealError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DealError::ConversionFailed { .. }
            | DealError::PublishFailed { .. }
            | DealError::InvalidRequestCount { .. } => ErrorSeverity::Low,
            DealError::SourceUnavailable { .. } | DealError::Http(_) => ErrorSeverity::Medium,
            DealError::TelegramApi { .. } => ErrorSeverity::High,
            DealError::Io(_)
            | DealError::RecordFailed { .. }
            | DealError::ConfigError { .. }
            | DealError::MissingConfigError { .. }
            | DealError::InvalidConfigValueError { .. }
            | DealError::ConfigValidationError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Errors that only cost the pipeline a single listing.
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            DealError::ConversionFailed { .. } | DealError::PublishFailed { .. }
        )
    }

    /// Another process is polling the same bot token.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DealError::TelegramApi { code: 409, .. })
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DealError::SourceUnavailable { .. } => {
                "Failed to fetch products. Please try again later.".to_string()
            }
            DealError::ConversionFailed { .. } => {
                "Could not create an affiliate link for a product.".to_string()
            }
            DealError::PublishFailed { .. } => {
                "Could not post a product to the channel.".to_string()
            }
            DealError::InvalidRequestCount { min, max, .. } => {
                format!("Please choose a number of products between {} and {}.", min, max)
            }
            DealError::TelegramApi { description, .. } => {
                format!("Telegram rejected the request: {}", description)
            }
            DealError::Http(_) => "A network request failed.".to_string(),
            DealError::Io(_) => "Reading or writing a local file failed.".to_string(),
            DealError::RecordFailed { posted, .. } => format!(
                "Posted {} products, but could not save them as posted. They may be posted again.",
                posted
            ),
            DealError::ConfigError { message } => format!("Configuration problem: {}", message),
            DealError::MissingConfigError { field } => {
                format!("Missing required setting: {}", field)
            }
            DealError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting {}: {}", field, reason)
            }
            DealError::ConfigValidationError { field, message } => {
                format!("Invalid configuration ({}): {}", field, message)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.category() {
            ErrorCategory::Source => {
                "Check that the marketplace is reachable and that its page layout has not changed"
                    .to_string()
            }
            ErrorCategory::Affiliate => {
                "Verify the affiliate template or API token in the [affiliate] section".to_string()
            }
            ErrorCategory::Publishing => {
                if self.is_conflict() {
                    "Make sure only one bot instance is running with this token".to_string()
                } else {
                    "Check that the bot is an admin of the channel and wait before retrying"
                        .to_string()
                }
            }
            ErrorCategory::Request => "Use /post_count with a number such as 5".to_string(),
            ErrorCategory::Network => "Check the network connection and retry".to_string(),
            ErrorCategory::Storage => {
                "Check permissions and free space for the store path".to_string()
            }
            ErrorCategory::Configuration => {
                "Fix the configuration file or the environment variables it references"
                    .to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DealError>;
