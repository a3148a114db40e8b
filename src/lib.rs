pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::converter::AffiliateConverter;
pub use adapters::source::{Marketplace, MarketplaceSource};
pub use adapters::storage::LocalStorage;
pub use adapters::store::FileSeenStore;
pub use adapters::telegram::{TelegramApi, TelegramPublisher, TelegramUpdates};
pub use config::BotConfig;
pub use core::{engine::BotEngine, pipeline::DealPipeline};
pub use utils::error::{DealError, Result};
