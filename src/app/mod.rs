//! Wiring shared by the binaries: turns a validated [`BotConfig`] into live adapters.

use crate::adapters::converter::AffiliateConverter;
use crate::adapters::source::MarketplaceSource;
use crate::adapters::storage::LocalStorage;
use crate::adapters::store::FileSeenStore;
use crate::adapters::telegram::{TelegramApi, TelegramPublisher, TelegramUpdates};
use crate::config::BotConfig;
use crate::core::engine::{BotEngine, EngineSettings};
use crate::core::pipeline::DealPipeline;
use crate::domain::ports::SeenStore;
use crate::utils::error::{DealError, Result};

pub type BotPipeline = DealPipeline<
    MarketplaceSource,
    AffiliateConverter,
    TelegramPublisher,
    FileSeenStore<LocalStorage>,
>;

pub type Bot = BotEngine<TelegramUpdates, BotPipeline>;

pub fn engine_settings(config: &BotConfig) -> EngineSettings {
    EngineSettings {
        default_count: config.default_count(),
        max_count: config.max_count(),
        allowed_user_ids: config.telegram.allowed_user_ids(),
        ..EngineSettings::default()
    }
}

/// Store paths are resolved against the working directory; absolute paths are kept.
pub async fn build_pipeline(config: &BotConfig, api: TelegramApi) -> Result<BotPipeline> {
    let source = MarketplaceSource::from_config(&config.source)?;
    let converter = AffiliateConverter::from_config(&config.affiliate)?;
    let publisher = TelegramPublisher::from_config(api, &config.telegram);
    let store = FileSeenStore::load(LocalStorage::new("."), config.store_path()).await?;

    tracing::info!(
        "🛒 Source: {:?}, {} categories; {} products already posted",
        config.source.marketplace,
        config.source.categories().len(),
        store.len()
    );
    Ok(DealPipeline::new(source, converter, publisher, store))
}

pub async fn build_bot(config: &BotConfig) -> Result<Bot> {
    let api = TelegramApi::from_config(&config.telegram)?;

    // 啟動時先確認 token 有效
    let me = api.get_me().await?;
    tracing::info!(
        "✅ Logged in as @{}",
        me.username.as_deref().unwrap_or("unknown")
    );

    let pipeline = build_pipeline(config, api.clone()).await?;
    let updates = TelegramUpdates::new(api, config.telegram.poll_timeout_seconds());
    Ok(BotEngine::new(updates, pipeline, engine_settings(config)))
}

/// Logs a fatal error and returns the exit code for it.
pub fn report_failure(context: &str, e: &DealError) -> i32 {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    e.severity().exit_code()
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
