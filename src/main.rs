use clap::Parser;
use deal_bot::app;
use deal_bot::config::cli::CliArgs;
use deal_bot::utils::{logger, validation::Validate};
use deal_bot::BotConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 先讀設定，日誌格式取決於設定檔
    let config = match BotConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code());
        }
    };

    // 初始化日誌
    let log_file = args.log_file.as_deref().or(config.log_file());
    if let Err(e) = logger::init_logger(
        args.verbose,
        args.json_logs || config.json_logs(),
        log_file,
    ) {
        eprintln!("❌ Cannot open log file: {e}");
        std::process::exit(3);
    }
    tracing::info!("Starting deal-bot with {}", args.config.display());

    // 驗證配置
    if let Err(e) = config.validate() {
        std::process::exit(app::report_failure("Configuration validation failed", &e));
    }

    let mut bot = match app::build_bot(&config).await {
        Ok(bot) => bot,
        Err(e) => std::process::exit(app::report_failure("Startup failed", &e)),
    };

    match bot.run(app::shutdown_signal()).await {
        Ok(()) => {
            tracing::info!("👋 Bot stopped");
            Ok(())
        }
        Err(e) => std::process::exit(app::report_failure("Bot stopped", &e)),
    }
}
