use clap::Parser;
use deal_bot::app;
use deal_bot::config::cli::PostOnceArgs;
use deal_bot::core::command::summary_text;
use deal_bot::core::format::format_price;
use deal_bot::domain::model::PostRequest;
use deal_bot::utils::{logger, validation::Validate};
use deal_bot::{BotConfig, TelegramApi};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = PostOnceArgs::parse();

    let config = match BotConfig::from_file(&args.common.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.severity().exit_code());
        }
    };

    let log_file = args.common.log_file.as_deref().or(config.log_file());
    if let Err(e) = logger::init_logger(
        args.common.verbose,
        args.common.json_logs || config.json_logs(),
        log_file,
    ) {
        eprintln!("❌ Cannot open log file: {e}");
        std::process::exit(3);
    }

    if let Err(e) = config.validate() {
        std::process::exit(app::report_failure("Configuration validation failed", &e));
    }

    let request = match PostRequest::with_limit(
        args.count.unwrap_or_else(|| config.default_count()),
        config.max_count(),
    ) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(2);
        }
    };

    let api = match TelegramApi::from_config(&config.telegram) {
        Ok(api) => api,
        Err(e) => std::process::exit(app::report_failure("Startup failed", &e)),
    };
    let mut pipeline = match app::build_pipeline(&config, api).await {
        Ok(pipeline) => pipeline,
        Err(e) => std::process::exit(app::report_failure("Startup failed", &e)),
    };

    if args.dry_run {
        // 只預覽，不轉換、不發文、不寫入
        match pipeline.preview(request).await {
            Ok(listings) if listings.is_empty() => println!("No new products found."),
            Ok(listings) => {
                println!("Would post {} products:", listings.len());
                for listing in listings {
                    println!(
                        "  [{}] {} ({}) {}",
                        listing.product_id,
                        listing.title,
                        format_price(&listing.currency, listing.price),
                        listing.original_url
                    );
                }
            }
            Err(e) => std::process::exit(app::report_failure("Dry run failed", &e)),
        }
        return Ok(());
    }

    match pipeline.run(request).await {
        Ok(result) => {
            tracing::info!(
                "✅ Posted {} of {} requested ({} skipped)",
                result.posted_count(),
                result.requested,
                result.skipped
            );
            println!("{}", summary_text(&result));
            Ok(())
        }
        Err(e) => std::process::exit(app::report_failure("Run failed", &e)),
    }
}
