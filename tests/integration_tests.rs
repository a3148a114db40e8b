use anyhow::Result;
use deal_bot::adapters::converter::{
    ApiLinkConverter, TemplateLinkConverter, DEFAULT_TEMPLATE,
};
use deal_bot::adapters::source::marketplace::DEFAULT_USER_AGENT;
use deal_bot::core::pipeline::DealPipeline;
use deal_bot::domain::model::PostRequest;
use deal_bot::domain::ports::SeenStore;
use deal_bot::{
    DealError, FileSeenStore, LocalStorage, Marketplace, MarketplaceSource, TelegramApi,
    TelegramPublisher,
};
use httpmock::prelude::*;
use std::time::Duration;
use tempfile::TempDir;

type TestPipeline = DealPipeline<
    MarketplaceSource,
    TemplateLinkConverter,
    TelegramPublisher,
    FileSeenStore<LocalStorage>,
>;

const STORE_FILE: &str = "seen_products.txt";

/// A Flipkart-style search page with `count` result cards, ITEM001 first.
fn search_page(count: usize) -> String {
    let cards: String = (1..=count)
        .map(|n| {
            format!(
                r#"<div data-id="ITEM{n:03}" style="width:25%">
  <a class="CGtC98" href="/product-{n}/p/itm{n}?pid=ITEM{n:03}&amp;lid=LST{n}">
    <div class="KzDlHZ">Product {n}</div>
    <div class="Nx9bqj">₹{n},499</div>
  </a>
</div>
"#
            )
        })
        .collect();
    format!("<html><body><div class=\"DOjaWF\">{cards}</div></body></html>")
}

async fn pipeline(server: &MockServer, dir: &TempDir) -> Result<TestPipeline> {
    let source = MarketplaceSource::new(
        Marketplace::Flipkart,
        Some(server.base_url().as_str()),
        vec!["laptops".to_string()],
        Duration::from_secs(5),
        Duration::ZERO,
        DEFAULT_USER_AGENT,
    )?;
    let converter = TemplateLinkConverter::new(DEFAULT_TEMPLATE, "4310721");
    let api = TelegramApi::new(&server.base_url(), "TEST", Duration::from_secs(5))?;
    let publisher = TelegramPublisher::new(api, "@deals", false, Duration::ZERO);
    let store = FileSeenStore::load(LocalStorage::new(dir.path()), STORE_FILE).await?;

    Ok(DealPipeline::new(source, converter, publisher, store))
}

fn stored_ids(dir: &TempDir) -> Vec<String> {
    std::fs::read_to_string(dir.path().join(STORE_FILE))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_posts_requested_count_and_records_ids() -> Result<()> {
    let server = MockServer::start();
    let temp_dir = TempDir::new()?;

    server.mock(|when, then| {
        when.method(GET).path("/search").query_param("q", "laptops");
        then.status(200).body(search_page(7));
    });
    let channel = server.mock(|when, then| {
        when.method(POST)
            .path("/botTEST/sendMessage")
            .json_body_partial(r#"{"chat_id": "@deals", "parse_mode": "MarkdownV2"}"#)
            .body_contains("earnkaro.com");
        then.status(200)
            .json_body(serde_json::json!({"ok": true, "result": {"message_id": 1}}));
    });

    let mut pipeline = pipeline(&server, &temp_dir).await?;
    let result = pipeline.run(PostRequest::new(5)?).await?;

    channel.assert_hits(5);
    assert_eq!(
        result.posted,
        vec!["ITEM001", "ITEM002", "ITEM003", "ITEM004", "ITEM005"]
    );
    assert_eq!(result.skipped, 0);
    assert!(result.is_complete());
    assert_eq!(stored_ids(&temp_dir), result.posted);

    Ok(())
}

#[tokio::test]
async fn test_second_run_only_posts_new_products() -> Result<()> {
    let server = MockServer::start();
    let temp_dir = TempDir::new()?;

    server.mock(|when, then| {
        when.method(GET).path("/search");
        then.status(200).body(search_page(7));
    });
    let channel = server.mock(|when, then| {
        when.method(POST).path("/botTEST/sendMessage");
        then.status(200)
            .json_body(serde_json::json!({"ok": true, "result": {}}));
    });

    let mut first = pipeline(&server, &temp_dir).await?;
    first.run(PostRequest::new(5)?).await?;
    drop(first);

    // A fresh process reads the store back from disk.
    let mut second = pipeline(&server, &temp_dir).await?;
    assert_eq!(second.store().len(), 5);
    let result = second.run(PostRequest::new(5)?).await?;

    channel.assert_hits(7);
    assert_eq!(result.posted, vec!["ITEM006", "ITEM007"]);
    assert!(!result.is_complete());
    assert_eq!(stored_ids(&temp_dir).len(), 7);

    let result = second.run(PostRequest::new(5)?).await?;
    assert!(result.posted.is_empty());
    channel.assert_hits(7);

    Ok(())
}

#[tokio::test]
async fn test_source_outage_leaves_channel_and_store_untouched() -> Result<()> {
    let server = MockServer::start();
    let temp_dir = TempDir::new()?;

    server.mock(|when, then| {
        when.method(GET).path("/search");
        then.status(503);
    });
    let channel = server.mock(|when, then| {
        when.method(POST).path("/botTEST/sendMessage");
        then.status(200)
            .json_body(serde_json::json!({"ok": true, "result": {}}));
    });

    let mut pipeline = pipeline(&server, &temp_dir).await?;
    let err = pipeline.run(PostRequest::new(5)?).await.unwrap_err();

    assert!(matches!(err, DealError::SourceUnavailable { .. }));
    assert_eq!(
        err.user_friendly_message(),
        "Failed to fetch products. Please try again later."
    );
    channel.assert_hits(0);
    assert!(!temp_dir.path().join(STORE_FILE).exists());

    Ok(())
}

#[tokio::test]
async fn test_rejected_posts_are_not_recorded() -> Result<()> {
    let server = MockServer::start();
    let temp_dir = TempDir::new()?;

    server.mock(|when, then| {
        when.method(GET).path("/search");
        then.status(200).body(search_page(3));
    });
    server.mock(|when, then| {
        when.method(POST).path("/botTEST/sendMessage");
        then.status(403).json_body(serde_json::json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot is not a member of the channel chat"
        }));
    });

    let mut pipeline = pipeline(&server, &temp_dir).await?;
    let result = pipeline.run(PostRequest::new(2)?).await?;

    assert!(result.posted.is_empty());
    assert_eq!(result.skipped, 3);
    assert!(pipeline.store().is_empty());
    assert!(stored_ids(&temp_dir).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_preview_does_not_post_or_record() -> Result<()> {
    let server = MockServer::start();
    let temp_dir = TempDir::new()?;

    server.mock(|when, then| {
        when.method(GET).path("/search");
        then.status(200).body(search_page(4));
    });
    let channel = server.mock(|when, then| {
        when.method(POST).path("/botTEST/sendMessage");
        then.status(200)
            .json_body(serde_json::json!({"ok": true, "result": {}}));
    });

    let pipeline = pipeline(&server, &temp_dir).await?;
    let listings = pipeline.preview(PostRequest::new(3)?).await?;

    let ids: Vec<&str> = listings.iter().map(|l| l.product_id.as_str()).collect();
    assert_eq!(ids, vec!["ITEM001", "ITEM002", "ITEM003"]);
    assert_eq!(listings[0].price, 1499.0);
    channel.assert_hits(0);
    assert!(!temp_dir.path().join(STORE_FILE).exists());

    Ok(())
}

#[tokio::test]
async fn test_slow_affiliate_service_skips_only_that_product() -> Result<()> {
    let server = MockServer::start();
    let temp_dir = TempDir::new()?;

    server.mock(|when, then| {
        when.method(GET).path("/search");
        then.status(200).body(search_page(3));
    });
    for id in ["ITEM001", "ITEM003"] {
        server.mock(|when, then| {
            when.method(POST).path("/convert").body_contains(id);
            then.status(200).json_body(serde_json::json!({
                "success": 1,
                "data": format!("https://ekaro.in/{id}")
            }));
        });
    }
    server.mock(|when, then| {
        when.method(POST).path("/convert").body_contains("ITEM002");
        then.status(200)
            .delay(Duration::from_secs(2))
            .json_body(serde_json::json!({"success": 1, "data": "https://ekaro.in/late"}));
    });
    let channel = server.mock(|when, then| {
        when.method(POST)
            .path("/botTEST/sendMessage")
            .body_contains("ekaro.in");
        then.status(200)
            .json_body(serde_json::json!({"ok": true, "result": {}}));
    });

    let source = MarketplaceSource::new(
        Marketplace::Flipkart,
        Some(server.base_url().as_str()),
        vec!["laptops".to_string()],
        Duration::from_secs(5),
        Duration::ZERO,
        DEFAULT_USER_AGENT,
    )?;
    let converter =
        ApiLinkConverter::new(server.url("/convert"), "token", Duration::from_millis(300))?;
    let api = TelegramApi::new(&server.base_url(), "TEST", Duration::from_secs(5))?;
    let publisher = TelegramPublisher::new(api, "@deals", false, Duration::ZERO);
    let store = FileSeenStore::load(LocalStorage::new(temp_dir.path()), STORE_FILE).await?;
    let mut pipeline = DealPipeline::new(source, converter, publisher, store);

    let result = pipeline.run(PostRequest::new(3)?).await?;

    channel.assert_hits(2);
    assert_eq!(result.posted, vec!["ITEM001", "ITEM003"]);
    assert_eq!(result.skipped, 1);
    assert!(!pipeline.store().contains("ITEM002"));
    assert_eq!(stored_ids(&temp_dir), result.posted);

    Ok(())
}
