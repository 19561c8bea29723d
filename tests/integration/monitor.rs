//! Full passes through real adapters with every remote service mocked

use crate::test_utils::{mock_holidays, mock_quote, mock_telegram_ok, shanghai_time};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tripwire::config::{MonitorConfig, Settings, TelegramSettings};
use tripwire::core::clock::ManualClock;
use tripwire::core::runtime::MonitorRuntime;
use tripwire::engine::dedup::NotificationDeduper;
use tripwire::engine::fanout::NotificationFanout;
use tripwire::engine::gate::MarketGate;
use tripwire::engine::orchestrator::CheckOrchestrator;
use tripwire::engine::retry::RetryingFetcher;
use tripwire::metrics::Metrics;
use tripwire::models::outcome::OutcomeStatus;
use tripwire::services::calendar::HolidayCnCalendar;
use tripwire::services::market_data::TencentQuoteSource;
use tripwire::services::notify::{MessageChannel, TelegramChannel, WebhookChannel};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONFIG: &str = r#"{
    "stocks": [
        {"code": "SZ002261", "name": "Tuowei", "conditions": [{"type": "below", "value": 10}]},
        {"code": "SH600000", "name": "Pufa", "conditions": [{"type": "change_up", "value": 5}]}
    ]
}"#;

fn orchestrator(server: &MockServer, clock: Arc<ManualClock>, channels: Vec<Arc<dyn MessageChannel>>) -> CheckOrchestrator {
    let config = MonitorConfig::from_json(CONFIG).unwrap();
    CheckOrchestrator::new(
        Arc::new(TencentQuoteSource::with_client(server.uri(), reqwest::Client::new())),
        Arc::new(NotificationFanout::new(channels)),
        Arc::new(NotificationDeduper::with_clock(clock.clone())),
    )
    .with_gate(
        MarketGate::new(Arc::new(HolidayCnCalendar::with_client(server.uri(), reqwest::Client::new())))
            .with_clock(clock),
    )
    .with_retry(RetryingFetcher::new(2, Duration::from_millis(1)))
    .with_default_cooldown(config.default_cooldown())
}

#[tokio::test]
async fn trading_day_pass_alerts_on_triggered_quote() {
    let server = MockServer::start().await;
    mock_holidays(&server).await;
    mock_quote(&server, "SZ002261", 9.52, -1.2).await;
    mock_quote(&server, "SH600000", 10.4, 2.0).await;
    Mock::given(method("POST"))
        .and(path("/bot123:abc/sendMessage"))
        .and(body_string_contains("sz002261"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(shanghai_time(2024, 3, 4, 10, 0)));
    let telegram = TelegramChannel::with_client(server.uri(), reqwest::Client::new(), "123:abc", "42");
    let orchestrator = orchestrator(&server, clock, vec![Arc::new(telegram) as Arc<dyn MessageChannel>]);
    let subjects = MonitorConfig::from_json(CONFIG).unwrap().subjects();

    let summary = orchestrator.run_pass(&subjects).await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.alerted, 1);
    assert_eq!(summary.outcome("SH600000").unwrap().status, OutcomeStatus::Quiet);
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test]
async fn holiday_skips_the_pass_without_fetching_quotes() {
    let server = MockServer::start().await;
    mock_holidays(&server).await;
    Mock::given(method("GET"))
        .and(path("/q=sz002261"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(shanghai_time(2024, 10, 1, 10, 0)));
    let orchestrator = orchestrator(&server, clock, Vec::new());
    let subjects = MonitorConfig::from_json(CONFIG).unwrap().subjects();

    let summary = orchestrator.run_pass(&subjects).await;
    assert!(summary.is_skipped());
    assert_eq!(summary.skipped.as_deref(), Some("National Day"));
}

#[tokio::test]
async fn unreachable_quote_feed_fails_only_that_subject() {
    let server = MockServer::start().await;
    mock_holidays(&server).await;
    mock_quote(&server, "SZ002261", 11.0, 0.3).await;
    Mock::given(method("GET"))
        .and(path("/q=sh600000"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(shanghai_time(2024, 3, 4, 14, 0)));
    let orchestrator = orchestrator(&server, clock, Vec::new());
    let subjects = MonitorConfig::from_json(CONFIG).unwrap().subjects();

    let summary = orchestrator.run_pass(&subjects).await;
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.fetch_failures(), 1);
    assert_eq!(summary.exit_code(), 1);
}

#[tokio::test]
async fn runtime_built_from_settings_checks_listings() {
    let server = MockServer::start().await;
    mock_telegram_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "Available now",
            "final_url": "https://shop.example/vps/basic"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_string_contains("Basic VPS"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = MonitorConfig::from_json(
        r#"{
            "products": [{"name": "Basic VPS", "url": "https://shop.example/vps/basic"}],
            "sites": {"shop.example": {"selector": ".stock", "out_of_stock_text": "Sold out", "wait_ms": 0}},
            "retry": {"max_attempts": 1}
        }"#,
    )
    .unwrap();
    let settings = Settings {
        environment: "sandbox".to_string(),
        config_path: "monitor.json".to_string(),
        telegram: Some(TelegramSettings {
            bot_token: "123:abc".to_string(),
            chat_id: "42".to_string(),
            api_url: server.uri(),
        }),
        webhook_url: Some(format!("{}/hook", server.uri())),
        render_service_url: Some(server.uri()),
        quote_api_url: server.uri(),
        calendar_url: server.uri(),
        check_interval_seconds: 300,
        port: 0,
    };
    let metrics = Arc::new(Metrics::new().unwrap());

    let runtime = MonitorRuntime::build(&config, &settings, Some(metrics.clone())).unwrap();
    let summary = runtime.run_once().await.unwrap();

    assert_eq!(summary.alerted, 1);
    assert_eq!(metrics.alerts_sent_total.get(), 1);
    assert_eq!(metrics.cooldown_entries.get(), 1);

    // The webhook may still be in flight when telegram answers first
    tokio::time::sleep(Duration::from_millis(200)).await;
    let second = runtime.run_once().await.unwrap();
    assert_eq!(second.outcome("https://shop.example/vps/basic").unwrap().status, OutcomeStatus::CoolingDown);
}

#[tokio::test]
async fn webhook_only_delivery_is_enough() {
    let server = MockServer::start().await;
    mock_holidays(&server).await;
    mock_quote(&server, "SZ002261", 9.0, 0.0).await;
    mock_quote(&server, "SH600000", 10.0, 0.0).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(shanghai_time(2024, 3, 5, 9, 45)));
    let webhook = WebhookChannel::with_client(format!("{}/hook", server.uri()), reqwest::Client::new());
    let orchestrator = orchestrator(&server, clock, vec![Arc::new(webhook) as Arc<dyn MessageChannel>]);
    let subjects = MonitorConfig::from_json(CONFIG).unwrap().subjects();

    let summary = orchestrator.run_pass(&subjects).await;
    assert_eq!(summary.alerted, 1);
    assert_eq!(summary.undelivered, 0);
}
