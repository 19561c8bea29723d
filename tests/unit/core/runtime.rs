//! Unit tests for runtime wiring

use crate::support::{quote, MockQuotes, RecordingChannel};
use std::sync::Arc;
use std::time::Duration;
use tripwire::config::{MonitorConfig, Settings};
use tripwire::core::runtime::{MonitorRuntime, RuntimeConfig};
use tripwire::engine::dedup::NotificationDeduper;
use tripwire::engine::fanout::NotificationFanout;
use tripwire::engine::orchestrator::CheckOrchestrator;
use tripwire::error::ConfigError;
use tripwire::models::condition::Condition;
use tripwire::models::subject::Subject;
use tripwire::services::notify::MessageChannel;

#[test]
fn runtime_config_default() {
    let config = RuntimeConfig::default();
    assert_eq!(config.check_interval_seconds, 300);
    assert_eq!(config.port, 8080);
}

fn runtime(channel: Arc<RecordingChannel>) -> MonitorRuntime {
    runtime_with(vec![channel as Arc<dyn MessageChannel>])
}

fn runtime_with(channels: Vec<Arc<dyn MessageChannel>>) -> MonitorRuntime {
    let orchestrator = CheckOrchestrator::new(
        Arc::new(MockQuotes::new().with_quote(quote("SZ002261", 9.5, 0.0))),
        Arc::new(NotificationFanout::new(channels)),
        Arc::new(NotificationDeduper::new()),
    );
    let subjects = vec![Subject::quote(
        "SZ002261",
        "Tuowei",
        vec![Condition::Below {
            value: 10.0,
            message: None,
        }],
    )];
    MonitorRuntime::new(orchestrator, subjects)
}

#[tokio::test]
async fn run_once_stores_last_summary() {
    let runtime = runtime(RecordingChannel::ok("recorder"));
    assert!(runtime.last_pass().read().await.is_none());

    let summary = runtime.run_once().await.expect("pass ran");
    assert_eq!(summary.alerted, 1);

    let stored = runtime.last_pass();
    let stored = stored.read().await;
    assert_eq!(stored.as_ref().unwrap().alerted, 1);
}

#[tokio::test]
async fn shutdown_completes_slow_deliveries_before_exit() {
    let fast = RecordingChannel::ok("fast");
    let slow = RecordingChannel::slow("slow", Duration::from_millis(200));
    let runtime = runtime_with(vec![fast.clone() as Arc<dyn MessageChannel>, slow.clone()]);

    let summary = runtime.run_once().await.expect("pass ran");
    assert_eq!(summary.alerted, 1);
    assert_eq!(fast.sent().len(), 1);

    runtime.shutdown().await;
    drop(runtime);
    assert_eq!(slow.sent().len(), 1);
}

#[tokio::test]
async fn cooldown_survives_between_passes() {
    let channel = RecordingChannel::ok("recorder");
    let runtime = runtime(channel.clone());

    runtime.run_once().await;
    runtime.run_once().await;
    assert_eq!(channel.sent().len(), 1);
}

#[tokio::test]
async fn zero_prune_age_clears_cooldowns_after_each_pass() {
    let channel = RecordingChannel::ok("recorder");
    let runtime = runtime(channel.clone()).with_prune_after(Duration::ZERO);

    runtime.run_once().await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    runtime.run_once().await;
    assert_eq!(channel.sent().len(), 2);
}

#[test]
fn listings_need_a_render_service() {
    let config = MonitorConfig::from_json(
        r#"{"products": [{"name": "Basic VPS", "url": "https://shop.example/vps"}]}"#,
    )
    .unwrap();
    let settings = Settings {
        environment: "sandbox".to_string(),
        config_path: "monitor.json".to_string(),
        telegram: None,
        webhook_url: Some("http://hooks.invalid".to_string()),
        render_service_url: None,
        quote_api_url: "http://quotes.invalid".to_string(),
        calendar_url: "http://calendar.invalid".to_string(),
        check_interval_seconds: 300,
        port: 8080,
    };

    match MonitorRuntime::build(&config, &settings, None) {
        Err(ConfigError::MissingEnv(name)) => assert_eq!(name, "RENDER_SERVICE_URL"),
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("expected a missing render service error"),
    }
}
