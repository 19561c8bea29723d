//! Unit tests for the subjects file and channel configuration

use std::time::Duration;
use tripwire::config::{MonitorConfig, Settings, TelegramSettings};
use tripwire::core::runtime::build_channels;
use tripwire::error::ConfigError;
use tripwire::models::subject::SubjectSource;

const SAMPLE: &str = r#"{
    "stocks": [
        {
            "code": "SZ002261",
            "name": "Tuowei",
            "conditions": [
                {"type": "below", "value": 10},
                {"type": "change_down", "value": 5, "message": "Sharp drop"}
            ]
        },
        {
            "code": "SH600000",
            "name": "Pufa",
            "cooldown_secs": 600,
            "conditions": [{"type": "range", "min": 9.5, "max": 10.5}]
        }
    ],
    "products": [
        {"name": "Basic VPS", "url": "https://www.shop.example/vps/basic"}
    ],
    "sites": {
        "shop.example": {"selector": ".stock", "out_of_stock_text": "Sold out"}
    },
    "retry": {"max_attempts": 5}
}"#;

fn settings() -> Settings {
    Settings {
        environment: "sandbox".to_string(),
        config_path: "monitor.json".to_string(),
        telegram: None,
        webhook_url: None,
        render_service_url: None,
        quote_api_url: "http://quotes.invalid".to_string(),
        calendar_url: "http://calendar.invalid".to_string(),
        check_interval_seconds: 300,
        port: 8080,
    }
}

#[test]
fn parses_subjects_with_defaults() {
    let config = MonitorConfig::from_json(SAMPLE).unwrap();

    assert_eq!(config.default_cooldown(), Duration::from_secs(3600));
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.delay_ms, 2000);
    assert_eq!(config.sites.resolve("shop.example").unwrap().wait_ms, 3000);
    assert_eq!(config.max_cooldown(), Duration::from_secs(3600));

    let subjects = config.subjects();
    assert_eq!(subjects.len(), 3);
    assert_eq!(subjects[0].id, "SZ002261");
    assert_eq!(subjects[1].cooldown, Some(Duration::from_secs(600)));
    assert!(matches!(subjects[2].source, SubjectSource::Listing { .. }));
    // Product without conditions alerts when in stock
    assert_eq!(subjects[2].conditions.len(), 1);
}

#[test]
fn retry_settings_build_a_fetcher() {
    let config = MonitorConfig::from_json(SAMPLE).unwrap();
    let fetcher = config.retry.fetcher();
    assert_eq!(fetcher.max_attempts(), 5);
    assert_eq!(fetcher.delay(), Duration::from_millis(2000));
}

#[test]
fn empty_config_is_rejected() {
    let err = MonitorConfig::from_json("{}").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn duplicate_subjects_are_rejected() {
    let raw = r#"{"stocks": [
        {"code": "SZ002261", "name": "A", "conditions": [{"type": "below", "value": 1}]},
        {"code": "SZ002261", "name": "B", "conditions": [{"type": "above", "value": 2}]}
    ]}"#;
    let err = MonitorConfig::from_json(raw).unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn inverted_range_is_rejected() {
    let raw = r#"{"stocks": [
        {"code": "SZ002261", "name": "A", "conditions": [{"type": "range", "min": 5, "max": 1}]}
    ]}"#;
    assert!(matches!(MonitorConfig::from_json(raw), Err(ConfigError::Invalid(_))));
}

#[test]
fn unknown_condition_type_fails_to_parse() {
    let raw = r#"{"stocks": [
        {"code": "SZ002261", "name": "A", "conditions": [{"type": "sideways", "value": 1}]}
    ]}"#;
    assert!(matches!(MonitorConfig::from_json(raw), Err(ConfigError::Parse(_))));
}

#[test]
fn missing_file_reports_path() {
    let err = MonitorConfig::load("/definitely/not/here.json").unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.json"));
}

#[test]
fn channels_require_at_least_one() {
    assert!(matches!(build_channels(&settings()), Err(ConfigError::NoChannels)));
}

#[test]
fn every_configured_channel_is_built() {
    let mut settings = settings();
    settings.telegram = Some(TelegramSettings {
        bot_token: "123:abc".to_string(),
        chat_id: "42".to_string(),
        api_url: "http://telegram.invalid".to_string(),
    });
    settings.webhook_url = Some("http://hooks.invalid/alert".to_string());
    assert!(settings.has_channels());

    let names: Vec<String> = build_channels(&settings)
        .unwrap()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(names, vec!["telegram", "webhook"]);
}
