use rask_telemetry_client::app::{ClientConfig, ConfigError, LogLevel};
use rask_telemetry_client::codec::Encoding;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const TELEMETRY_VARS: [&str; 10] = [
    "TELEMETRY_NAME",
    "TELEMETRY_COLLECTOR_ADDRESS",
    "TELEMETRY_CREDENTIAL",
    "TELEMETRY_RECONNECT",
    "TELEMETRY_RECONNECT_INTERVAL_MS",
    "TELEMETRY_REJECT_UNAUTHORIZED",
    "TELEMETRY_PER_MESSAGE_DEFLATE",
    "TELEMETRY_ENCODING",
    "TELEMETRY_METRICS_INTERVAL_MS",
    "LOG_LEVEL",
];

fn clear_env() {
    unsafe {
        for name in TELEMETRY_VARS {
            env::remove_var(name);
        }
    }
}

#[test]
fn test_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
name = "checkout"
collector_address = "wss://collector.internal:9600"
credential = "abc123"
reconnect = false
reconnect_interval = 2500
reject_unauthorized = true
encoding = "binary"
metrics_interval = 60000
log_level = "debug"
"#
    )
    .unwrap();

    let config = ClientConfig::from_file(file.path()).unwrap();
    assert_eq!(config.name, "checkout");
    assert_eq!(config.collector_address, "wss://collector.internal:9600");
    assert_eq!(config.credential, "abc123");
    assert!(!config.reconnect);
    assert_eq!(config.reconnect_interval, Duration::from_millis(2500));
    assert!(config.reject_unauthorized);
    assert_eq!(config.per_message_deflate, None);
    assert_eq!(config.encoding, Encoding::Binary);
    assert_eq!(config.metrics_interval, Duration::from_secs(60));
    assert_eq!(config.log_level, LogLevel::Debug);
}

#[test]
fn test_from_file_rejects_invalid_address() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"collector_address = "not a url""#).unwrap();

    assert!(matches!(
        ClientConfig::from_file(file.path()),
        Err(ConfigError::InvalidUrl(_))
    ));
}

#[test]
fn test_from_file_missing_and_malformed() {
    assert!(matches!(
        ClientConfig::from_file("/nonexistent/telemetry.toml"),
        Err(ConfigError::FileError(_))
    ));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "reconnect_interval = \"soon\"").unwrap();
    assert!(matches!(
        ClientConfig::from_file(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_toml_round_trip_keeps_millisecond_durations() {
    let mut config = ClientConfig::new("api-1", "ws://collector:9600", "secret");
    config.reconnect_interval = Duration::from_millis(750);
    config.per_message_deflate = Some(true);

    let text = toml::to_string(&config).unwrap();
    assert!(text.contains("reconnect_interval = 750"));

    let parsed = ClientConfig::from_toml_str(&text).unwrap();
    assert_eq!(parsed.reconnect_interval, Duration::from_millis(750));
    assert_eq!(parsed.per_message_deflate, Some(true));
    assert_eq!(parsed.credential, "secret");
}

#[test]
#[serial]
fn test_from_env_overrides_defaults() {
    clear_env();
    unsafe {
        env::set_var("TELEMETRY_NAME", "worker-7");
        env::set_var("TELEMETRY_COLLECTOR_ADDRESS", "ws://10.0.0.5:9600");
        env::set_var("TELEMETRY_CREDENTIAL", "token");
        env::set_var("TELEMETRY_RECONNECT_INTERVAL_MS", "1000");
        env::set_var("TELEMETRY_PER_MESSAGE_DEFLATE", "false");
        env::set_var("TELEMETRY_ENCODING", "compact");
        env::set_var("LOG_LEVEL", "warn");
    }

    let config = ClientConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.name, "worker-7");
    assert_eq!(config.collector_address, "ws://10.0.0.5:9600");
    assert_eq!(config.credential, "token");
    assert!(config.reconnect);
    assert_eq!(config.reconnect_interval, Duration::from_millis(1000));
    assert_eq!(config.per_message_deflate, Some(false));
    assert_eq!(config.encoding, Encoding::Compact);
    assert_eq!(config.log_level, LogLevel::Warn);
}

#[test]
#[serial]
fn test_from_env_defaults_name_to_host() {
    clear_env();
    let config = ClientConfig::from_env().unwrap();
    assert!(!config.name.is_empty());
    assert_eq!(config.collector_address, "ws://rask-log-aggregator:9600");
}

#[test]
#[serial]
fn test_from_env_rejects_bad_values() {
    clear_env();
    unsafe {
        env::set_var("TELEMETRY_RECONNECT", "sometimes");
    }
    assert!(matches!(
        ClientConfig::from_env(),
        Err(ConfigError::EnvError(_))
    ));

    clear_env();
    unsafe {
        env::set_var("TELEMETRY_METRICS_INTERVAL_MS", "0");
    }
    assert!(matches!(
        ClientConfig::from_env(),
        Err(ConfigError::InvalidConfig(_))
    ));
    clear_env();
}
