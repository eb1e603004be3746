//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{
    init_logging, redact_if_sensitive, redact_login, LogFormat, LoggingConfig,
};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

// The global subscriber can only be installed once per process, so the whole
// lifecycle is exercised in a single test.
#[test]
fn test_init_logging_once_and_forward_to_sink() {
    let sink = Arc::new(CollectingSink::default());

    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Info)
        .with_logger_sink(sink.clone());
    init_logging(config).unwrap();

    tracing::info!(target: "core_auth", login = %redact_login("jane@example.com"), "Logging in");
    tracing::debug!(target: "core_auth", "filtered out by level");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Logging in");
        assert_eq!(
            entries[0].fields.get("login").map(String::as_str),
            Some("j***@[REDACTED]")
        );
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_secrets_never_pass_through() {
    for field in ["token", "master_token", "password", "client_secret", "Authorization"] {
        assert_eq!(redact_if_sensitive(field, "value"), "[REDACTED]", "field {}", field);
    }
    assert_eq!(redact_if_sensitive("device_id", "3f2a"), "3f2a");
}
