//! Command-line/environment configuration, `clap::Parser` derive style.
//!
//! Every field spells out its own `env = "PLASMA_..."` attribute explicitly —
//! clap has no automatic prefixing, so the prefix has to be repeated per field,
//! matching the config table this mirrors.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(name = "plasma", about = "Push-notification fan-out gateway")]
pub struct CliArgs {
    #[clap(flatten)]
    pub http: HttpArgs,

    #[clap(flatten)]
    pub sse: SseArgs,

    #[clap(flatten)]
    pub subscriber: SubscriberArgs,

    #[clap(flatten)]
    pub tls: TlsArgs,

    #[clap(flatten)]
    pub logging: LoggingArgs,

    /// Enables the /debug test-only publish endpoint.
    #[clap(long, env = "PLASMA_DEBUG", default_value_t = false)]
    pub debug: bool,

    /// Dump the generated CLI reference as markdown and exit.
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

#[derive(Args, Debug, Clone)]
pub struct HttpArgs {
    /// TCP listen port, shared by SSE and the native streaming RPC.
    #[clap(long, env = "PLASMA_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Value echoed back as Access-Control-Allow-Origin on SSE responses.
    #[clap(long, env = "PLASMA_ORIGIN", default_value = "")]
    pub origin: String,
}

#[derive(Args, Debug, Clone)]
pub struct SseArgs {
    /// Milliseconds sent in the SSE `retry:` field.
    #[clap(long, env = "PLASMA_SSE_RETRY", default_value_t = 2000)]
    pub sse_retry: u64,

    /// Query parameter name carrying the comma-separated subscription list.
    #[clap(long, env = "PLASMA_SSE_EVENT_QUERY", default_value = "eventType")]
    pub sse_event_query: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberType {
    Mock,
    Redis,
    Api,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverMaxRetryBehavior {
    Alive,
    Die,
}

#[derive(Args, Debug, Clone)]
pub struct SubscriberArgs {
    #[clap(long, env = "PLASMA_SUBSCRIBER_TYPE", value_enum, default_value_t = SubscriberType::Mock)]
    pub subscriber_type: SubscriberType,

    /// Tick interval for the mock driver.
    #[clap(long, env = "PLASMA_SUBSCRIBER_MOCK_INTERVAL", value_parser = parse_duration, default_value = "1s")]
    pub subscriber_mock_interval: Duration,

    #[clap(long, env = "PLASMA_SUBSCRIBER_REDIS_ADDR", default_value = "localhost:6379")]
    pub subscriber_redis_addr: String,

    #[clap(long, env = "PLASMA_SUBSCRIBER_REDIS_PASSWORD", default_value = "")]
    pub subscriber_redis_password: String,

    #[clap(long, env = "PLASMA_SUBSCRIBER_REDIS_DB", default_value_t = 0)]
    pub subscriber_redis_db: i64,

    #[clap(long, env = "PLASMA_SUBSCRIBER_REDIS_CHANNELS", value_delimiter = ',')]
    pub subscriber_redis_channels: Vec<String>,

    #[clap(long, env = "PLASMA_SUBSCRIBER_REDIS_MAX_RETRY", default_value_t = 5)]
    pub subscriber_redis_max_retry: u32,

    #[clap(long, env = "PLASMA_SUBSCRIBER_REDIS_TIMEOUT", value_parser = parse_duration, default_value = "1s")]
    pub subscriber_redis_timeout: Duration,

    #[clap(long, env = "PLASMA_SUBSCRIBER_REDIS_RETRY_INTERVAL", value_parser = parse_duration, default_value = "5s")]
    pub subscriber_redis_retry_interval: Duration,

    #[clap(long, env = "PLASMA_SUBSCRIBER_REDIS_OVER_MAX_RETRY_BEHAVIOR", value_enum)]
    pub subscriber_redis_over_max_retry_behavior: Option<OverMaxRetryBehavior>,
}

#[derive(Args, Debug, Clone)]
pub struct TlsArgs {
    #[clap(long, env = "PLASMA_TLS_CERT_FILE")]
    pub tls_cert_file: Option<PathBuf>,

    #[clap(long, env = "PLASMA_TLS_KEY_FILE")]
    pub tls_key_file: Option<PathBuf>,
}

impl TlsArgs {
    pub fn enabled(&self) -> bool {
        self.tls_cert_file.is_some() && self.tls_key_file.is_some()
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Plain,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[clap(long, env = "PLASMA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// stdout|stderr|discard, or a filepath.
    #[clap(long, env = "PLASMA_ACCESS_LOG_OUT", default_value = "stdout")]
    pub access_log_out: String,

    /// stdout|stderr|discard, or a filepath.
    #[clap(long, env = "PLASMA_ERROR_LOG_OUT", default_value = "stderr")]
    pub error_log_out: String,
}

/// Parses durations of the form `10s`, `500ms`, `2m` — the shapes the config
/// table uses throughout. Bare integers are accepted as seconds.
fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    if let Some(ms) = raw.strip_suffix("ms") {
        return ms
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| e.to_string());
    }
    if let Some(s) = raw.strip_suffix('s') {
        return s
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| e.to_string());
    }
    if let Some(m) = raw.strip_suffix('m') {
        return m
            .parse::<u64>()
            .map(|m| Duration::from_secs(m * 60))
            .map_err(|e| e.to_string());
    }
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| format!("unparseable duration: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_suffixes() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
        assert!(parse_duration("garbage").is_err());
    }

    #[test]
    fn parses_minimal_args() {
        let args = CliArgs::parse_from(["plasma"]);
        assert_eq!(args.http.port, 8080);
        assert_eq!(args.sse.sse_event_query, "eventType");
        assert!(!args.tls.enabled());
    }
}
