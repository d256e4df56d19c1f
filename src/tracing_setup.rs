//! Structured logging setup, mirroring the teacher's `tracing/mod.rs`:
//! an `EnvFilter` seeded from `RUST_LOG` and a format switch driven by
//! configuration rather than always defaulting to plain text.
//!
//! `original_source/log/log.go`'s `NewLogger` builds one `zap.Logger` per
//! destination and the server keeps two of them, `accessLogger` and
//! `errorLogger`, each pointed at its own `Out` (`stdout`/`stderr`/
//! `discard`/a file path). `tracing_subscriber` has one global subscriber
//! rather than independent logger instances, so the same split is modeled
//! here as two `fmt` layers over one `Registry`, routed by event target:
//! anything logged at [`ACCESS_LOG_TARGET`] goes to `ACCESS_LOG_OUT`,
//! everything else goes to `ERROR_LOG_OUT`.

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogFormat, LoggingArgs};
use crate::error::{PlasmaError, PlasmaResult};

/// Target prefix the per-request access log entries (§4.3/§4.4) are tagged
/// with, so `init` can route them to `ACCESS_LOG_OUT` independently of
/// everything else.
pub const ACCESS_LOG_TARGET: &str = "plasma::access";

pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Call once from `main` before anything
/// else runs.
pub fn init(args: &LoggingArgs) -> PlasmaResult<()> {
    let access_writer = resolve_writer(&args.access_log_out)?;
    let general_writer = resolve_writer(&args.error_log_out)?;
    let format = args.log_format;

    let access_layer = fmt_layer(access_writer, format)
        .with_filter(filter_fn(|meta| meta.target().starts_with(ACCESS_LOG_TARGET)));
    let general_layer = fmt_layer(general_writer, format)
        .with_filter(filter_fn(|meta| !meta.target().starts_with(ACCESS_LOG_TARGET)))
        .with_filter(log_filter());

    tracing_subscriber::registry()
        .with(access_layer)
        .with(general_layer)
        .try_init()
        .map_err(|e| PlasmaError::Config(format!("installing tracing subscriber: {e}")))
}

fn fmt_layer<S>(writer: BoxMakeWriter, format: LogFormat) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_span_events(FmtSpan::CLOSE);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Plain => layer.boxed(),
    }
}

/// `stdout`/`stderr`/`discard` select the obvious destination; anything
/// else is opened (created if missing, appended to) as a log file path.
fn resolve_writer(spec: &str) -> PlasmaResult<BoxMakeWriter> {
    match spec {
        "stdout" => Ok(BoxMakeWriter::new(io::stdout)),
        "stderr" => Ok(BoxMakeWriter::new(io::stderr)),
        "discard" => Ok(BoxMakeWriter::new(io::sink)),
        path => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| PlasmaError::Config(format!("opening log destination {path}: {e}")))?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
    }
}
