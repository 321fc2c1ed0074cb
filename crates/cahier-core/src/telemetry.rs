//! Centralised tracing initialisation for Cahier binaries.
//!
//! Call [`init_tracing`] once at program start to configure the global
//! subscriber. The console layer honours `RUST_LOG` and can emit JSON. An
//! optional file layer writes a daily rolling log at DEBUG. Library code
//! only emits through `tracing` macros and never installs a subscriber
//! itself.
//!
//! Subsequent calls are ignored (the global subscriber can only be set
//! once per process).

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Prefix of the rolling log files; the appender adds a `.YYYY-MM-DD` suffix.
pub const LOG_FILE_PREFIX: &str = "cahier.log";

/// Our own crates log at DEBUG to file, dependencies stay at INFO.
const FILE_FILTER: &str = "info,cahier=debug,cahier_core=debug,cahier_llm=debug";

/// Initialise the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON log lines on the console.
/// * `level`: console verbosity when `RUST_LOG` is not set.
/// * `log_dir`: also write a daily rolling log file into this directory.
///
/// Console logs go to stderr so stdout stays clean for generated documents.
/// The returned guard flushes the file writer on drop and must live as long
/// as the program does.
pub fn init_tracing(
    json: bool,
    level: Level,
    log_dir: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let console = fmt::layer().with_writer(std::io::stderr);
    let console: Box<dyn Layer<Registry> + Send + Sync> = if json {
        console.json().boxed()
    } else {
        console.boxed()
    };

    let mut layers = vec![console.with_filter(console_filter).boxed()];
    let mut guard = None;
    if let Some(dir) = log_dir {
        let (file, file_guard) = file_layer::<Registry>(dir)?;
        layers.push(file.boxed());
        guard = Some(file_guard);
    }

    tracing_subscriber::registry().with(layers).try_init().ok();

    Ok(guard)
}

/// Non-blocking writer over a daily rolling file in `dir`.
pub fn file_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir).with_context(|| format!("create log directory {:?}", dir))?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

/// Plain-text DEBUG layer writing to the rolling file in `dir`.
pub fn file_layer<S>(dir: &Path) -> Result<(impl Layer<S> + Send + Sync, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let (writer, guard) = file_writer(dir)?;
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(EnvFilter::new(FILE_FILTER));
    Ok((layer, guard))
}
