//! Tracing setup for the qrstudio binary
//!
//! Events go to stderr so stdout can carry data URIs and JSON reports. An
//! optional file sink mirrors them without ANSI colors. The level comes from
//! [`LoggingOptions::level`], which already reflects config file,
//! `QRSTUDIO_LOG_LEVEL` and the `--log-level` flag in that order.

use crate::config::{LogRotation, LoggingOptions};
use crate::error::{Error, Result};
use crate::session::RequestId;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use tracing::Span;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber.
///
/// Returns the file writer's guard, which must be held until exit so buffered
/// lines are flushed. Returns `Ok(None)` when there is no file sink or a
/// subscriber is already installed.
pub fn init(options: &LoggingOptions) -> Result<Option<WorkerGuard>> {
    if tracing::dispatcher::has_been_set() {
        return Ok(None);
    }

    let filter = level_filter(&options.level)?;
    let (file_writer, guard) = file_writer(options)?.unzip();

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_timer(UtcTime::rfc_3339())
            .with_ansi(false)
            .with_writer(writer)
    });
    let terminal_layer = fmt::layer()
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(options.color)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(terminal_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))?;

    Ok(guard)
}

/// Span wrapping one generation cycle; events inside carry its request id.
pub fn generation_span(id: RequestId, template_id: &str) -> Span {
    tracing::info_span!("generation", request = %id, template = %template_id)
}

fn level_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| Error::Config(format!("Invalid log level '{level}': {e}")))
}

fn file_writer(options: &LoggingOptions) -> Result<Option<(NonBlocking, WorkerGuard)>> {
    let Some(path) = options.file.as_deref() else {
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| {
        Error::Config(format!(
            "Failed to create log directory {}: {e}",
            dir.display()
        ))
    })?;

    let builder = NonBlockingBuilder::default().lossy(false);
    let pair = match options.rotation {
        Some(rotation) => {
            let file_name = path.file_name().ok_or_else(|| {
                Error::Config(format!(
                    "Rotated log path '{}' has no file name",
                    path.display()
                ))
            })?;
            let appender = match rotation {
                LogRotation::Hourly => rolling::hourly(dir, file_name),
                LogRotation::Daily => rolling::daily(dir, file_name),
            };
            builder.finish(appender)
        }
        None => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::Config(format!("Failed to open log file {}: {e}", path.display()))
                })?;
            builder.finish(file)
        }
    };

    Ok(Some(pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("qrstudio-logging-{name}-{}", std::process::id()))
    }

    #[test]
    fn init_can_be_called_twice() {
        let options = LoggingOptions {
            color: false,
            ..LoggingOptions::default()
        };
        assert!(init(&options).is_ok());
        assert!(matches!(init(&options), Ok(None)));
    }

    #[test]
    fn generation_span_tags_events() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = fmt::Subscriber::builder()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let _entered = generation_span(RequestId(7), "ocean").entered();
            tracing::info!("inside");
        });

        let out = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("generation{request=#7 template=ocean}"), "{out}");
        assert!(out.contains("inside"));
    }

    #[test]
    fn level_accepts_directives() {
        assert!(level_filter("debug").is_ok());
        assert!(level_filter("qrstudio=trace,warn").is_ok());
        assert!(matches!(level_filter("qrstudio=loud"), Err(Error::Config(_))));
    }

    #[test]
    fn no_file_means_no_writer() {
        assert!(file_writer(&LoggingOptions::default()).unwrap().is_none());
    }

    #[test]
    fn file_sink_creates_missing_directory() {
        let dir = scratch("plain");
        let _ = fs::remove_dir_all(&dir);
        let options = LoggingOptions {
            file: Some(dir.join("nested").join("qrstudio.log")),
            ..LoggingOptions::default()
        };

        let writer = file_writer(&options).unwrap();
        assert!(writer.is_some());
        assert!(dir.join("nested").join("qrstudio.log").exists());
    }

    #[test]
    fn rotation_needs_a_file_name() {
        let options = LoggingOptions {
            file: Some(std::path::PathBuf::from("/")),
            rotation: Some(LogRotation::Daily),
            ..LoggingOptions::default()
        };
        assert!(matches!(file_writer(&options), Err(Error::Config(_))));
    }
}
