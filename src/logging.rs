//! Tracing subscriber setup.
//!
//! Filter comes from `SITECRAFT_LOG` (standard `EnvFilter` syntax). Human
//! readable output goes to stderr; `json` switches stderr to JSON lines.
//! When the state dir has a `logs/` directory, a daily rolling JSON file is
//! written there as well.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

pub const LOG_ENV: &str = "SITECRAFT_LOG";
pub const LOG_FILE_PREFIX: &str = "sitecraft.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    pub json: bool,
    pub verbose: bool,
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// life of the process. Calling this twice is harmless.
pub fn init(options: LogOptions, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);
    layers.push(if options.json {
        stderr.json().boxed()
    } else {
        stderr.boxed()
    });

    let mut guard = None;
    if let Some(dir) = log_dir.filter(|d| d.is_dir()) {
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
        let (writer, worker) = tracing_appender::non_blocking(appender);
        layers.push(fmt::layer().json().with_writer(writer).boxed());
        guard = Some(worker);
    }

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(options.verbose)));

    if tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .is_err()
    {
        return None;
    }
    guard
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "sitecraft=debug,info" } else { "info" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_crate_level() {
        assert_eq!(default_directive(false), "info");
        assert!(default_directive(true).contains("sitecraft=debug"));
    }

    #[test]
    fn second_init_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let _first = init(LogOptions::default(), Some(dir.path()));
        assert!(init(LogOptions::default(), Some(dir.path())).is_none());
    }
}
