//! Heartbeat Sample Application Entry Point
//!
//! Runs one periodic worker that emits a heartbeat for a configurable time,
//! resolving its target endpoint lazily on the first beat.
//!
//! Configuration is read from the JSON file named by `HEARTBEAT_CONFIG`, if
//! set:
//!
//! ```json
//! {
//!   "run_for_secs": 5,
//!   "worker": {
//!     "name": "heartbeat",
//!     "period": { "secs": 1, "nanos": 0 },
//!     "delay": "pooled_timer"
//!   }
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cadence::cancel::CancelSignal;
use cadence::lazy::LazyAsyncValue;
use cadence::worker::{PeriodicWorker, StopAfterConsecutive, WorkerConfig};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_ENV: &str = "HEARTBEAT_CONFIG";

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("failed to read {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Worker(#[from] cadence::Error),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SampleConfig {
    run_for_secs: u64,
    worker: WorkerConfig,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            run_for_secs: 3,
            worker: WorkerConfig::new("heartbeat", Duration::from_millis(500)),
        }
    }
}

impl SampleConfig {
    fn load() -> Result<Self, AppError> {
        let Some(path) = std::env::var_os(CONFIG_ENV).map(PathBuf::from) else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(&path).map_err(|source| AppError::ReadConfig {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AppError::ParseConfig { path, source })
    }
}

fn main() -> Result<(), AppError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cadence=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SampleConfig::load()?;
    tracing::info!(
        worker = %config.worker.name,
        period = ?config.worker.period,
        delay = %config.worker.delay,
        run_for_secs = config.run_for_secs,
        "configuration loaded"
    );

    let endpoint = LazyAsyncValue::new(|| async {
        tracing::info!("resolving heartbeat endpoint");
        tokio::time::sleep(Duration::from_millis(100)).await;
        Arc::<str>::from("heartbeat://localhost")
    });

    let shutdown = CancelSignal::new();
    let worker = PeriodicWorker::new(config.worker, move |context| {
        let target = endpoint.get_value_blocking()?;
        tracing::info!(beat = context.cycle(), %target, "heartbeat");
        Ok(())
    })?
    .with_cancel_source(&shutdown)
    .with_failure_hook(StopAfterConsecutive::new(3));

    let observer = worker.observer();
    worker.start()?;

    if observer.wait_stopped(Duration::from_secs(config.run_for_secs)) {
        tracing::warn!("worker stopped on its own");
    } else {
        shutdown.trigger();
        observer.wait_stopped(worker.config().stop_timeout);
    }

    tracing::info!(
        beats = observer.cycles(),
        failures = observer.failures(),
        state = %observer.state(),
        "heartbeat finished"
    );
    Ok(())
}
