//! Log routing for ingestion runs.
//!
//! Every run writes a debug log named after its job (`logs/events.log`, `logs/docs.log`, ...)
//! next to a terse console stream. HTTP client internals from `reqwest` and `hyper` are kept off
//! the console and only reach the job log. `RUST_LOG` overrides both filters.
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_DIR_ENV: &str = "DOMAIN_INDEX_LOG_DIR";
const DEFAULT_LOG_DIR: &str = "logs";
const CONSOLE_DEFAULT: &str = "info";
const FILE_DEFAULT: &str = "info,domain_index=debug,reqwest=debug";
const CONSOLE_QUIET_TARGETS: [&str; 3] = ["reqwest", "hyper", "hyper_util"];

/// Install the console and job-log subscribers for `job`.
///
/// Returns the job log path, or `None` when the file could not be opened; the run then logs to
/// the console only.
pub fn init_tracing(job: &str) -> Option<PathBuf> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let console_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(EnvFilter::new(console_directives(rust_log.as_deref())));

    let dir = std::env::var(LOG_DIR_ENV).unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
    let path = job_log_path(Path::new(&dir), job);
    let opened = match open_job_log(&path) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("Job log {} unavailable: {err}", path.display());
            None
        }
    };

    let file_layer = opened.map(|file| {
        let (writer, guard) = tracing_appender::non_blocking(file);
        let _ = LOG_GUARD.set(guard);
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
            .with_filter(EnvFilter::new(file_directives(rust_log.as_deref())))
    });
    let logged_to = file_layer.as_ref().map(|_| path);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    logged_to
}

/// Path of the debug log for `job` under `dir`.
pub fn job_log_path(dir: &Path, job: &str) -> PathBuf {
    dir.join(format!("{job}.log"))
}

/// Open the job log for appending, creating its directory first.
fn open_job_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn active(rust_log: Option<&str>) -> Option<&str> {
    rust_log.filter(|value| !value.trim().is_empty())
}

/// Console filter: `RUST_LOG` (or `info`) with HTTP client targets capped at `warn`.
fn console_directives(rust_log: Option<&str>) -> String {
    let mut directives = vec![active(rust_log).unwrap_or(CONSOLE_DEFAULT).to_string()];
    directives.extend(
        CONSOLE_QUIET_TARGETS
            .iter()
            .map(|target| format!("{target}=warn")),
    );
    directives.join(",")
}

fn file_directives(rust_log: Option<&str>) -> String {
    active(rust_log).unwrap_or(FILE_DEFAULT).to_string()
}
