//! Structured logging setup
//!
//! Every component logs through `tracing` with structured fields
//! (`request_id`, `lookup_path`, `handler`, `duration_us`, ...). This module
//! installs the subscriber that renders them.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `ROUTEFORGE_LOG_LEVEL` | `info` | trace/debug/info/warn/error |
//! | `ROUTEFORGE_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `ROUTEFORGE_LOG_SAMPLING_MODE` | `all` | `all`, `error-only` or `sampled` |
//! | `ROUTEFORGE_LOG_SAMPLING_RATE` | `0.1` | fraction of info/debug events kept when sampled |
//! | `ROUTEFORGE_LOG_ASYNC` | `false` | write through a non-blocking appender thread |
//! | `ROUTEFORGE_LOG_TARGET_FILTER` | unset | extra comma-separated filter directives |
//! | `ROUTEFORGE_LOG_INCLUDE_LOCATION` | `false` | include file and line |
//!
//! `RUST_LOG`, when set, takes precedence over `ROUTEFORGE_LOG_LEVEL`.
//!
//! Logs go to stderr so command output on stdout stays machine readable.

use std::env;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Which events reach the formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Everything the filter lets through
    All,
    /// WARN and ERROR only
    ErrorOnly,
    /// Every WARN and ERROR, a fraction of the rest
    Sampled,
}

impl SamplingMode {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error-only" | "error_only" => SamplingMode::ErrorOnly,
            "sampled" => SamplingMode::Sampled,
            _ => SamplingMode::All,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub sampling_mode: SamplingMode,
    /// Fraction (0.0-1.0) kept in [`SamplingMode::Sampled`]
    pub sampling_rate: f64,
    pub async_logging: bool,
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            sampling_mode: SamplingMode::All,
            sampling_rate: 0.1,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read `ROUTEFORGE_LOG_*` variables, falling back to [`LogConfig::default`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            log_level: lookup("ROUTEFORGE_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("ROUTEFORGE_LOG_FORMAT")
                .map_or(defaults.format, |s| LogFormat::parse(&s)),
            sampling_mode: lookup("ROUTEFORGE_LOG_SAMPLING_MODE")
                .map_or(defaults.sampling_mode, |s| SamplingMode::parse(&s)),
            sampling_rate: lookup("ROUTEFORGE_LOG_SAMPLING_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sampling_rate),
            async_logging: lookup("ROUTEFORGE_LOG_ASYNC")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.async_logging),
            target_filter: lookup("ROUTEFORGE_LOG_TARGET_FILTER"),
            include_location: lookup("ROUTEFORGE_LOG_INCLUDE_LOCATION")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.include_location),
        }
    }

    /// Debug level, pretty output with locations.
    #[must_use]
    pub fn dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            sampling_rate: 1.0,
            include_location: true,
            ..Self::default()
        }
    }
}

/// Drops a share of INFO/DEBUG/TRACE events; WARN and ERROR always pass.
pub struct SamplingLayer {
    mode: SamplingMode,
    sampling_rate: f64,
    counter: AtomicU64,
}

impl SamplingLayer {
    #[must_use]
    pub fn new(mode: SamplingMode, sampling_rate: f64) -> Self {
        Self {
            mode,
            sampling_rate: sampling_rate.clamp(0.0, 1.0),
            counter: AtomicU64::new(0),
        }
    }

    fn should_sample(&self, metadata: &Metadata<'_>) -> bool {
        let important = *metadata.level() <= Level::WARN;
        match self.mode {
            SamplingMode::All => true,
            SamplingMode::ErrorOnly => important,
            SamplingMode::Sampled => {
                if important {
                    return true;
                }
                if self.sampling_rate <= 0.0 {
                    return false;
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let interval = (1.0 / self.sampling_rate) as u64;
                let count = self.counter.fetch_add(1, Ordering::Relaxed);
                interval > 0 && count % interval == 0
            }
        }
    }
}

impl<S> Layer<S> for SamplingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        // Spans are never sampled away; dropping them would orphan their events.
        metadata.is_span() || self.should_sample(metadata)
    }
}

/// Keeps the async writer alive. Drop it at shutdown to flush buffered lines.
#[must_use = "dropping the guard stops the async log writer"]
#[derive(Debug)]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

fn env_filter(config: &LogConfig) -> EnvFilter {
    let level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if let Some(target_filter) = &config.target_filter {
        for directive in target_filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
            }
        }
    }
    filter
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// A global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<LoggingGuard> {
    let (writer, worker) = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stderr), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(SamplingLayer::new(config.sampling_mode, config.sampling_rate))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LoggingGuard { _worker: worker })
}

/// [`init_logging_with_config`] with [`LogConfig::from_env`].
///
/// # Errors
///
/// A global subscriber is already installed.
pub fn init_logging() -> Result<LoggingGuard> {
    init_logging_with_config(&LogConfig::from_env())
}
