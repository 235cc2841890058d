//! Logging setup driven by `configs/logging.yaml`.
//!
//! [`Logging::load`] builds a `tracing` dispatch from the YAML file, or from a
//! single console handler at `app.log_level` when the file is missing. The
//! result is an explicit context: run code under it with [`Logging::scoped`]
//! or make it the process default once with [`Logging::install`].
//!
//! ```yaml
//! level: info
//! format: compact        # compact | pretty | json
//! targets:
//!   lancedb: warn
//! console:
//!   enabled: true
//!   ansi: true
//! file:
//!   directory: logs
//!   prefix: agentic-rag.log
//!   rotation: daily      # daily | hourly | never
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{Error, Result};
use crate::settings::Settings;

pub const LOGGING_FILE: &str = "configs/logging.yaml";
/// Target used for messages emitted by the initializer itself.
pub const LOG_TARGET: &str = "agentic_rag";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub ansi: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self { Self { enabled: true, ansi: true } }
}

/// Rolling file handler. Always written as JSON without ANSI colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub directory: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub rotation: Rotation,
}

fn default_file_prefix() -> String { "agentic-rag.log".to_string() }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    /// Per-target levels, e.g. `lancedb: warn`.
    pub targets: BTreeMap<String, String>,
    pub console: ConsoleConfig,
    pub file: Option<FileConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: LogFormat::default(),
            targets: BTreeMap::new(),
            console: ConsoleConfig::default(),
            file: None,
        }
    }
}

impl LogConfig {
    /// Single console handler at `level`.
    pub fn fallback(level: &str) -> Self { Self { level: level.to_string(), ..Self::default() } }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&text).map_err(|source| Error::LoggingConfig { path: path.to_path_buf(), source })
    }

    /// Filter from `level` and `targets`; `RUST_LOG` directives are appended
    /// and so win on conflicts.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        let mut directives = vec![parse_level(&self.level)?.to_string()];
        for (target, level) in &self.targets {
            directives.push(format!("{target}={}", parse_level(level)?));
        }
        if let Ok(extra) = std::env::var(EnvFilter::DEFAULT_ENV) {
            if !extra.trim().is_empty() {
                directives.push(extra);
            }
        }
        EnvFilter::try_new(directives.join(",")).map_err(|e| Error::InvalidLevel(e.to_string()))
    }
}

/// Map a level name to an `EnvFilter` directive. Accepts the usual Python
/// names too (`WARNING`, `CRITICAL`, `NOTSET`).
pub fn parse_level(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "critical" | "fatal" | "error" => Ok("error"),
        "warning" | "warn" => Ok("warn"),
        "info" => Ok("info"),
        "debug" => Ok("debug"),
        "trace" | "notset" => Ok("trace"),
        "off" => Ok("off"),
        _ => Err(Error::InvalidLevel(level.to_string())),
    }
}

/// Where the active logging configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    File(PathBuf),
    /// Built from a [`LogConfig`] value.
    Inline,
    Fallback { missing: PathBuf },
}

type Base = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync>;

/// A built, not necessarily installed, logging configuration.
pub struct Logging {
    dispatch: Dispatch,
    source: LogSource,
    guard: Option<WorkerGuard>,
}

/// Keeps file writers flushing for as long as it lives.
pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
}

impl Logging {
    /// Load `path` (default [`LOGGING_FILE`] under the settings root) and
    /// log to stderr.
    pub fn load(path: Option<&Path>, settings: &Settings) -> Result<Self> {
        Self::load_with_writer(path, settings, std::io::stderr)
    }

    /// Like [`Logging::load`] with a custom console writer.
    pub fn load_with_writer<W>(path: Option<&Path>, settings: &Settings, writer: W) -> Result<Self>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let path = path.map_or_else(|| settings.root.join(LOGGING_FILE), Path::to_path_buf);
        if !path.exists() {
            let fallback = LogConfig::fallback(&settings.app.log_level);
            let logging = Self::build(&fallback, writer, LogSource::Fallback { missing: path.clone() })?;
            logging.scoped(|| {
                tracing::warn!(
                    target: LOG_TARGET,
                    "Logging config not found at {}. Falling back to a console handler.",
                    path.display()
                );
            });
            return Ok(logging);
        }
        let config = LogConfig::from_yaml_file(&path)?;
        Self::build(&config, writer, LogSource::File(path))
    }

    pub fn from_config<W>(config: &LogConfig, writer: W) -> Result<Self>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        Self::build(config, writer, LogSource::Inline)
    }

    fn build<W>(config: &LogConfig, writer: W, source: LogSource) -> Result<Self>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let filter = config.env_filter()?;
        let mut layers: Vec<BoxedLayer> = Vec::new();
        if config.console.enabled {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(config.console.ansi)
                .with_target(true);
            layers.push(match config.format {
                LogFormat::Compact => layer.compact().boxed(),
                LogFormat::Pretty => layer.pretty().boxed(),
                LogFormat::Json => layer.json().boxed(),
            });
        }
        let mut guard = None;
        if let Some(file) = &config.file {
            std::fs::create_dir_all(&file.directory)?;
            let appender = match file.rotation {
                Rotation::Daily => tracing_appender::rolling::daily(&file.directory, &file.prefix),
                Rotation::Hourly => tracing_appender::rolling::hourly(&file.directory, &file.prefix),
                Rotation::Never => tracing_appender::rolling::never(&file.directory, &file.prefix),
            };
            let (non_blocking, worker) = tracing_appender::non_blocking(appender);
            layers.push(tracing_subscriber::fmt::layer().json().with_writer(non_blocking).with_ansi(false).boxed());
            guard = Some(worker);
        }
        let subscriber = tracing_subscriber::registry().with(filter).with(layers);
        Ok(Self { dispatch: Dispatch::new(subscriber), source, guard })
    }

    pub fn source(&self) -> &LogSource { &self.source }

    pub fn is_fallback(&self) -> bool { matches!(self.source, LogSource::Fallback { .. }) }

    pub fn dispatch(&self) -> &Dispatch { &self.dispatch }

    /// Run `f` with this configuration as the thread's default subscriber.
    pub fn scoped<T>(&self, f: impl FnOnce() -> T) -> T { tracing::dispatcher::with_default(&self.dispatch, f) }

    /// Make this the global default. Fails if any global subscriber is
    /// already set.
    pub fn install(self) -> Result<LoggingGuard> {
        tracing::dispatcher::set_global_default(self.dispatch).map_err(|_| Error::LoggingInstalled)?;
        Ok(LoggingGuard { _guard: self.guard })
    }
}
