// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    env,
    io::IsTerminal,
    sync::{
        Mutex, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
};

use bon::Builder;
use serde::{Deserialize, Deserializer, Serialize, de};
use smart_default::SmartDefault;
use snafu::ResultExt;
use tracing::Subscriber;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter, fmt::MakeWriter, layer::SubscriberExt,
    registry::LookupSpan,
};

use crate::error::{
    CreateAppenderSnafu, InitLogTracerSnafu, ParseLevelSnafu, Result, SetGlobalDefaultSnafu,
};

/// Deserializes a string value, using `Default::default()` if the string is
/// empty.
///
/// Lets configuration files and environment variables leave a field blank to
/// mean "use the default".
pub fn empty_string_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        Ok(T::default())
    } else {
        T::deserialize(de::value::StrDeserializer::new(&s)).map_err(|e: de::value::Error| {
            de::Error::custom(format!("invalid value, expect empty string, err: {e}"))
        })
    }
}

/// Fallback filter when neither [`LoggingOptions::level`] nor `RUST_LOG` is
/// set.
const DEFAULT_LOG_TARGETS: &str = "info";

/// Configuration options for the logging system.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, SmartDefault, Builder)]
#[serde(default)]
pub struct LoggingOptions {
    /// Directory for hourly rotated log files. Empty disables file logging.
    #[default = ""]
    #[builder(default)]
    pub dir: String,

    /// Filter string such as `"info"` or `"info,spoolmq_server=debug"`.
    ///
    /// Falls back to `RUST_LOG`, then to `info`.
    pub level: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_default")]
    #[builder(default)]
    pub log_format: LogFormat,

    /// Rotated files kept per log kind. 720 hourly files is 30 days.
    #[default = 720]
    #[builder(default = 720)]
    pub max_log_files: usize,

    /// Whether to also write to stdout when file logging is enabled.
    #[default = true]
    #[builder(default = true)]
    pub append_stdout: bool,
}

/// Available log output formats.
#[derive(
    Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize, Default, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per event, with the current span and span list.
    Json,

    /// Human-readable text.
    #[default]
    Text,
}

/// Stdout-only text logging with default options.
///
/// Returns the writer guards, which must stay alive for as long as logging is
/// needed.
pub fn init_tracing_subscriber(app_name: &str) -> Result<Vec<WorkerGuard>> {
    init_global_logging(app_name, &LoggingOptions::default())
}

/// Logging for unit and integration tests.
///
/// Writes to `UNITTEST_LOG_DIR` (default `/tmp/__unittest_logs`) at
/// `UNITTEST_LOG_LEVEL` (default `debug` with noisy dependencies turned
/// down). Safe to call from every test; only the first call does anything.
pub fn init_default_ut_logging() {
    static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

    GUARDS.get_or_init(|| {
        let dir =
            env::var("UNITTEST_LOG_DIR").unwrap_or_else(|_| "/tmp/__unittest_logs".to_string());
        let level = env::var("UNITTEST_LOG_LEVEL")
            .unwrap_or_else(|_| "debug,hyper=warn,tower=warn,reqwest=warn,h2=info".to_string());
        let opts = LoggingOptions {
            dir: dir.clone(),
            level: Some(level),
            ..Default::default()
        };

        let guards = init_global_logging("unittest", &opts).unwrap_or_else(|e| {
            eprintln!("unit test logging disabled: {e}");
            Vec::new()
        });
        tracing::info!(dir, "Unit test logging initialized");
        Mutex::new(guards)
    });
}

/// Installs the global subscriber.
///
/// Layers, depending on `opts`:
/// - stdout, when `append_stdout` is set or no `dir` is configured
/// - `{dir}/{app_name}.*`, every event, rotated hourly
/// - `{dir}/{app_name}-err.*`, errors only, rotated hourly
///
/// `log` crate records are forwarded into tracing. Only the first call in a
/// process installs anything; later calls return no guards. The returned
/// guards flush the non-blocking writers when dropped.
pub fn init_global_logging(app_name: &str, opts: &LoggingOptions) -> Result<Vec<WorkerGuard>> {
    static INITIALIZED: AtomicBool = AtomicBool::new(false);
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(Vec::new());
    }

    let level = opts
        .level
        .clone()
        .or_else(|| env::var(EnvFilter::DEFAULT_ENV).ok())
        .unwrap_or_else(|| DEFAULT_LOG_TARGETS.to_string());
    let targets = level
        .parse::<filter::Targets>()
        .context(ParseLevelSnafu { level: &level })?;

    let mut guards = Vec::new();

    let stdout_layer = if opts.append_stdout || opts.dir.is_empty() {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        guards.push(guard);
        Some(format_layer(
            opts.log_format,
            writer,
            std::io::stdout().is_terminal(),
        ))
    } else {
        None
    };

    let file_layer = if opts.dir.is_empty() {
        None
    } else {
        let (writer, guard) = tracing_appender::non_blocking(rolling_appender(
            &opts.dir,
            app_name,
            opts.max_log_files,
        )?);
        guards.push(guard);
        Some(format_layer(opts.log_format, writer, false))
    };

    let err_file_layer = if opts.dir.is_empty() {
        None
    } else {
        let (writer, guard) = tracing_appender::non_blocking(rolling_appender(
            &opts.dir,
            &format!("{app_name}-err"),
            opts.max_log_files,
        )?);
        guards.push(guard);
        Some(
            format_layer(opts.log_format, writer, false)
                .with_filter(filter::LevelFilter::ERROR)
                .boxed(),
        )
    };

    let subscriber = Registry::default()
        .with(targets)
        .with(stdout_layer)
        .with(file_layer)
        .with(err_file_layer);

    LogTracer::init().context(InitLogTracerSnafu)?;
    tracing::subscriber::set_global_default(subscriber).context(SetGlobalDefaultSnafu)?;

    Ok(guards)
}

fn rolling_appender(dir: &str, prefix: &str, max_log_files: usize) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::HOURLY)
        .filename_prefix(prefix)
        .max_log_files(max_log_files)
        .build(dir)
        .context(CreateAppenderSnafu { dir })
}

fn format_layer<S, W>(format: LogFormat, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => tracing_subscriber::fmt::Layer::new()
            .json()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::Layer::new()
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_default_options() {
        let opts = LoggingOptions::default();
        assert_eq!(opts.dir, "");
        assert_eq!(opts.level, None);
        assert_eq!(opts.log_format, LogFormat::Text);
        assert_eq!(opts.max_log_files, 720);
        assert!(opts.append_stdout);
        assert_eq!(LoggingOptions::builder().build(), opts);
    }

    #[test_case(r#"{"log_format": ""}"#, LogFormat::Text ; "empty string")]
    #[test_case(r#"{"log_format": "json"}"#, LogFormat::Json ; "json")]
    #[test_case(r#"{}"#, LogFormat::Text ; "missing")]
    fn test_log_format_deserialization(input: &str, expected: LogFormat) {
        let opts: LoggingOptions = serde_json::from_str(input).unwrap();
        assert_eq!(opts.log_format, expected);
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let result = serde_json::from_str::<LoggingOptions>(r#"{"log_format": "xml"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_rolling_appender_creates_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested");
        rolling_appender(dir.to_str().unwrap(), "spoolmq", 4).unwrap();
        assert!(dir.is_dir());
    }
}
