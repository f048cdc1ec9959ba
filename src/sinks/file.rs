//! Dated, size-rotating file sink
//!
//! The sink writes to `<stem>-<YYYYMMDD>.<ext>` derived from a path template
//! and the event's UTC date. A file is rolled (closed) as soon as its size
//! reaches the configured threshold and whenever an event arrives for a
//! different date. When the dated file for a new open already holds at least
//! the threshold, sequenced siblings `<stem>-<YYYYMMDD>.001.<ext>`,
//! `.002`, ... are probed and the first one with room is used.
//!
//! A single async mutex serializes every write, roll, flush and close, so a
//! write is fully appended and flushed before the next one starts.

use super::Sink;
use crate::core::{LogEvent, LoggerError, OutputFormat, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Default size threshold (10 MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of `.NNN` siblings probed before giving up
pub const DEFAULT_MAX_SEQUENCE_ATTEMPTS: u32 = 999;

/// Configuration for [`FileSink`]
///
/// # Examples
///
/// ```
/// use rust_logger_pipeline::sinks::FileSinkOptions;
/// use rust_logger_pipeline::OutputFormat;
///
/// let options = FileSinkOptions::new("logs/app.log")
///     .with_max_file_size(50 * 1024 * 1024)
///     .with_output_format(OutputFormat::Json);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FileSinkOptions {
    /// Path whose stem receives the `-YYYYMMDD` suffix
    pub path_template: PathBuf,
    /// Size at or above which the current file is rolled
    pub max_file_size: u64,
    pub output_format: OutputFormat,
    pub max_sequence_attempts: u32,
}

impl FileSinkOptions {
    #[must_use]
    pub fn new(path_template: impl Into<PathBuf>) -> Self {
        Self {
            path_template: path_template.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            output_format: OutputFormat::Text,
            max_sequence_attempts: DEFAULT_MAX_SEQUENCE_ATTEMPTS,
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_sequence_attempts(mut self, attempts: u32) -> Self {
        self.max_sequence_attempts = attempts;
        self
    }

    fn validate(&self) -> Result<()> {
        let template = self.path_template.display().to_string();
        if self.path_template.as_os_str().is_empty() {
            return Err(LoggerError::config("file sink", "path template must not be empty"));
        }
        if self.path_template.file_name().is_none() {
            return Err(LoggerError::file_sink(
                template,
                "path template must name a file",
            ));
        }
        if self.max_file_size == 0 {
            return Err(LoggerError::file_sink(
                template,
                "max file size must be greater than zero",
            ));
        }
        if self.max_sequence_attempts == 0 {
            return Err(LoggerError::file_sink(
                template,
                "max sequence attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

struct OpenFile {
    file: File,
    date: NaiveDate,
    path: PathBuf,
    size: u64,
}

#[derive(Default)]
struct FileState {
    current: Option<OpenFile>,
    closed: bool,
}

/// Rotating file sink
///
/// # Examples
///
/// ```no_run
/// use rust_logger_pipeline::sinks::{FileSink, FileSinkOptions};
///
/// // Text lines, default 10 MB threshold
/// let sink = FileSink::new("/var/log/app.log").unwrap();
///
/// // JSON lines
/// let sink = FileSink::json("/var/log/app.json").unwrap();
///
/// // Custom threshold
/// let sink = FileSink::with_options(
///     FileSinkOptions::new("/var/log/app.log").with_max_file_size(1024 * 1024),
/// )
/// .unwrap();
/// ```
pub struct FileSink {
    name: String,
    options: FileSinkOptions,
    state: Mutex<FileState>,
}

impl FileSink {
    /// Create a text-format sink with default rotation settings
    ///
    /// # Errors
    ///
    /// Returns error if the template is invalid or its directory cannot be created
    pub fn new(path_template: impl Into<PathBuf>) -> Result<Self> {
        Self::with_options(FileSinkOptions::new(path_template))
    }

    /// Create a JSON-lines sink with default rotation settings
    pub fn json(path_template: impl Into<PathBuf>) -> Result<Self> {
        Self::with_options(
            FileSinkOptions::new(path_template).with_output_format(OutputFormat::Json),
        )
    }

    /// Create a sink from explicit options
    ///
    /// # Errors
    ///
    /// Returns error if the options are invalid or the log directory cannot
    /// be created
    pub fn with_options(options: FileSinkOptions) -> Result<Self> {
        options.validate()?;

        if let Some(parent) = options.path_template.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "create log directory",
                        format!("Failed to create directory '{}'", parent.display()),
                        e,
                    )
                })?;
            }
        }

        Ok(Self {
            name: format!("file:{}", options.path_template.display()),
            options,
            state: Mutex::new(FileState::default()),
        })
    }

    pub fn options(&self) -> &FileSinkOptions {
        &self.options
    }

    /// Path of the file currently open, if any
    pub async fn current_path(&self) -> Option<PathBuf> {
        self.state
            .lock()
            .await
            .current
            .as_ref()
            .map(|open| open.path.clone())
    }

    /// Bytes in the file currently open, if any
    pub async fn current_size(&self) -> Option<u64> {
        self.state.lock().await.current.as_ref().map(|open| open.size)
    }

    /// Path for `date` with no sequence suffix
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use rust_logger_pipeline::sinks::FileSink;
    ///
    /// let dir = std::env::temp_dir();
    /// let sink = FileSink::new(dir.join("app.log")).unwrap();
    /// let date = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
    /// assert_eq!(sink.dated_path(date), dir.join("app-20250108.log"));
    /// ```
    pub fn dated_path(&self, date: NaiveDate) -> PathBuf {
        insert_before_extension(
            &self.options.path_template,
            &format!("-{}", date.format("%Y%m%d")),
        )
    }

    /// Sequenced sibling of a dated path, e.g. `app-20250108.001.log`
    pub fn sequence_path(dated: &Path, sequence: u32) -> PathBuf {
        insert_before_extension(dated, &format!(".{:03}", sequence))
    }

    /// First path for `date` whose file is absent or below the threshold
    async fn resolve_path(&self, date: NaiveDate) -> Result<PathBuf> {
        let dated = self.dated_path(date);
        if self.has_room(&dated).await? {
            return Ok(dated);
        }

        for sequence in 1..=self.options.max_sequence_attempts {
            let candidate = Self::sequence_path(&dated, sequence);
            if self.has_room(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(LoggerError::file_rotation(
            dated.display().to_string(),
            format!(
                "all {} sequenced siblings are at or above {} bytes",
                self.options.max_sequence_attempts, self.options.max_file_size
            ),
        ))
    }

    async fn has_room(&self, path: &Path) -> Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.len() < self.options.max_file_size),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(LoggerError::io_operation(
                "inspect log file",
                format!("Cannot access metadata of '{}'", path.display()),
                e,
            )),
        }
    }

    async fn open_for(&self, date: NaiveDate) -> Result<OpenFile> {
        let path = self.resolve_path(date).await?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                LoggerError::file_sink(
                    path.display().to_string(),
                    format!("Failed to open: {}", e),
                )
            })?;

        let size = file
            .metadata()
            .await
            .map_err(|e| {
                LoggerError::file_sink(
                    path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();

        tracing::debug!(path = %path.display(), size, "opened log file");
        Ok(OpenFile {
            file,
            date,
            path,
            size,
        })
    }

    /// Close the current file, if any
    async fn roll(slot: &mut Option<OpenFile>, reason: &'static str) {
        if let Some(mut open) = slot.take() {
            if let Err(e) = open.file.flush().await {
                tracing::warn!(path = %open.path.display(), error = %e, "flush before roll failed");
            }
            tracing::debug!(path = %open.path.display(), size = open.size, reason, "rolled log file");
        }
    }

    async fn write_locked(&self, state: &mut FileState, event: &LogEvent) -> Result<()> {
        if state.closed {
            return Err(LoggerError::sink_closed(&self.name));
        }

        let date = event.timestamp().date_naive();
        if state.current.as_ref().is_some_and(|open| open.date != date) {
            Self::roll(&mut state.current, "date changed").await;
        }

        let open = match state.current.take() {
            Some(open) => open,
            None => self.open_for(date).await?,
        };
        let open = state.current.insert(open);

        let mut line = self.options.output_format.format(event);
        line.push('\n');

        open.file.write_all(line.as_bytes()).await.map_err(|e| {
            LoggerError::io_operation(
                "write log line",
                format!("Failed to append to '{}'", open.path.display()),
                e,
            )
        })?;
        open.file.flush().await.map_err(|e| {
            LoggerError::io_operation(
                "flush log file",
                format!("Failed to flush '{}'", open.path.display()),
                e,
            )
        })?;
        open.size += line.len() as u64;

        if open.size >= self.options.max_file_size {
            Self::roll(&mut state.current, "size threshold reached").await;
        }
        Ok(())
    }
}

/// Insert `suffix` between the file stem and its extension (or append it)
fn insert_before_extension(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();

    let mut file_name = OsString::with_capacity(stem.len() + suffix.len() + 8);
    file_name.push(&stem);
    file_name.push(suffix);
    if let Some(ext) = path.extension() {
        file_name.push(".");
        file_name.push(ext);
    }
    path.with_file_name(file_name)
}

#[async_trait]
impl Sink for FileSink {
    async fn write(&self, event: &LogEvent, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let mut state = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            state = self.state.lock() => state,
        };

        // Cancelled while waiting for the gate
        if cancel.is_cancelled() {
            return Ok(());
        }

        self.write_locked(&mut state, event).await
    }

    async fn flush(&self, cancel: &CancellationToken) -> Result<()> {
        let mut state = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            state = self.state.lock() => state,
        };

        if let Some(open) = state.current.as_mut() {
            open.file.flush().await.map_err(|e| {
                LoggerError::io_operation(
                    "flush log file",
                    format!("Failed to flush '{}'", open.path.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.closed = true;

        let Some(mut open) = state.current.take() else {
            return Ok(());
        };
        let result = open.file.flush().await;
        drop(open);

        result.map_err(|e| {
            LoggerError::io_operation("close log file", "Failed to flush on close", e)
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
