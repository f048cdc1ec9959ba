//! Console sink implementation

use super::Sink;
use crate::core::{LogEvent, LogLevel, LoggerError, OutputFormat, Result};
use async_trait::async_trait;
#[cfg(feature = "console")]
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

type ConsoleWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Writes one line per event to the process console
///
/// Error and Fatal events go to stderr, everything else to stdout. Output
/// goes through tokio's stdio handles, so a stalled terminal or pipe parks
/// the dispatch task instead of a runtime worker.
pub struct ConsoleSink {
    use_colors: bool,
    output_format: OutputFormat,
    stdout: Mutex<ConsoleWriter>,
    stderr: Mutex<ConsoleWriter>,
    closed: AtomicBool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            use_colors: cfg!(feature = "console"),
            output_format: OutputFormat::default(),
            stdout: Mutex::new(Box::new(tokio::io::stdout())),
            stderr: Mutex::new(Box::new(tokio::io::stderr())),
            closed: AtomicBool::new(false),
        }
    }

    /// Redirect the two console streams, e.g. to capture output
    #[must_use]
    pub fn with_writers<O, E>(mut self, stdout: O, stderr: E) -> Self
    where
        O: AsyncWrite + Send + Unpin + 'static,
        E: AsyncWrite + Send + Unpin + 'static,
    {
        self.stdout = Mutex::new(Box::new(stdout));
        self.stderr = Mutex::new(Box::new(stderr));
        self
    }

    fn stream_for(&self, level: LogLevel) -> &Mutex<ConsoleWriter> {
        match level {
            LogLevel::Error | LogLevel::Fatal => &self.stderr,
            _ => &self.stdout,
        }
    }

    async fn flush_streams(&self) -> Result<()> {
        self.stdout.lock().await.flush().await?;
        self.stderr.lock().await.flush().await?;
        Ok(())
    }

    /// Enable or disable level colors (text format only)
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors && cfg!(feature = "console");
        self
    }

    /// Set the output format for this sink
    ///
    /// # Example
    ///
    /// ```
    /// use rust_logger_pipeline::sinks::ConsoleSink;
    /// use rust_logger_pipeline::OutputFormat;
    ///
    /// let sink = ConsoleSink::new().with_output_format(OutputFormat::Json);
    /// ```
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    fn render(&self, event: &LogEvent) -> String {
        let line = self.output_format.format(event);
        if self.use_colors && self.output_format == OutputFormat::Text {
            colorize_level(line, event.level())
        } else {
            line
        }
    }
}

#[cfg(feature = "console")]
fn colorize_level(line: String, level: LogLevel) -> String {
    let tag = format!("[{}]", level.short_str());
    let colored = format!("[{}]", level.short_str().color(level.color_code()));
    line.replacen(&tag, &colored, 1)
}

#[cfg(not(feature = "console"))]
fn colorize_level(line: String, _level: LogLevel) -> String {
    line
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn write(&self, event: &LogEvent, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Ok(());
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(LoggerError::sink_closed(self.name()));
        }

        let mut line = self.render(event);
        line.push('\n');

        // One lock per line keeps concurrent lines whole
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            stream = self.stream_for(event.level()).lock() => stream,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(()),
            written = async {
                stream.write_all(line.as_bytes()).await?;
                stream.flush().await
            } => written.map_err(LoggerError::from),
        }
    }

    async fn flush(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(()),
            flushed = self.flush_streams() => flushed,
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.flush_streams().await
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, DuplexStream};

    #[test]
    fn test_plain_render_matches_text_format() {
        let sink = ConsoleSink::new().with_colors(false);
        let event = LogEvent::new(LogLevel::Warn, "disk almost full").with_correlation_id("abcd1234");
        assert_eq!(sink.render(&event), OutputFormat::Text.format(&event));
    }

    #[cfg(feature = "console")]
    #[test]
    fn test_colored_render_keeps_content() {
        colored::control::set_override(true);
        let sink = ConsoleSink::new().with_colors(true);
        let event = LogEvent::new(LogLevel::Error, "boom").with_correlation_id("abcd1234");
        let line = sink.render(&event);
        assert!(line.contains("ERR"));
        assert!(line.contains("boom"));
        assert!(line.contains('\u{1b}'));
        colored::control::unset_override();
    }

    fn captured() -> (ConsoleSink, DuplexStream, DuplexStream) {
        let (out_writer, out_reader) = tokio::io::duplex(64 * 1024);
        let (err_writer, err_reader) = tokio::io::duplex(64 * 1024);
        let sink = ConsoleSink::new()
            .with_colors(false)
            .with_writers(out_writer, err_writer);
        (sink, out_reader, err_reader)
    }

    async fn read_text(reader: &mut DuplexStream, len: usize) -> String {
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_levels_are_routed_to_streams() {
        let (sink, mut out, mut err) = captured();
        let cancel = CancellationToken::new();
        let info = LogEvent::new(LogLevel::Info, "ready").with_correlation_id("abcd1234");
        let fatal = LogEvent::new(LogLevel::Fatal, "down").with_correlation_id("abcd1234");

        sink.write(&info, &cancel).await.unwrap();
        sink.write(&fatal, &cancel).await.unwrap();

        let info_line = format!("{}\n", OutputFormat::Text.format(&info));
        let fatal_line = format!("{}\n", OutputFormat::Text.format(&fatal));
        assert_eq!(read_text(&mut out, info_line.len()).await, info_line);
        assert_eq!(read_text(&mut err, fatal_line.len()).await, fatal_line);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lines_stay_whole() {
        let (sink, mut out, _err) = captured();
        let sink = Arc::new(sink);

        let events: Vec<LogEvent> = (0..64)
            .map(|i| {
                LogEvent::new(LogLevel::Info, format!("line {} {}", i, "x".repeat(i)))
                    .with_correlation_id("abcd1234")
            })
            .collect();
        let total: usize = events
            .iter()
            .map(|e| OutputFormat::Text.format(e).len() + 1)
            .sum();

        let handles: Vec<_> = events
            .into_iter()
            .map(|event| {
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    sink.write(&event, &CancellationToken::new()).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let text = read_text(&mut out, total).await;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 64);
        for line in lines {
            assert!(line.starts_with('['), "torn line: {}", line);
            assert!(line.contains("] line "), "torn line: {}", line);
        }
    }

    #[tokio::test]
    async fn test_stalled_stream_does_not_block_runtime() {
        // Nobody reads, so the second line cannot fit
        let (writer, _reader) = tokio::io::duplex(16);
        let sink = ConsoleSink::new()
            .with_colors(false)
            .with_writers(writer, tokio::io::sink());
        let cancel = CancellationToken::new();
        let event = LogEvent::new(LogLevel::Info, "a line longer than sixteen bytes");

        let stalled = tokio::time::timeout(Duration::from_millis(50), sink.write(&event, &cancel)).await;
        assert!(stalled.is_err());

        // Cancellation releases a write parked on the stalled stream
        let cancel_later = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        };
        let (written, ()) = tokio::join!(sink.write(&event, &cancel), cancel_later);
        assert!(written.is_ok());
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let sink = ConsoleSink::new();
        let cancel = CancellationToken::new();
        sink.close().await.unwrap();

        let event = LogEvent::new(LogLevel::Info, "late");
        let err = sink.write(&event, &cancel).await.unwrap_err();
        assert!(matches!(err, LoggerError::SinkClosed(_)));
    }

    #[tokio::test]
    async fn test_cancelled_write_is_noop() {
        let sink = ConsoleSink::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        sink.close().await.unwrap();

        // Cancellation wins over the closed check
        let event = LogEvent::new(LogLevel::Info, "ignored");
        assert!(sink.write(&event, &cancel).await.is_ok());
    }
}
