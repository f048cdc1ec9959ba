//! Sink implementations and the sink capability trait

pub mod console;
pub mod file;
pub mod memory;

pub use console::ConsoleSink;
pub use file::{FileSink, FileSinkOptions};
pub use memory::MemorySink;

use crate::core::{LogEvent, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Output destination for log events
///
/// Every method takes `&self`: a sink is shared by the logger and all
/// in-flight dispatch tasks, and serializes its own writes internally. A write
/// or flush whose `cancel` token is already cancelled must do nothing.
///
/// # Example
///
/// ```no_run
/// use rust_logger_pipeline::core::{LogEvent, Result};
/// use rust_logger_pipeline::sinks::Sink;
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
///
/// struct StdoutSink;
///
/// #[async_trait]
/// impl Sink for StdoutSink {
///     async fn write(&self, event: &LogEvent, cancel: &CancellationToken) -> Result<()> {
///         if !cancel.is_cancelled() {
///             println!("{}", event.message());
///         }
///         Ok(())
///     }
///
///     async fn flush(&self, _cancel: &CancellationToken) -> Result<()> {
///         Ok(())
///     }
///
///     async fn close(&self) -> Result<()> {
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "stdout"
///     }
/// }
/// ```
#[async_trait]
pub trait Sink: Send + Sync {
    /// Persist one event
    async fn write(&self, event: &LogEvent, cancel: &CancellationToken) -> Result<()>;

    /// Push buffered output to its destination
    async fn flush(&self, cancel: &CancellationToken) -> Result<()>;

    /// Release resources; later writes fail with [`LoggerError::SinkClosed`]
    ///
    /// [`LoggerError::SinkClosed`]: crate::core::LoggerError::SinkClosed
    async fn close(&self) -> Result<()>;

    /// Get the sink name
    fn name(&self) -> &str;
}
