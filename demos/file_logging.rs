//! File logging example
//!
//! Demonstrates logging to the console and a rotating JSON file simultaneously.
//!
//! Run with: cargo run --example file_logging

use rust_logger_pipeline::prelude::*;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Logger Pipeline - File Logging Example ===\n");

    let file = FileSink::with_options(
        FileSinkOptions::new("logs/application.log")
            .with_output_format(OutputFormat::Json)
            .with_max_file_size(64 * 1024),
    )?;

    let logger = Logger::builder()
        .min_level(LogLevel::Debug)
        .slow_threshold(Duration::from_millis(50))
        .console()
        .sink(file)
        .build()?;

    println!("1. Logging to both console and file:");
    logger.info("Application started", &[]);
    logger.debug("Loading configuration from {Path}", &["/etc/app.toml".into()]);
    logger.warn("Using default settings for {Count} options", &[3.into()]);

    println!("\n2. Timing operations:");
    for i in 1..=5 {
        let _scope = logger.begin_scope(format!("item-{}", i));
        std::thread::sleep(Duration::from_millis(i * 15));
        logger.info("Processed item {Index}/{Total}", &[i.into(), 5.into()]);
    }

    logger.log_elapsed(
        LogLevel::Info,
        Duration::from_millis(120),
        "Batch committed with {Rows} rows",
        &[500.into()],
    );

    logger.flush_blocking()?;
    logger.shutdown_blocking();

    println!("\n=== Example completed successfully! ===");
    println!("Check 'logs/application-YYYYMMDD.log' for the JSON output");

    Ok(())
}
