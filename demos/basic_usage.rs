//! Basic logger usage example
//!
//! Demonstrates message templates, redaction and level filtering on the console.
//!
//! Run with: cargo run --example basic_usage

use rust_logger_pipeline::prelude::*;
use rust_logger_pipeline::{error, info, trace, warn};

fn main() -> Result<()> {
    println!("=== Rust Logger Pipeline - Basic Usage Example ===\n");

    let logger = Logger::builder()
        .min_level(LogLevel::Trace)
        .redact("password")
        .redact(r"^api[_-]?key$")
        .console()
        .build()?;

    println!("1. Logging at different levels:");
    trace!(logger, "This is a trace message");
    logger.debug("This is a debug message", &[]);
    info!(logger, "User {Username} logged in from {IpAddress}", "john.doe", "192.168.1.1");
    warn!(logger, "Disk usage at {Percent}%", 91.5);
    logger.fatal("This is a fatal message", &[]);

    println!("\n2. Sensitive values are redacted:");
    info!(logger, "Login attempt: {Username} with {Password}", "john.doe", "secret123");
    info!(logger, "Calling billing with {ApiKey}", "sk_live_abc");

    println!("\n3. Errors attach an exception payload:");
    let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml missing");
    error!(logger, err = &err, "Startup failed in {Stage}", "config");

    logger.shutdown_blocking();
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
