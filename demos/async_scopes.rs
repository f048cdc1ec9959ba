//! Async logging example
//!
//! Demonstrates scopes and correlation ids across concurrent tokio tasks.
//!
//! Run with: cargo run --example async_scopes

use rust_logger_pipeline::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Rust Logger Pipeline - Async Scopes Example ===\n");

    let logger = Arc::new(
        Logger::builder()
            .min_level(LogLevel::Debug)
            .slow_threshold(Duration::from_millis(40))
            .console()
            .build()?,
    );

    println!("1. Each request runs in its own trace and scope chain:");
    let mut handles = Vec::new();
    for request in 0..3u64 {
        let logger = Arc::clone(&logger);
        let trace_id = format!("4bf92f3577b34da6a3ce929d0e0e47{:02}", request);

        handles.push(ScopeContext::spawn(TraceContext::scope(trace_id, async move {
            logger
                .scoped("handle-request", async {
                    logger.info("Handling request {Request}", &[request.into()]);
                    tokio::time::sleep(Duration::from_millis(25 * request)).await;

                    logger
                        .scoped("query-db", async {
                            logger.debug("Querying {Table}", &["orders".into()]);
                        })
                        .await;
                })
                .await;
        })));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            eprintln!("request task failed: {}", e);
        }
    }

    println!("\n2. Pipeline metrics:");
    logger.flush().await?;
    let metrics = logger.metrics();
    println!(
        "   emitted={} dispatched={} dropped={} sink_failures={}",
        metrics.emitted_count(),
        metrics.dispatched_count(),
        metrics.dropped_count(),
        metrics.sink_failures()
    );

    logger.shutdown().await;
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
