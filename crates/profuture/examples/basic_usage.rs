//! Basic usage example for the profuture combinators
//!
//! Fetches a handful of simulated pages through a callback-style client,
//! first one at a time and then with a bounded number in flight.

use std::time::{Duration, Instant};

use profuture::{
    chain, promisify, task, Callback, Concurrency, ConcurrencyLimit, ExecutionError, TaskList,
    TimeoutExt, TracingReporter,
};

/// A callback-style client, the kind of API `promisify` is meant for
fn fetch_page(page: u32, callback: Callback<String, String>) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50 + u64::from(page) * 20)).await;
        if page == 0 {
            callback.reject("page numbers start at 1".to_string());
        } else {
            callback.resolve(format!("contents of page {}", page));
        }
    });
}

fn page_tasks(pages: impl IntoIterator<Item = u32>) -> TaskList<String, String> {
    pages
        .into_iter()
        .map(|page| task(move || promisify(fetch_page)(page).timeout_ms(500)))
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("=== Basic profuture usage ===\n");

    let start_time = Instant::now();
    let pages = chain(page_tasks(1..=4)).await?;
    println!("Sequential fetch took {:?}", start_time.elapsed());
    for page in &pages {
        println!("  {}", page);
    }

    let runner = Concurrency::new(ConcurrencyLimit::new(2)?)
        .with_reporter(TracingReporter::with_context("pages"));
    let start_time = Instant::now();
    let pages = runner.run(page_tasks(1..=4)).await?;
    println!("\nConcurrent fetch took {:?}", start_time.elapsed());
    for page in &pages {
        println!("  {}", page);
    }

    match chain(page_tasks([1, 0, 2])).await {
        Ok(_) => println!("\nUnexpected success"),
        Err(err) => println!("\nChain stopped early: {}", err),
    }

    let slow = async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, ExecutionError>(())
    };
    if let Err(err) = slow.timeout_ms(100).await {
        println!("Slow operation: {}", err);
    }

    println!("\n=== Example completed ===");
    Ok(())
}
