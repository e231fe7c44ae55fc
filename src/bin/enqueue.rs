//! Manual producer
//!
//! Publishes sample credit/debit events to the PostgreSQL queue.
//!
//! Run with: cargo run --bin enqueue -- --account <uuid> --amount 100.00 --kind credit --count 10

use std::str::FromStr;
use std::time::Instant;

use banking_event_receiver::queue::PgQueueGateway;
use banking_event_receiver::{EventRecord, InstructionKind};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

fn arg<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let count: u64 = arg(&args, "--count")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    let account_id = Uuid::parse_str(
        arg(&args, "--account").ok_or_else(|| anyhow::anyhow!("--account <uuid> is required"))?,
    )?;
    let amount = Decimal::from_str(arg(&args, "--amount").unwrap_or("100.00"))?;
    let kind: InstructionKind = arg(&args, "--kind")
        .unwrap_or("credit")
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Enqueue - publishing {} {} event(s) of {}", count, kind, amount);
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;
    let queue = PgQueueGateway::new(pool);

    let start = Instant::now();
    let mut published = 0u64;

    for _ in 0..count {
        let payload = EventRecord::new(account_id, amount, kind).to_payload()?;
        match queue.enqueue(&payload).await {
            Ok(id) => {
                published += 1;
                println!("Published message {}", id);
            }
            Err(e) => eprintln!("Failed to publish: {}", e),
        }
    }

    println!("\n=== Enqueue Results ===");
    println!("Requested: {}", count);
    println!("Published: {}", published);
    println!("Time: {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
