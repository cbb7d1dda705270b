use error_relay::{ErrorRelay, ErrorRelayOptions, PageContext, Reporter};
use std::time::Duration;

/// Exercises the reconnection machinery against a collector you can kill and
/// restart by hand: watch records queue up while offline and drain on
/// reconnect, with the HTTP fallback carrying best-effort duplicates.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let endpoint =
        std::env::var("COLLECTOR_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    // Short heartbeat so exhaustion recovery is visible within the demo.
    let relay = ErrorRelay::new(
        &endpoint,
        ErrorRelayOptions {
            heartbeat_interval: Some(15_000),
            ..Default::default()
        },
    )?;
    let reporter = Reporter::new(
        relay.clone(),
        PageContext::from_url("http://127.0.0.1:3000/play?gameId=snake&roomId=r42"),
    );

    if let Err(e) = relay.connect().await {
        println!("Initial connect failed ({}), pipeline will keep retrying", e);
    }

    println!("Reporting one record per second for 60 seconds.");
    println!("Kill and restart the collector while this runs:");
    println!("  - offline: records queue (bounded) and go out via HTTP fallback");
    println!("  - after 5 failed reconnects: automatic retries stop");
    println!("  - next heartbeat: retries re-armed\n");

    for i in 1..=60 {
        reporter.console_error(format!("simulated error #{}", i));
        tokio::time::sleep(Duration::from_secs(1)).await;
        println!(
            "t={:>2}s connected={:<5} pending={}",
            i,
            relay.is_connected().await,
            relay.pending()
        );
    }

    relay.disconnect().await?;
    println!("\nDone.");
    Ok(())
}
