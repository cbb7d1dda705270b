use error_relay::{ErrorRelay, ErrorRelayOptions, PageContext, RecordKind, Reporter};

/// Basic capture-and-delivery walkthrough against a local collector.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let endpoint =
        std::env::var("COLLECTOR_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    println!("Connecting to collector at {}\n", endpoint);

    let relay = ErrorRelay::new(&endpoint, ErrorRelayOptions::default())?;
    relay.connect().await?;

    let reporter = Reporter::new(
        relay.clone(),
        PageContext::from_url("http://127.0.0.1:3000/play?gameId=snake&roomId=r42&userId=u7"),
    );

    // Each capture site has its own constructor.
    reporter.console_error("texture atlas missing");
    reporter.global_error("undefined is not a function", "game.js", 42, 7);
    reporter.unhandled_rejection("room join timed out");
    reporter.resource_error("http://127.0.0.1:3000/assets/board.png");
    reporter.json_parse_error(
        "expected value at line 1 column 1",
        r#"<!doctype html><html>this was not json at all"#,
    );
    reporter.fetch_error("/api/state", "503 Service Unavailable");

    // Explicitly registered host functions are observed, not swallowed.
    let result = reporter.watch("update_board", || Err::<(), _>("board out of sync".to_string()));
    println!("update_board returned: {:?}", result);

    let _: Result<(), String> = reporter.watch_as(RecordKind::TimeoutError, "spawn_wave", || {
        Err("wave spawn failed".to_string())
    });

    // Give the pipeline a moment to flush, then show what is left.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    println!(
        "connected={} pending={}",
        relay.is_connected().await,
        relay.pending()
    );

    relay.disconnect().await?;
    Ok(())
}
