//! Resolves the Open Graph tags of every URL given on the command line.
//!
//! ```text
//! REDIS_ADDR=127.0.0.1:6379 cargo run --example resolve -- https://example.com/
//! ```
//!
//! Set `RUST_LOG=ogtag_rs=debug` to watch cache hits and breaker transitions.

use ogtag_rs::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ogtag_rs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let targets: Vec<String> = std::env::args().skip(1).collect();
    if targets.is_empty() {
        eprintln!("usage: resolve <url>...");
        return Ok(());
    }

    let store = RedisStore::connect(&RedisConfig::from_env()?).await?;
    let transport = ReqwestTransport::new(TransportConfig::default())?;
    let resolver = Resolver::builder(transport, store).build();

    for (target, result) in targets.iter().zip(resolver.resolve_all(&targets).await) {
        match result {
            Ok(result) => {
                println!("{}", target);
                for item in &result.items {
                    println!("  {}", item);
                }
            }
            Err(err) if err.kind() == ErrorKind::BreakerOpen => {
                println!("{}: skipped, host is failing ({})", target, err);
            }
            Err(err) => println!("{}: {}", target, err),
        }
    }

    Ok(())
}
