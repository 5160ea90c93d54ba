#![cfg(feature = "prometheus")]

mod common;

use common::ScriptedTransport;
use ogtag_rs::{BreakerBuilder, MemoryStore, PrometheusSink, Resolver};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;

#[tokio::test(start_paused = true)]
async fn test_sink_exports_breaker_and_cache_metrics() {
    let mut registry = Registry::default();
    let sink = PrometheusSink::new(&mut registry);

    let resolver = Resolver::builder(ScriptedTransport::failing_for("host-a"), MemoryStore::new())
        .breaker(BreakerBuilder::new().metric_sink(sink))
        .build();

    for _ in 0..6 {
        let _ = resolver.resolve("https://host-a/").await;
    }
    resolver.resolve("https://host-c/").await.unwrap();
    resolver.resolve("https://host-c/").await.unwrap();

    let mut text = String::new();
    encode(&mut text, &registry).unwrap();

    assert!(text.contains(r#"circuit_breaker_state{origin="https://host-a"} 1"#), "{}", text);
    assert!(text.contains("breaker_rejections_total 1"), "{}", text);
    assert!(text.contains(r#"breaker_calls_total{outcome="failure"} 5"#), "{}", text);
    assert!(text.contains("cache_hits_total 1"), "{}", text);
    assert!(text.contains("cache_misses_total 7"), "{}", text);
}
