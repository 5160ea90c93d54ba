mod common;

use common::{ScriptedTransport, TestError};
use ogtag_rs::{BreakerBuilder, BreakerError, CircuitBreaker, MemoryStore, Resolver, State};
use proptest::prelude::*;
use std::collections::VecDeque;
use std::time::Duration;

fn frozen_breaker() -> CircuitBreaker {
    // no timer fires while a case runs
    BreakerBuilder::new()
        .reset_interval(Duration::ZERO)
        .open_timeout(Duration::from_secs(3600))
        .build("https://prop.example")
}

proptest! {
    #[test]
    fn breaker_matches_ratio_model(outcomes in prop::collection::vec(any::<bool>(), 0..64)) {
        let breaker = frozen_breaker();
        let (mut requests, mut failures, mut tripped) = (0u32, 0u32, false);

        for ok in outcomes {
            let result = breaker.call(|| {
                if ok { Ok(()) } else { Err(TestError::new("down")) }
            });

            if tripped {
                prop_assert!(matches!(result, Err(BreakerError::Open)));
                continue;
            }

            requests += 1;
            if !ok {
                failures += 1;
                tripped = requests >= 5 && f64::from(failures) / f64::from(requests) >= 0.6;
            }
            prop_assert_eq!(result.is_ok(), ok);

            let counts = breaker.counts();
            if !tripped {
                prop_assert_eq!(counts.requests, requests);
                prop_assert_eq!(counts.total_failures, failures);
            }
            prop_assert!(counts.total_failures + counts.total_successes <= counts.requests);
        }

        let expected = if tripped { State::Open } else { State::Closed };
        prop_assert_eq!(breaker.state(), expected);
    }

    #[test]
    fn registry_behaves_like_lru(
        capacity in 1usize..6,
        picks in prop::collection::vec(0usize..10, 1..80),
    ) {
        let registry = BreakerBuilder::new().registry(capacity);
        let mut model: VecDeque<String> = VecDeque::new();

        for pick in picks {
            let origin = format!("https://host-{}.example", pick);
            registry.get_or_create(&origin);

            model.retain(|o| o != &origin);
            model.push_front(origin);
            model.truncate(capacity);

            prop_assert!(registry.len() <= capacity);
            prop_assert_eq!(registry.origins(), Vec::from(model.clone()));
        }
    }

    #[test]
    fn resolve_fetches_once_per_target(paths in prop::collection::vec("[a-z]{1,6}", 1..12)) {
        let transport = ScriptedTransport::serving(common::OG_PAGE);
        let resolver = Resolver::builder(transport.clone(), MemoryStore::new()).build();

        let mut distinct = paths.clone();
        distinct.sort();
        distinct.dedup();

        tokio_test::block_on(async {
            for path in paths.iter().chain(paths.iter()) {
                let target = format!("https://prop.example/{}", path);
                let result = resolver.resolve(&target).await.unwrap();
                assert_eq!(result.target, target);
                assert_eq!(result.items.len(), 2);
            }
        });

        prop_assert_eq!(transport.calls(), distinct.len());
    }
}
