// Copyright 2024 The Envconfig Operator Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;

use futures::future::join_all;

use crate::error::{Error, Result};
use crate::registry::ClientRegistry;

/// Run `op` once per target cluster, concurrently, each call bounded by `timeout`.
///
/// Targets are API URLs (empty for the local cluster) and are deduplicated. A
/// target without a registered client, a failing call or a stalled call only
/// affects its own entry in the returned map; every other target still runs.
pub async fn fan_out<C, T, F, Fut>(
    registry: &ClientRegistry<C>,
    targets: impl IntoIterator<Item = String>,
    timeout: Duration,
    op: F,
) -> BTreeMap<String, Result<T>>
where
    C: Clone,
    F: Fn(String, C) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let op = &op;
    let targets: BTreeSet<String> = targets.into_iter().collect();

    let calls = targets.into_iter().map(move |url| {
        let client = registry.lookup(&url).cloned();
        async move {
            let outcome = match client {
                Ok(client) => match tokio::time::timeout(timeout, op(url.clone(), client)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(Error::Timeout {
                        url: url.clone(),
                        after: timeout,
                    }),
                },
                Err(err) => Err(err),
            };
            (url, outcome)
        }
    });

    join_all(calls).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ClientRegistry<&'static str> {
        let mut registry = ClientRegistry::new("local", "uncached");
        registry.register("https://c1", "c1");
        registry.register("https://c2", "c2");
        registry.register("https://c3", "c3");
        registry
    }

    fn targets(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|url| url.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failure_in_one_cluster_does_not_stop_the_others() {
        let registry = registry();
        let outcomes = fan_out(
            &registry,
            targets(&["https://c1", "https://c2", "https://c3"]),
            Duration::from_secs(5),
            |url, client| async move {
                if client == "c2" {
                    return Err(Error::remote(url, "forbidden"));
                }
                Ok(format!("namespaces of {}", client))
            },
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes["https://c1"].as_ref().unwrap(), "namespaces of c1");
        assert!(matches!(outcomes["https://c2"], Err(Error::Remote { .. })));
        assert_eq!(outcomes["https://c3"].as_ref().unwrap(), "namespaces of c3");
    }

    #[tokio::test]
    async fn test_unknown_target_is_a_lookup_error() {
        let registry = registry();
        let outcomes = fan_out(
            &registry,
            targets(&["https://c1", "https://c9", ""]),
            Duration::from_secs(5),
            |_, client| async move { Ok(client) },
        )
        .await;

        assert_eq!(outcomes[""].as_ref().unwrap(), &"local");
        assert_eq!(outcomes["https://c1"].as_ref().unwrap(), &"c1");
        assert!(matches!(outcomes["https://c9"], Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stalled_cluster_times_out() {
        let registry = registry();
        let outcomes = fan_out(
            &registry,
            targets(&["https://c1", "https://c2"]),
            Duration::from_millis(50),
            |_, client| async move {
                if client == "c1" {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                Ok(())
            },
        )
        .await;

        assert!(matches!(outcomes["https://c1"], Err(Error::Timeout { .. })));
        assert!(outcomes["https://c2"].is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_targets_run_once() {
        let registry = registry();
        let counter = std::sync::atomic::AtomicUsize::new(0);
        let calls = &counter;
        let outcomes = fan_out(
            &registry,
            targets(&["https://c1", "https://c1"]),
            Duration::from_secs(5),
            move |_, _| async move {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
