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

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;
use kube::Client;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::registry::ClientRegistry;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClusterHealth {
    Reachable { version: String },
    Degraded { reason: String },
}

impl ClusterHealth {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ClusterHealth::Reachable { .. })
    }
}

/// Last known reachability of every remote cluster, keyed by API URL.
#[derive(Default)]
pub struct FleetHealth {
    clusters: RwLock<BTreeMap<String, ClusterHealth>>,
}

impl FleetHealth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `api_url` as reachable, returning whether it was degraded before.
    pub async fn mark_reachable(&self, api_url: &str, version: impl Into<String>) -> bool {
        let health = ClusterHealth::Reachable { version: version.into() };
        let previous = self.clusters.write().await.insert(api_url.to_string(), health);
        matches!(previous, Some(ClusterHealth::Degraded { .. }))
    }

    /// Record `api_url` as degraded, returning whether it was reachable before.
    pub async fn mark_degraded(&self, api_url: &str, reason: impl Into<String>) -> bool {
        let health = ClusterHealth::Degraded { reason: reason.into() };
        let previous = self.clusters.write().await.insert(api_url.to_string(), health);
        matches!(previous, Some(ClusterHealth::Reachable { .. }))
    }

    pub async fn degraded(&self) -> Vec<String> {
        self.clusters
            .read()
            .await
            .iter()
            .filter(|(_, health)| !health.is_reachable())
            .map(|(url, _)| url.clone())
            .collect()
    }
}

/// Ask the API server of one cluster for its version, bounded by `timeout`.
pub async fn probe(api_url: &str, client: &Client, timeout: Duration) -> Result<String> {
    match tokio::time::timeout(timeout, client.apiserver_version()).await {
        Ok(Ok(info)) => Ok(info.git_version),
        Ok(Err(source)) => Err(Error::Connection {
            url: api_url.to_string(),
            source,
        }),
        Err(_) => Err(Error::Timeout {
            url: api_url.to_string(),
            after: timeout,
        }),
    }
}

/// Probe every remote cluster concurrently and record the outcome in `health`.
pub async fn probe_all(registry: &ClientRegistry, health: &FleetHealth, timeout: Duration) {
    let probes = registry.list_all().iter().map(|(url, client)| async move {
        let outcome = probe(url, client, timeout).await;
        (url, outcome)
    });

    for (url, outcome) in join_all(probes).await {
        match outcome {
            Ok(version) => {
                if health.mark_reachable(url, version).await {
                    info!("Cluster {} is reachable again", url);
                }
            }
            Err(err) => {
                if health.mark_degraded(url, err.to_string()).await {
                    warn!("Cluster {} became unreachable: {}", url, err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions_are_reported() {
        let health = FleetHealth::new();

        assert!(!health.mark_reachable("https://c1", "v1.28.3").await);
        assert!(!health.mark_reachable("https://c1", "v1.28.3").await);
        assert!(health.mark_degraded("https://c1", "connection refused").await);
        assert!(!health.mark_degraded("https://c1", "connection refused").await);
        assert!(health.mark_reachable("https://c1", "v1.28.3").await);
    }

    #[tokio::test]
    async fn test_degraded_lists_only_unreachable_clusters() {
        let health = FleetHealth::new();
        health.mark_reachable("https://c1", "v1.28.3").await;
        health.mark_degraded("https://c2", "timeout").await;
        health.mark_reachable("https://c3", "v1.27.1").await;

        assert_eq!(health.degraded().await, vec!["https://c2".to_string()]);

        health.mark_reachable("https://c2", "v1.28.3").await;
        assert!(health.degraded().await.is_empty());
    }
}
