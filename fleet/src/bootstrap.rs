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

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use futures::future::join_all;
use kube::{Client, Config};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::credentials::{ConnectionDescriptor, TrustMode};
use crate::error::{Error, Result};
use crate::health::{probe, FleetHealth};
use crate::registry::ClientRegistry;

/// What to do when a remote cluster cannot be reached while bootstrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort startup.
    FailFast,
    /// Keep the cluster registered, mark it degraded and carry on.
    #[default]
    Tolerate,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail-fast" => Ok(FailurePolicy::FailFast),
            "tolerate" => Ok(FailurePolicy::Tolerate),
            _ => Err(format!("unknown failure policy {:?}, expected fail-fast or tolerate", s)),
        }
    }
}

impl Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::FailFast => f.write_str("fail-fast"),
            FailurePolicy::Tolerate => f.write_str("tolerate"),
        }
    }
}

/// Build the client configuration for one remote cluster.
pub fn connection_config(descriptor: &ConnectionDescriptor) -> Result<Config> {
    let cluster_url = descriptor
        .api_url
        .parse()
        .map_err(|_| Error::UnsupportedApiUrl(descriptor.api_url.clone()))?;

    let mut config = Config::new(cluster_url);
    let token = descriptor.token.expose_secret();
    if !token.is_empty() {
        config.auth_info.token = Some(SecretString::new(token.clone()));
    }
    config.root_cert = descriptor.root_certs.clone();
    config.accept_invalid_certs = descriptor.trust == TrustMode::Insecure;

    Ok(config)
}

/// Turns connection descriptors into a populated [`ClientRegistry`].
pub struct Bootstrapper {
    policy: FailurePolicy,
    probe_timeout: Duration,
}

impl Bootstrapper {
    pub fn new(policy: FailurePolicy, probe_timeout: Duration) -> Self {
        Bootstrapper { policy, probe_timeout }
    }

    /// Connect to every cluster in `descriptors` and register it.
    ///
    /// A client that cannot be built is always fatal. An unreachable cluster is
    /// fatal under [`FailurePolicy::FailFast`] and recorded as degraded in the
    /// returned [`FleetHealth`] under [`FailurePolicy::Tolerate`]. On error
    /// nothing built so far survives.
    pub async fn bootstrap(
        &self,
        local: Client,
        uncached: Client,
        descriptors: &[ConnectionDescriptor],
    ) -> Result<(ClientRegistry, FleetHealth)> {
        let mut clients = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let config = connection_config(descriptor)?;
            let client = Client::try_from(config).map_err(|source| Error::Connection {
                url: descriptor.api_url.clone(),
                source,
            })?;
            clients.push((descriptor.api_url.as_str(), client));
        }

        let probes = clients.iter().map(|(url, client)| probe(url, client, self.probe_timeout));
        let outcomes = join_all(probes).await;

        let health = FleetHealth::new();
        let mut registry = ClientRegistry::new(local, uncached);
        for ((url, client), outcome) in clients.into_iter().zip(outcomes) {
            match outcome {
                Ok(version) => {
                    info!("Connected to cluster {} ({})", url, version);
                    health.mark_reachable(url, version).await;
                }
                Err(err) if self.policy == FailurePolicy::FailFast => return Err(err),
                Err(err) => {
                    warn!("Cluster {} is unreachable, continuing without it for now: {}", url, err);
                    health.mark_degraded(url, err.to_string()).await;
                }
            }
            registry.register(url, client);
        }

        info!(
            "Bootstrapped {} remote clusters ({} degraded)",
            registry.len(),
            health.degraded().await.len()
        );
        Ok((registry, health))
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;

    use super::*;
    use crate::credentials;

    fn local_client() -> Client {
        Client::try_from(Config::new("https://kubernetes.default.svc".parse().unwrap())).unwrap()
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!("fail-fast".parse::<FailurePolicy>(), Ok(FailurePolicy::FailFast));
        assert_eq!("tolerate".parse::<FailurePolicy>(), Ok(FailurePolicy::Tolerate));
        assert!("sometimes".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default().to_string(), "tolerate");
    }

    #[test]
    fn test_connection_config_verifies_by_default() {
        let descriptors = credentials::parse(r#"[{"api_url": "https://c1:6443", "api_token": "t1"}]"#).unwrap();

        let config = connection_config(&descriptors[0]).unwrap();
        assert_eq!(config.cluster_url.host(), Some("c1"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.auth_info.token.as_ref().unwrap().expose_secret(), "t1");
    }

    #[test]
    fn test_connection_config_insecure() {
        let descriptors = credentials::parse(
            r#"[{"api_url": "https://c1:6443", "api_token": "t1", "insecure_skip_tls_verify": true}]"#,
        )
        .unwrap();

        assert!(connection_config(&descriptors[0]).unwrap().accept_invalid_certs);
    }

    #[test]
    fn test_connection_config_trusts_cluster_ca() {
        let bundle = "-----BEGIN CERTIFICATE-----\nMIIBszCCAVmgAwIBAgIUZm9v\n-----END CERTIFICATE-----\n";
        let content = format!(
            r#"[{{"api_url": "https://c1:6443", "api_token": "t1", "certificate_authority_data": "{}"}}]"#,
            BASE64.encode(bundle)
        );
        let descriptors = credentials::parse(&content).unwrap();

        let config = connection_config(&descriptors[0]).unwrap();
        assert!(config.root_cert.is_some());
        assert_eq!(config.root_cert.unwrap().len(), 1);
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_connection_config_without_token() {
        let descriptors = credentials::parse(r#"[{"api_url": "https://c1:6443"}]"#).unwrap();

        let config = connection_config(&descriptors[0]).unwrap();
        assert!(config.auth_info.token.is_none());
        assert!(config.root_cert.is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_tolerates_unreachable_clusters() {
        let descriptors = credentials::parse(
            r#"[{"api_url": "https://127.0.0.1:1", "api_token": "t1"}, {"api_url": "https://127.0.0.1:2", "api_token": "t2"}]"#,
        )
        .unwrap();

        let bootstrapper = Bootstrapper::new(FailurePolicy::Tolerate, Duration::from_secs(2));
        let (registry, health) = bootstrapper
            .bootstrap(local_client(), local_client(), &descriptors)
            .await
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("https://127.0.0.1:1").is_ok());
        assert!(registry.lookup("https://127.0.0.1:2").is_ok());
        assert!(registry.lookup("").is_ok());
        assert_eq!(health.degraded().await.len(), 2);
    }

    #[tokio::test]
    async fn test_bootstrap_registers_every_entry() {
        let descriptors = credentials::parse(
            r#"[{"api_url":"https://c1","api_token":"t1"},{"api_url":"https://c2","api_token":"t2"}]"#,
        )
        .unwrap();

        let bootstrapper = Bootstrapper::new(FailurePolicy::Tolerate, Duration::from_secs(1));
        let (registry, _) = bootstrapper
            .bootstrap(local_client(), local_client(), &descriptors)
            .await
            .unwrap();

        assert_eq!(registry.list_all().len(), 2);
        assert!(registry.lookup("https://c1").is_ok());
        assert!(registry.lookup("https://c2").is_ok());
    }

    #[tokio::test]
    async fn test_bootstrap_fail_fast_aborts() {
        let descriptors = credentials::parse(r#"[{"api_url": "https://127.0.0.1:1", "api_token": "t1"}]"#).unwrap();

        let bootstrapper = Bootstrapper::new(FailurePolicy::FailFast, Duration::from_secs(2));
        let result = bootstrapper.bootstrap(local_client(), local_client(), &descriptors).await;

        assert!(result.is_err());
    }
}
