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

use envc_fleet::{credentials, Bootstrapper, ClientRegistry, CorrelationLabels};
use envc_fleet::health::FleetHealth;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::Recorder;
use kube::Client;
use tracing::info;

use crate::config::Config;

/// The state shared by every controller of the operator.
///
/// The registry is filled once while the context is built and is read-only
/// afterwards; only the fleet health changes at runtime.
pub struct Context {
    pub registry: ClientRegistry,
    pub health: FleetHealth,
    pub labels: CorrelationLabels,
    pub config: Config,
}

impl Context {
    pub async fn new(config: Config) -> anyhow::Result<Context> {
        // An unusable credentials file must fail before any client exists.
        let mut descriptors = credentials::load(&config.tokens_file)?;
        if config.insecure_skip_tls_verify {
            credentials::force_insecure(&mut descriptors);
        }
        credentials::warn_insecure(&descriptors);
        info!("Loaded credentials of {} remote clusters", descriptors.len());

        let local = Client::try_default().await?;
        let uncached = Client::try_default().await?;

        let bootstrapper = Bootstrapper::new(config.failure_policy, config.cluster_timeout);
        let (registry, health) = bootstrapper.bootstrap(local, uncached, &descriptors).await?;

        Ok(Context {
            registry,
            health,
            labels: CorrelationLabels::new(&config.name_label, &config.project_label),
            config,
        })
    }

    /// The client of the cluster the operator runs in.
    pub fn k8s(&self) -> &Client {
        self.registry.local_client()
    }

    pub fn recorder(&self, reference: ObjectReference) -> Recorder {
        Recorder::new(self.k8s().clone(), "envc-controllers".into(), reference)
    }
}
