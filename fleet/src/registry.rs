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

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// One client handle per remote cluster, keyed by API URL, next to the two
/// handles every process has for its own cluster.
///
/// The registry is filled while bootstrapping and only read afterwards; it is
/// shared behind the controller context, so steady-state reads take no lock.
pub struct ClientRegistry<C = kube::Client> {
    // cached client used by the controllers
    local: C,
    // client for startup reads that must not wait for any cache
    uncached: C,
    remotes: BTreeMap<String, C>,
}

impl<C> ClientRegistry<C> {
    pub fn new(local: C, uncached: C) -> Self {
        ClientRegistry {
            local,
            uncached,
            remotes: BTreeMap::new(),
        }
    }

    /// Register `client` for `api_url`, returning the handle it replaces.
    ///
    /// Nothing tears down the replaced handle, so registering a URL twice
    /// leaks whatever background work the old handle was driving.
    pub fn register(&mut self, api_url: impl Into<String>, client: C) -> Option<C> {
        let api_url = api_url.into();
        debug!("Register client for cluster {}", api_url);

        let previous = self.remotes.insert(api_url.clone(), client);
        if previous.is_some() {
            warn!("Replaced the already registered client for cluster {}", api_url);
        }
        previous
    }

    /// An empty `api_url` means this cluster and always resolves to the local client.
    pub fn lookup(&self, api_url: &str) -> Result<&C> {
        if api_url.is_empty() {
            return Ok(&self.local);
        }

        self.remotes.get(api_url).ok_or_else(|| Error::NotFound(api_url.to_string()))
    }

    pub fn list_all(&self) -> &BTreeMap<String, C> {
        &self.remotes
    }

    pub fn local_client(&self) -> &C {
        &self.local
    }

    pub fn uncached_client(&self) -> &C {
        &self.uncached
    }

    /// Number of remote clusters.
    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }
}
