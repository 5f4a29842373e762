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

use std::sync::Arc;

use envc_fleet::health;
use tracing::{debug, warn};

use crate::context::Context;

/// Probe the remote clusters on a timer, so clusters that were unreachable at
/// startup, or became so since, are noticed when they come back.
pub async fn new(ctx: &Arc<Context>) {
    let mut interval = tokio::time::interval(ctx.config.probe_interval);
    // The first tick completes immediately, bootstrap has just probed every cluster.
    interval.tick().await;

    loop {
        interval.tick().await;
        health::probe_all(&ctx.registry, &ctx.health, ctx.config.cluster_timeout).await;

        let degraded = ctx.health.degraded().await;
        if degraded.is_empty() {
            debug!("All {} remote clusters are reachable", ctx.registry.len());
        } else {
            warn!(
                "{} of {} remote clusters are degraded: {}",
                degraded.len(),
                ctx.registry.len(),
                degraded.join(", ")
            );
        }
    }
}
