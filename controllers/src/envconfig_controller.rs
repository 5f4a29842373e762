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
use std::time::Duration;

use envc_crds::Envconfig;
use envc_fleet::error::Error as FleetError;
use envc_fleet::fanout::fan_out;
use envc_resources::event::{degraded, trace};
use envc_resources::{cluster_name, envconfig, namespace};
use futures::{future, StreamExt};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::ListParams;
use kube::runtime::controller::{Action, Error as ControllerError};
use kube::runtime::{watcher, Controller};
use kube::{Api, Resource, ResourceExt};
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::context::Context;
use crate::errors::{Error, Result};
use crate::status::{self, Survey};

pub async fn new(ctx: &Arc<Context>) {
    let api: Api<Envconfig> = match ctx.config.namespace.as_str() {
        "" => Api::all(ctx.k8s().clone()),
        namespace => Api::namespaced(ctx.k8s().clone(), namespace),
    };

    // Ensure Envconfig CRD is installed before loop-watching
    let uncached: Api<Envconfig> = Api::all(ctx.registry.uncached_client().clone());
    if let Err(e) = uncached.list(&ListParams::default().limit(1)).await {
        error!("Envconfig CRD is not queryable; {e:?}. Is the CRD installed?");
        info!("Installation: envc-crdgen | kubectl apply -f -");
        std::process::exit(1);
    }

    // Namespaces of every cluster, the local one included, are routed back to
    // their Envconfig through the correlation labels.
    let config = watcher::Config::default().labels(&ctx.labels.selector());
    let local: Api<Namespace> = Api::all(ctx.k8s().clone());
    let mut controller = Controller::new(api, watcher::Config::default()).watches(
        local,
        config.clone(),
        ctx.labels.mapper(),
    );

    for (url, client) in ctx.registry.list_all() {
        info!("Watching namespaces of cluster {}", url);
        let remote: Api<Namespace> = Api::all(client.clone());
        controller = controller.watches(remote, config.clone(), ctx.labels.mapper());
    }

    controller
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx.clone())
        .for_each(|result| {
            match result {
                Ok((obj, _)) => debug!("Reconciled Envconfig {}", obj),
                Err(err) if is_controller_failure(&err) => warn!("Envconfig controller error: {}", err),
                Err(err) => debug!("Reconcile skipped: {}", err),
            }
            future::ready(())
        })
        .await
}

/// The reconciler that will be called when either the Envconfig or a
/// namespace linked to it in any cluster changes.
pub async fn reconcile(envconfig: Arc<Envconfig>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = envconfig.namespace().ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
    info!("Reconciling Envconfig \"{}/{}\"", namespace, envconfig.name_any());

    let status = match envconfig.spec.validate() {
        Ok(()) => {
            log_control_plane(&envconfig);
            let survey = survey(&envconfig, &ctx).await;
            status::compute_status(&envconfig, &survey)
        }
        Err(errors) => status::invalid_status(&envconfig, &errors),
    };

    if envconfig.status.as_ref() == Some(&status) {
        debug!("Status of Envconfig \"{}/{}\" is up to date", namespace, envconfig.name_any());
        return Ok(Action::requeue(ctx.config.resync_interval));
    }

    envconfig::patch_status(ctx.k8s(), &envconfig, &status)
        .await
        .map_err(Error::ResourceError)?;

    let recorder = ctx.recorder(envconfig.object_ref(&()));
    match &status.error {
        None => trace(&recorder, "All clusters converged").await,
        Some(message) => degraded(&recorder, message.clone()).await,
    }

    Ok(Action::requeue(ctx.config.resync_interval))
}

/// an error handler that will be called when the reconciler fails with access to both the
/// object that caused the failure and the actual error
pub fn error_policy(_envconfig: Arc<Envconfig>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!("reconcile failed: {:?}", error);
    Action::requeue(Duration::from_secs(60))
}

/// Queue and watch errors, of remote clusters too. Deleted objects are routine
/// and reconcile errors are already logged by `error_policy`.
fn is_controller_failure(err: &ControllerError<Error, watcher::Error>) -> bool {
    !matches!(
        err,
        ControllerError::ObjectNotFound(_) | ControllerError::ReconcilerFailed(..)
    )
}

/// List the namespaces linked to `envconfig` in every target cluster at once.
async fn survey(envconfig: &Envconfig, ctx: &Context) -> Survey {
    let selector = envconfig.link_selector(&ctx.labels.name_key, &ctx.labels.namespace_key);
    let targets = status::targets(envconfig, ctx.registry.list_all().keys());

    fan_out(&ctx.registry, targets, ctx.config.cluster_timeout, |url, client| {
        let selector = selector.clone();
        async move {
            namespace::list(&client, &url, &selector)
                .await
                .map_err(|err| FleetError::remote(url.clone(), err))
        }
    })
    .await
}

fn log_control_plane(envconfig: &Envconfig) {
    match envconfig.control_api_url() {
        Some(url) => debug!("Control plane of {} is cluster {}", envconfig.name_any(), cluster_name(url)),
        None => debug!("Envconfig {} has no infra environment", envconfig.name_any()),
    }

    let infra = envconfig.infra_environments();
    if infra > 1 {
        warn!(
            "Envconfig {} declares {} infra environments, the first one is the control plane",
            envconfig.name_any(),
            infra
        );
    }
}
