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

use envc_crds::{Envconfig, EnvconfigStatus};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::{json, Value};
use tracing::info;

use super::error::{Error, Result};
use super::FIELD_MANAGER;

/// Replace the status of `envconfig` through a server-side apply, so fields
/// left out of `status` are removed rather than kept from a previous write.
pub async fn patch_status(client: &Client, envconfig: &Envconfig, status: &EnvconfigStatus) -> Result<Envconfig> {
    let namespace = envconfig.namespace().ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
    let api: Api<Envconfig> = Api::namespaced(client.clone(), &namespace);

    let params = PatchParams::apply(FIELD_MANAGER).force();
    let envconfig = api
        .patch_status(&envconfig.name_any(), &params, &Patch::Apply(status_patch(status)))
        .await
        .map_err(Error::KubeError)?;
    info!("Patched status of Envconfig {}/{}", namespace, envconfig.name_any());

    Ok(envconfig)
}

fn status_patch(status: &EnvconfigStatus) -> Value {
    json!({
        "apiVersion": Envconfig::api_version(&()),
        "kind": Envconfig::kind(&()),
        "status": status,
    })
}
