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

use k8s_openapi::api::core::v1::Namespace;
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, info};

use super::cluster_name;
use super::error::{Error, Result};

/// List the namespaces matching `selector` in one cluster, sorted by name.
pub async fn list(client: &Client, api_url: &str, selector: &str) -> Result<Vec<String>> {
    let api: Api<Namespace> = Api::all(client.clone());
    let params = ListParams::default().labels(selector);
    debug!("Listing namespaces in cluster {} with selector {:?}", cluster_name(api_url), selector);

    let namespaces = api.list(&params).await.map_err(Error::KubeError)?;
    let names = sorted_names(namespaces.items);

    for name in &names {
        info!("Found namespace {} in cluster {}", name, cluster_name(api_url));
    }

    Ok(names)
}

fn sorted_names(namespaces: Vec<Namespace>) -> Vec<String> {
    let mut names: Vec<String> = namespaces.iter().map(|ns| ns.name_any()).collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use kube::core::ObjectMeta;

    use super::*;

    fn namespace(name: &str) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        }
    }

    #[test]
    fn test_sorted_names() {
        let names = sorted_names(vec![namespace("shop-prod"), namespace("shop-dev"), namespace("shop-dev")]);
        assert_eq!(names, vec!["shop-dev", "shop-prod"]);
    }
}
