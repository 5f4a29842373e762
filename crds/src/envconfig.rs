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
use std::fmt::Display;

use convert_case::{Case, Casing};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::INFRA_ENV_CLASS;

#[derive(CustomResource, Default, Deserialize, Serialize, Clone, Debug, JsonSchema, Validate)]
#[kube(
    group = "company.tld",
    version = "v1alpha1",
    kind = "Envconfig",
    plural = "envconfigs",
    shortname = "envc",
    namespaced,
    status = "EnvconfigStatus"
)]
pub struct EnvconfigSpec {
    /// All the environments of this application, possibly spread across clusters
    #[validate(length(min = 1))]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub is_default: bool,
    /// The owners of this application
    #[validate(length(min = 1))]
    pub owners: Vec<String>,
    /// Ordered groups of environment names, expressing the rollout order
    #[serde(rename = "environments_sequence", default, skip_serializing_if = "Vec::is_empty")]
    pub env_sequence: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
    /// Role overrides applied to every environment of the given class
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles_env: Vec<EnvRole>,
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct Environment {
    /// Used to generate the environment object name
    pub name: String,
    /// dev / testing / prod / infra
    pub env_class: String,
    /// API URL of the cluster hosting this environment, empty for the local cluster
    #[serde(default)]
    pub api_url: String,
    /// Namespace in the selected cluster
    pub namespace: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub network_policy: bool,
    #[serde(rename = "enable_telepresence_anyuid", default, skip_serializing_if = "std::ops::Not::not")]
    pub telepresence: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Admin,
    Edit,
    View,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct Role {
    #[serde(rename = "role")]
    pub name: RoleName,
    pub groups: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct EnvRole {
    #[serde(rename = "env")]
    pub env_class: String,
    pub roles: Vec<Role>,
}

impl Envconfig {
    /// Returns the API URL of the first `infra` environment, if any.
    ///
    /// When several environments are declared as `infra` the first one in
    /// declaration order wins.
    pub fn control_api_url(&self) -> Option<&str> {
        self.spec
            .environments
            .iter()
            .find(|env| env.env_class == INFRA_ENV_CLASS)
            .map(|env| env.api_url.as_str())
    }

    pub fn infra_environments(&self) -> usize {
        self.spec.environments.iter().filter(|env| env.env_class == INFRA_ENV_CLASS).count()
    }

    /// The labels linking a namespace in any cluster back to this Envconfig.
    pub fn link_labels(&self, name_key: &str, project_key: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (name_key.to_string(), self.name_any()),
            (project_key.to_string(), self.namespace().unwrap_or_default()),
        ])
    }

    /// The link labels rendered as a label selector.
    pub fn link_selector(&self, name_key: &str, project_key: &str) -> String {
        self.link_labels(name_key, project_key)
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct EnvconfigStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "allEnvironmentsCreated", default)]
    pub all_environments_created: bool,
    #[serde(rename = "apiTokensReady", default)]
    pub api_tokens_ready: bool,
    #[serde(rename = "apiTokensSecret", default, skip_serializing_if = "Option::is_none")]
    pub api_tokens_secret: Option<String>,
    #[serde(rename = "imagePullerInjected", default)]
    pub image_puller_injected: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<EnvconfigCondition>,
    #[serde(rename = "console_urls", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub console_urls: BTreeMap<String, String>,
    /// What the last reconcile observed in each cluster, keyed by API URL
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub clusters: BTreeMap<String, ClusterSurvey>,
}

impl EnvconfigStatus {
    pub fn available(&self) -> bool {
        self.state(ConditionType::Available, ConditionStatus::True)
    }

    pub fn condition(&self, type_: ConditionType) -> Option<&EnvconfigCondition> {
        let type_ = type_.to_string();
        self.conditions.iter().find(|condition| condition.type_ == type_)
    }

    fn state(&self, type_: ConditionType, status: ConditionStatus) -> bool {
        self.condition(type_).map_or(false, |condition| condition.status == status.to_string())
    }
}

#[derive(Default, Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct ClusterSurvey {
    pub reachable: bool,
    /// Namespaces linked to this Envconfig, sorted by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A status condition without a transition timestamp, so that recomputing it
/// from unchanged input yields an identical value.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct EnvconfigCondition {
    #[serde(rename = "Type")]
    pub type_: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Message", default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(rename = "Reason", default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl EnvconfigCondition {
    pub fn available(status: bool, reason: &str, message: Option<String>) -> Self {
        EnvconfigCondition::create(ConditionType::Available, status.into(), reason, message)
    }

    #[inline]
    fn create(type_: ConditionType, status: ConditionStatus, reason: &str, message: Option<String>) -> Self {
        EnvconfigCondition {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: reason.to_case(Case::Pascal),
            message: message.unwrap_or_default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionType {
    Available,
    Tokensecret,
}

impl Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionType::Available => f.write_str("Available"),
            ConditionType::Tokensecret => f.write_str("Tokensecret"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

impl Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionStatus::True => f.write_str("True"),
            ConditionStatus::False => f.write_str("False"),
        }
    }
}
