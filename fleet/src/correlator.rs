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

use envc_crds::{Envconfig, NAME_LABEL, PROJECT_LABEL};
use kube::runtime::reflector::ObjectRef;
use kube::{Resource, ResourceExt};

/// The `{namespace, name}` key of one Envconfig to be reconciled.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReconcileIdentity {
    pub namespace: String,
    pub name: String,
}

impl ReconcileIdentity {
    pub fn object_ref(&self) -> ObjectRef<Envconfig> {
        ObjectRef::new(&self.name).within(&self.namespace)
    }
}

impl Display for ReconcileIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The two label keys that route an object in any cluster to its owning Envconfig.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationLabels {
    /// Holds the Envconfig name.
    pub name_key: String,
    /// Holds the Envconfig namespace.
    pub namespace_key: String,
}

impl Default for CorrelationLabels {
    fn default() -> Self {
        CorrelationLabels::new(NAME_LABEL, PROJECT_LABEL)
    }
}

impl CorrelationLabels {
    pub fn new(name_key: impl Into<String>, namespace_key: impl Into<String>) -> Self {
        CorrelationLabels {
            name_key: name_key.into(),
            namespace_key: namespace_key.into(),
        }
    }

    /// Map an observed object to the Envconfig owning it.
    ///
    /// Emits an identity only when both labels are present and non-empty.
    pub fn correlate<K: Resource>(&self, obj: &K) -> Option<ReconcileIdentity> {
        let labels = obj.labels();
        let name = labels.get(&self.name_key).filter(|v| !v.is_empty())?;
        let namespace = labels.get(&self.namespace_key).filter(|v| !v.is_empty())?;

        Some(ReconcileIdentity {
            namespace: namespace.clone(),
            name: name.clone(),
        })
    }

    /// Label selector restricting a watch to objects that can correlate at all.
    pub fn selector(&self) -> String {
        self.name_key.clone()
    }

    /// A controller mapper around [`CorrelationLabels::correlate`].
    pub fn mapper<K: Resource + 'static>(&self) -> impl Fn(K) -> Option<ObjectRef<Envconfig>> + Send + Sync + 'static {
        let labels = self.clone();
        move |obj| labels.correlate(&obj).map(|identity| identity.object_ref())
    }
}
