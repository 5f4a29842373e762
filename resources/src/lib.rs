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

pub mod envconfig;
pub mod error;
pub mod event;
pub mod namespace;

/// Field manager used for every write made by the operator.
pub const FIELD_MANAGER: &str = "envconfig-operator";

/// Human readable name of a cluster in logs, the empty API URL being this cluster.
#[inline]
pub fn cluster_name(api_url: &str) -> &str {
    if api_url.is_empty() {
        "local"
    } else {
        api_url
    }
}
