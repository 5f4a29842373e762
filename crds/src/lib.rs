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

pub use envconfig::*;

/// Label carried by namespaces (in any cluster) that names the owning Envconfig.
pub const NAME_LABEL: &str = "envconfig.company.tld/name";

/// Label carried by namespaces (in any cluster) that names the owning Envconfig's namespace.
pub const PROJECT_LABEL: &str = "envconfig.company.tld/project";

/// The environment class whose API URL is the Envconfig's control plane.
pub const INFRA_ENV_CLASS: &str = "infra";
