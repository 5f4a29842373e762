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

pub mod bootstrap;
pub mod correlator;
pub mod credentials;
pub mod error;
pub mod fanout;
pub mod health;
pub mod registry;

pub use bootstrap::{Bootstrapper, FailurePolicy};
pub use correlator::{CorrelationLabels, ReconcileIdentity};
pub use credentials::{ConnectionDescriptor, TrustMode};
pub use registry::ClientRegistry;
