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

use std::path::PathBuf;
use std::time::Duration;

use envc_crds::{NAME_LABEL, PROJECT_LABEL};
use envc_fleet::FailurePolicy;

/// The configuration parameters for the operator.
///
/// These can either be passed on the command line, or pulled from environment variables.
/// For development convenience, these can also be read from a `.env` file in the working
/// directory where the operator is started.
#[derive(clap::Parser, Debug)]
pub struct Config {
    /// Limit the operator to Envconfigs of one namespace, all namespaces when empty.
    #[clap(long, env = "WATCH_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Where the admin tokens file is located, a JSON array of
    /// `{"api_url": "...", "api_token": "..."}` entries.
    #[clap(long, env = "ENVC_TOKENS_FILE", default_value = "/var/run/tokens-config/tokens-data")]
    pub tokens_file: PathBuf,

    /// Label holding the owning Envconfig's name on namespaces of every cluster.
    #[clap(long, env = "ENVC_NAME_LABEL", default_value = NAME_LABEL)]
    pub name_label: String,

    /// Label holding the owning Envconfig's namespace on namespaces of every cluster.
    #[clap(long, env = "ENVC_PROJECT_LABEL", default_value = PROJECT_LABEL)]
    pub project_label: String,

    /// What to do with clusters unreachable at startup: `fail-fast` or `tolerate`.
    #[clap(long, env = "ENVC_FAILURE_POLICY", default_value = "tolerate")]
    pub failure_policy: FailurePolicy,

    /// Skip TLS certificate verification for every remote cluster.
    #[clap(long, env = "ENVC_INSECURE_SKIP_TLS_VERIFY")]
    pub insecure_skip_tls_verify: bool,

    /// Seconds a single call to one cluster may take.
    #[clap(long, env = "ENVC_CLUSTER_TIMEOUT", default_value = "10", value_parser = parse_seconds)]
    pub cluster_timeout: Duration,

    /// Seconds between two reachability probes of the remote clusters.
    #[clap(long, env = "ENVC_PROBE_INTERVAL", default_value = "60", value_parser = parse_seconds)]
    pub probe_interval: Duration,

    /// Seconds after which an Envconfig is reconciled again without any event.
    #[clap(long, env = "ENVC_RESYNC_INTERVAL", default_value = "300", value_parser = parse_seconds)]
    pub resync_interval: Duration,
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    match value.parse::<u64>() {
        Ok(0) => Err("must be greater than zero".into()),
        Ok(seconds) => Ok(Duration::from_secs(seconds)),
        Err(err) => Err(err.to_string()),
    }
}
