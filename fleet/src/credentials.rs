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

//! Loads the static credentials file listing every remote cluster.
//!
//! The file is a JSON array of `{"api_url": "...", "api_token": "..."}`
//! entries; unknown keys are ignored. An entry may also carry
//! `certificate_authority_data`, the base64 encoded PEM bundle its API server
//! certificate is checked against, and `insecure_skip_tls_verify`.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// How the TLS certificate of a remote cluster is checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrustMode {
    #[default]
    Verify,
    Insecure,
}

/// Everything needed to connect to one remote cluster.
#[derive(Debug)]
pub struct ConnectionDescriptor {
    pub api_url: String,
    pub token: SecretString,
    pub trust: TrustMode,
    /// DER encoded CA certificates; the platform roots are used when absent.
    pub root_certs: Option<Vec<Vec<u8>>>,
}

#[derive(Deserialize)]
struct FileTokenEntry {
    #[serde(default)]
    api_url: String,
    #[serde(default)]
    api_token: Option<SecretString>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

/// Read the credentials file at `path` and parse it into connection descriptors,
/// in file order.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<ConnectionDescriptor>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let descriptors = parse(&content)?;
    debug!("Loaded {} cluster credentials from {:?}", descriptors.len(), path);

    Ok(descriptors)
}

pub fn parse(content: &str) -> Result<Vec<ConnectionDescriptor>> {
    let entries: Vec<FileTokenEntry> = serde_json::from_str(content).map_err(Error::Format)?;

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            validate_api_url(index, &entry.api_url)?;

            let root_certs = entry
                .certificate_authority_data
                .as_deref()
                .map(|data| decode_root_certs(index, data))
                .transpose()?;

            let trust = match entry.insecure_skip_tls_verify {
                true => TrustMode::Insecure,
                false => TrustMode::Verify,
            };

            Ok(ConnectionDescriptor {
                api_url: entry.api_url,
                token: entry.api_token.unwrap_or_else(|| SecretString::new(String::new())),
                trust,
                root_certs,
            })
        })
        .collect()
}

fn validate_api_url(index: usize, api_url: &str) -> Result<()> {
    if api_url.trim().is_empty() {
        return Err(Error::EmptyApiUrl(index));
    }

    let invalid = |reason: String| Error::InvalidApiUrl {
        index,
        url: api_url.to_string(),
        reason,
    };
    Url::parse(api_url).map_err(|e| invalid(e.to_string()))?;
    // Clients are built from an `http::Uri`, which rejects what `Url` silently trims.
    api_url.parse::<http::Uri>().map_err(|e| invalid(e.to_string()))?;

    Ok(())
}

fn decode_root_certs(index: usize, data: &str) -> Result<Vec<Vec<u8>>> {
    let invalid = |reason: String| Error::InvalidCertificateAuthority { index, reason };

    let bundle = BASE64.decode(data.trim()).map_err(|e| invalid(e.to_string()))?;
    let certs: Vec<Vec<u8>> = pem::parse_many(&bundle)
        .map_err(|e| invalid(e.to_string()))?
        .into_iter()
        .filter(|block| block.tag() == "CERTIFICATE")
        .map(|block| block.into_contents())
        .collect();

    if certs.is_empty() {
        return Err(invalid("no CERTIFICATE block found".into()));
    }
    Ok(certs)
}

/// Force every descriptor to skip certificate verification.
pub fn force_insecure(descriptors: &mut [ConnectionDescriptor]) {
    for descriptor in descriptors.iter_mut() {
        descriptor.trust = TrustMode::Insecure;
    }
}

/// Log a warning for every cluster whose certificate is not verified.
pub fn warn_insecure(descriptors: &[ConnectionDescriptor]) {
    for descriptor in descriptors.iter().filter(|d| d.trust == TrustMode::Insecure) {
        warn!(
            "TLS certificate verification is disabled for cluster {}, its identity is not checked",
            descriptor.api_url
        );
    }
}
