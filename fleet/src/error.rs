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

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IOError: failed to read credentials file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("FormatError: malformed credentials file: {0}")]
    Format(#[source] serde_json::Error),

    #[error("ValidationError: credentials entry #{0} has an empty api_url")]
    EmptyApiUrl(usize),

    #[error("ValidationError: credentials entry #{index} has an invalid api_url {url:?}: {reason}")]
    InvalidApiUrl { index: usize, url: String, reason: String },

    #[error("ValidationError: credentials entry #{index} has an invalid certificate_authority_data: {reason}")]
    InvalidCertificateAuthority { index: usize, reason: String },

    #[error("ConnectionError: unsupported api url {0:?}")]
    UnsupportedApiUrl(String),

    #[error("ConnectionError: cluster {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: kube::Error,
    },

    #[error("NotFoundError: no known client for api {0}")]
    NotFound(String),

    #[error("RemoteOperationError: cluster {url}: {source}")]
    Remote {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("RemoteOperationError: cluster {url} did not answer within {after:?}")]
    Timeout { url: String, after: Duration },
}

impl Error {
    pub fn remote(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Remote {
            url: url.into(),
            source: source.into(),
        }
    }

    /// The credentials file could not be turned into connection descriptors.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Error::Io { .. }
                | Error::Format(_)
                | Error::EmptyApiUrl(_)
                | Error::InvalidApiUrl { .. }
                | Error::InvalidCertificateAuthority { .. }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
