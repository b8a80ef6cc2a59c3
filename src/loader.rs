//! Reading manifests and payloads from local files or http(s) URLs.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a JSON document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    File(PathBuf),
    Url(String),
}

impl DocumentSource {
    /// Classify a command-line argument: `http://` and `https://` (any case)
    /// are URLs, everything else is a path.
    pub fn parse(source: &str) -> Self {
        if is_url(source) {
            DocumentSource::Url(source.to_string())
        } else {
            DocumentSource::File(PathBuf::from(source))
        }
    }

    /// Read and parse the document.
    ///
    /// # Errors
    ///
    /// File sources fail with `FileNotFound`, `ReadError` or `InvalidJson`.
    /// URL sources fail with `NetworkError`, or with `InvalidManifest`
    /// when built without the `remote` feature.
    pub fn load(&self) -> Result<Value, LoadError> {
        debug!(source = %self, "loading document");
        match self {
            DocumentSource::File(path) => load_json(path),
            #[cfg(feature = "remote")]
            DocumentSource::Url(url) => load_json_url(url),
            #[cfg(not(feature = "remote"))]
            DocumentSource::Url(url) => Err(LoadError::InvalidManifest {
                message: format!("cannot load {url}: built without the remote feature"),
            }),
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::File(path) => write!(f, "{}", path.display()),
            DocumentSource::Url(url) => f.write_str(url),
        }
    }
}

/// Read a JSON document from disk.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::ReadError {
            path: path.to_path_buf(),
            source,
        },
    })?;
    load_json_str(&content)
}

pub fn load_json_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Fetch a JSON document over HTTP. Non-2xx statuses are errors.
#[cfg(feature = "remote")]
pub fn load_json_url(url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .and_then(|client| client.get(url).send())
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network)
}

pub fn is_url(source: &str) -> bool {
    source.split_once("://").is_some_and(|(scheme, _)| {
        scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
    })
}

/// Shorthand for `DocumentSource::parse(source).load()`.
pub fn load_json_auto(source: &str) -> Result<Value, LoadError> {
    DocumentSource::parse(source).load()
}
