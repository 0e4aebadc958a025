//! Where registry file content comes from.
//!
//! A [`FileSource`] answers one question: the bytes of a path in the upstream
//! registry at a ref. [`HttpSource`] expands a URL template, [`LocalSource`]
//! reads from a directory (useful for vendored registries and for tests), and
//! [`Source`] picks between them from the ledger's `source` string.

use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::constants::HTTP_FETCH_TIMEOUT;

/// Failure to read one upstream file.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The path does not exist at this ref
    #[error("{0} not found")]
    NotFound(String),
    /// Worth retrying: timeouts, connection resets, 5xx and 429 responses
    #[error("{0}")]
    Transient(String),
    #[error("{0}")]
    Permanent(String),
}

impl SourceError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Read access to upstream registry files.
pub trait FileSource: Send + Sync {
    /// Raw bytes of `remote_path` at `git_ref`.
    fn fetch_file(
        &self,
        remote_path: &str,
        git_ref: &str,
    ) -> impl Future<Output = Result<Vec<u8>, SourceError>> + Send;

    /// Short human-readable description for logs and errors.
    fn describe(&self) -> String;
}

/// Fetches over HTTP(S) from a URL template containing `{ref}` and `{path}`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    template: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(template: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_FETCH_TIMEOUT)
            .user_agent(concat!("kitpm/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            template: template.into(),
            client,
        })
    }

    /// The URL for `remote_path` at `git_ref`.
    #[must_use]
    pub fn url_for(&self, remote_path: &str, git_ref: &str) -> String {
        expand_template(&self.template, remote_path, git_ref)
    }
}

impl FileSource for HttpSource {
    async fn fetch_file(&self, remote_path: &str, git_ref: &str) -> Result<Vec<u8>, SourceError> {
        let url = self.url_for(remote_path, git_ref);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() || e.is_request() {
                SourceError::Transient(format!("{url}: {e}"))
            } else {
                SourceError::Permanent(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url));
        }
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::Transient(format!("{url}: HTTP {status}")));
        }
        if !status.is_success() {
            return Err(SourceError::Permanent(format!("{url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Transient(format!("{url}: {e}")))?;
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.template.clone()
    }
}

/// Reads registry files from a directory.
///
/// The root may contain `{ref}`, in which case each ref is its own directory
/// (`/srv/registry/{ref}` reads `v1.2.0` from `/srv/registry/v1.2.0`).
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: String,
}

impl LocalSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_string_lossy().into_owned(),
        }
    }

    fn path_for(&self, remote_path: &str, git_ref: &str) -> PathBuf {
        Path::new(&self.root.replace("{ref}", git_ref)).join(remote_path)
    }
}

impl FileSource for LocalSource {
    async fn fetch_file(&self, remote_path: &str, git_ref: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.path_for(remote_path, git_ref);
        debug!("Reading {}", path.display());

        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(path.display().to_string()),
            std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock => {
                SourceError::Transient(format!("{}: {e}", path.display()))
            }
            _ => SourceError::Permanent(format!("{}: {e}", path.display())),
        })
    }

    fn describe(&self) -> String {
        self.root.clone()
    }
}

/// A source chosen from the ledger's `source` setting.
#[derive(Debug, Clone)]
pub enum Source {
    Http(HttpSource),
    Local(LocalSource),
}

impl Source {
    /// `http://` and `https://` values are URL templates; anything else is a
    /// directory, relative paths being resolved against `project_dir`.
    pub fn from_setting(setting: &str, project_dir: &Path) -> anyhow::Result<Self> {
        if setting.starts_with("http://") || setting.starts_with("https://") {
            return Ok(Self::Http(HttpSource::new(setting)?));
        }

        let root = setting.strip_prefix("file://").unwrap_or(setting);
        let root = if Path::new(root).is_absolute() {
            PathBuf::from(root)
        } else {
            project_dir.join(root)
        };
        Ok(Self::Local(LocalSource::new(root)))
    }
}

impl FileSource for Source {
    async fn fetch_file(&self, remote_path: &str, git_ref: &str) -> Result<Vec<u8>, SourceError> {
        match self {
            Self::Http(source) => source.fetch_file(remote_path, git_ref).await,
            Self::Local(source) => source.fetch_file(remote_path, git_ref).await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Http(source) => source.describe(),
            Self::Local(source) => source.describe(),
        }
    }
}

fn expand_template(template: &str, remote_path: &str, git_ref: &str) -> String {
    let expanded = template.replace("{ref}", git_ref);
    if expanded.contains("{path}") {
        expanded.replace("{path}", remote_path)
    } else {
        format!("{}/{}", expanded.trim_end_matches('/'), remote_path)
    }
}
