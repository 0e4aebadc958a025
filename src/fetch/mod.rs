//! Fetching registry item content at a pinned ref.
//!
//! [`FetchService`] turns a resolved [`RegistryEntry`] into the bytes of each of
//! its files. Transient source failures are retried with exponential backoff
//! before surfacing as [`KitpmError::Fetch`]. Independent items are fetched
//! concurrently through a bounded pool by [`FetchService::fetch_all`]; what to
//! do with a failed item is the caller's decision.

pub mod source;

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_FETCH_RETRIES, FETCH_RETRY_DELAY_MS, REGISTRY_INDEX_PATH, STARTING_BACKOFF_DELAY_MS,
};
use crate::core::KitpmError;
use crate::registry::{RegistryEntry, StaticRegistry};
use crate::utils::progress::ProgressBar;

pub use source::{FileSource, HttpSource, LocalSource, Source, SourceError};

/// One fetched file, keyed by its logical registry path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: String,
    pub content: Vec<u8>,
}

/// All files of one item, in the order the registry declares them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedItem {
    pub name: String,
    pub files: Vec<FetchedFile>,
}

/// Per-item fetch outcomes, keyed by item name.
pub type FetchResults = HashMap<String, Result<FetchedItem, KitpmError>>;

/// Fetches item files from a [`FileSource`].
pub struct FetchService<S: FileSource> {
    source: S,
    retries: usize,
}

impl<S: FileSource> FetchService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            retries: DEFAULT_FETCH_RETRIES,
        }
    }

    /// Number of retries after the first failed attempt of a file.
    #[must_use]
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every file of `entry` at `git_ref`.
    ///
    /// The first file that cannot be fetched fails the whole item.
    pub async fn fetch(&self, entry: &RegistryEntry, git_ref: &str) -> Result<FetchedItem, KitpmError> {
        let mut files = Vec::with_capacity(entry.files.len());

        for file in &entry.files {
            let remote = file.remote_source_path();
            let content =
                self.fetch_with_retry(&remote, git_ref).await.map_err(|e| KitpmError::Fetch {
                    item: entry.name.clone(),
                    git_ref: git_ref.to_string(),
                    reason: e.to_string(),
                })?;
            files.push(FetchedFile {
                path: file.path.clone(),
                content,
            });
        }

        debug!("Fetched '{}' ({} files) at {}", entry.name, files.len(), git_ref);
        Ok(FetchedItem {
            name: entry.name.clone(),
            files,
        })
    }

    /// Fetch many items concurrently, at most `concurrency` at a time.
    ///
    /// Every entry gets an outcome in the returned map; failures do not cancel
    /// other fetches.
    pub async fn fetch_all(
        &self,
        entries: &[RegistryEntry],
        git_ref: &str,
        concurrency: usize,
        progress: Option<&ProgressBar>,
    ) -> FetchResults {
        stream::iter(entries)
            .map(|entry| async move {
                let result = self.fetch(entry, git_ref).await;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                (entry.name.clone(), result)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }

    /// Fetch and validate the registry index at `git_ref`.
    pub async fn fetch_index(&self, git_ref: &str) -> Result<StaticRegistry, KitpmError> {
        let fetch_error = |reason: String| KitpmError::Fetch {
            item: "registry index".to_string(),
            git_ref: git_ref.to_string(),
            reason,
        };

        let bytes = self
            .fetch_with_retry(REGISTRY_INDEX_PATH, git_ref)
            .await
            .map_err(|e| fetch_error(format!("{} ({})", e, self.source.describe())))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| fetch_error("registry index is not valid UTF-8".to_string()))?;

        StaticRegistry::from_toml_str(&text)
    }

    async fn fetch_with_retry(&self, remote: &str, git_ref: &str) -> Result<Vec<u8>, SourceError> {
        let strategy = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .factor(2)
            .max_delay(Duration::from_millis(FETCH_RETRY_DELAY_MS))
            .take(self.retries);

        RetryIf::spawn(
            strategy,
            || async move {
                self.source.fetch_file(remote, git_ref).await.inspect_err(|e| {
                    if e.is_transient() {
                        warn!("Fetching {} failed, retrying: {}", remote, e);
                    }
                })
            },
            |e: &SourceError| e.is_transient(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source backed by a map, with a number of transient failures per path.
    #[derive(Default)]
    struct MockSource {
        files: HashMap<String, Vec<u8>>,
        flaky: Mutex<HashMap<String, usize>>,
        broken: Vec<String>,
        calls: AtomicUsize,
    }

    impl MockSource {
        fn with_file(mut self, path: &str, content: &str) -> Self {
            self.files.insert(path.to_string(), content.as_bytes().to_vec());
            self
        }

        fn flaky(self, path: &str, failures: usize) -> Self {
            self.flaky.lock().unwrap().insert(path.to_string(), failures);
            self
        }
    }

    impl FileSource for MockSource {
        async fn fetch_file(&self, remote_path: &str, _git_ref: &str) -> Result<Vec<u8>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.broken.iter().any(|p| p == remote_path) {
                return Err(SourceError::Permanent(format!("{remote_path}: HTTP 403")));
            }
            {
                let mut flaky = self.flaky.lock().unwrap();
                if let Some(remaining) = flaky.get_mut(remote_path)
                    && *remaining > 0
                {
                    *remaining -= 1;
                    return Err(SourceError::Transient(format!("{remote_path}: reset")));
                }
            }
            self.files
                .get(remote_path)
                .cloned()
                .ok_or_else(|| SourceError::NotFound(remote_path.to_string()))
        }

        fn describe(&self) -> String {
            "mock".to_string()
        }
    }

    fn button() -> RegistryEntry {
        RegistryEntry::new("button", &[]).with_file("primitives/button.tsx")
    }

    #[tokio::test]
    async fn test_fetch_item() {
        let source = MockSource::default().with_file("registry/primitives/button.tsx", "button");
        let service = FetchService::new(source);

        let item = service.fetch(&button(), "main").await.unwrap();
        assert_eq!(item.name, "button");
        assert_eq!(item.files[0].path, "primitives/button.tsx");
        assert_eq!(item.files[0].content, b"button");
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let source = MockSource::default()
            .with_file("registry/primitives/button.tsx", "button")
            .flaky("registry/primitives/button.tsx", 2);
        let service = FetchService::new(source).with_retries(3);

        assert!(service.fetch(&button(), "main").await.is_ok());
        assert_eq!(service.source().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_is_fetch_error() {
        let source = MockSource::default()
            .with_file("registry/primitives/button.tsx", "button")
            .flaky("registry/primitives/button.tsx", 5);
        let service = FetchService::new(source).with_retries(1);

        match service.fetch(&button(), "v1").await {
            Err(KitpmError::Fetch {
                item,
                git_ref,
                ..
            }) => {
                assert_eq!(item, "button");
                assert_eq!(git_ref, "v1");
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
        assert_eq!(service.source().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let service = FetchService::new(MockSource::default()).with_retries(3);

        assert!(service.fetch(&button(), "main").await.is_err());
        assert_eq!(service.source().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_reports_every_item() {
        let mut source = MockSource::default()
            .with_file("registry/primitives/button.tsx", "button")
            .with_file("registry/shared/utils.ts", "utils");
        source.broken.push("registry/primitives/modal.tsx".to_string());
        let service = FetchService::new(source);

        let entries = vec![
            button(),
            RegistryEntry::new("modal", &["button"]).with_file("primitives/modal.tsx"),
            RegistryEntry::new("shared/utils", &[]).with_file("shared/utils.ts"),
        ];
        let results = service.fetch_all(&entries, "main", 2, None).await;

        assert_eq!(results.len(), 3);
        assert!(results["button"].is_ok());
        assert!(results["shared/utils"].is_ok());
        assert!(matches!(results["modal"], Err(KitpmError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_fetch_index() {
        let source = MockSource::default().with_file(
            "registry/index.toml",
            "[[items]]\nname = \"button\"\n[[items.files]]\npath = \"primitives/button.tsx\"\n",
        );
        let service = FetchService::new(source);

        let registry = service.fetch_index("main").await.unwrap();
        assert_eq!(registry.len(), 1);

        let missing = FetchService::new(MockSource::default()).fetch_index("main").await;
        assert!(matches!(missing, Err(KitpmError::Fetch { .. })));
    }
}
