//! Workbook retrieval
//!
//! The trigger carries a file reference, not the file. `http://` and
//! `https://` references are downloaded. `file://` references are read from
//! local disk only when a local root is configured, and only for files that
//! resolve inside it. Bare paths are rejected.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ImportError;

const USER_AGENT: &str = concat!("procura-import/", env!("CARGO_PKG_VERSION"));

/// Source of workbook bytes
#[async_trait]
pub trait WorkbookSource: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, ImportError>;
}

/// Fetches over HTTP(S), or from disk under `local_root`
pub struct HttpWorkbookSource {
    client: reqwest::Client,
    local_root: Option<PathBuf>,
}

impl HttpWorkbookSource {
    pub fn new(timeout: Duration, local_root: Option<PathBuf>) -> Result<Self, ImportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ImportError::Fetch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, local_root })
    }

    /// Read a `file://` path that must resolve inside the local root
    ///
    /// Relative paths are taken from the root. Both sides are canonicalized
    /// first so `..` segments and symlinks cannot step outside it.
    async fn fetch_local(&self, path: &str) -> Result<Vec<u8>, ImportError> {
        let Some(root) = &self.local_root else {
            return Err(ImportError::Fetch(format!(
                "{}: local file references are disabled",
                path
            )));
        };

        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| ImportError::Fetch(format!("{}: {}", root.display(), e)))?;
        let target = root.join(Path::new(path));
        let target = tokio::fs::canonicalize(&target)
            .await
            .map_err(|e| ImportError::Fetch(format!("{}: {}", path, e)))?;

        if !target.starts_with(&root) {
            tracing::warn!(path = %path, root = %root.display(), "Rejected local file outside root");
            return Err(ImportError::Fetch(format!(
                "{}: outside the local file root",
                path
            )));
        }

        tokio::fs::read(&target)
            .await
            .map_err(|e| ImportError::Fetch(format!("{}: {}", path, e)))
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, ImportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImportError::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::Fetch(format!("{} returned HTTP {}", url, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImportError::Fetch(format!("{}: {}", url, e)))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl WorkbookSource for HttpWorkbookSource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, ImportError> {
        let reference = reference.trim();
        tracing::debug!(reference = %reference, "Fetching workbook");

        if reference.starts_with("http://") || reference.starts_with("https://") {
            return self.fetch_http(reference).await;
        }

        match reference.strip_prefix("file://") {
            Some(path) => self.fetch_local(path).await,
            None => Err(ImportError::Fetch(format!(
                "Unsupported file reference: {}",
                reference
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(root: Option<&Path>) -> HttpWorkbookSource {
        HttpWorkbookSource::new(Duration::from_secs(5), root.map(Path::to_path_buf)).unwrap()
    }

    fn fetch_message(err: ImportError) -> String {
        match err {
            ImportError::Fetch(message) => message,
            other => panic!("expected fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reads_file_url_under_root() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("ordenes.xlsx");
        std::fs::write(&path, b"workbook-bytes").unwrap();

        let source = source(Some(root.path()));

        let absolute = format!("file://{}", path.display());
        assert_eq!(source.fetch(&absolute).await.unwrap(), b"workbook-bytes");
        assert_eq!(
            source.fetch("file://ordenes.xlsx").await.unwrap(),
            b"workbook-bytes"
        );
    }

    #[tokio::test]
    async fn test_bare_path_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("ordenes.xlsx");
        std::fs::write(&path, b"workbook-bytes").unwrap();

        let err = source(Some(root.path()))
            .fetch(&path.display().to_string())
            .await
            .unwrap_err();

        assert!(fetch_message(err).starts_with("Unsupported file reference"));
    }

    #[tokio::test]
    async fn test_file_url_outside_root_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(outside.path(), b"secret").unwrap();

        let source = source(Some(root.path()));

        let absolute = format!("file://{}", outside.path().display());
        let err = source.fetch(&absolute).await.unwrap_err();
        assert!(fetch_message(err).ends_with("outside the local file root"));

        let escaped = format!(
            "file://../{}",
            outside.path().file_name().unwrap().to_string_lossy()
        );
        assert!(matches!(
            source.fetch(&escaped).await,
            Err(ImportError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn test_local_reads_disabled_without_root() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"workbook-bytes").unwrap();

        let err = source(None)
            .fetch(&format!("file://{}", file.path().display()))
            .await
            .unwrap_err();

        assert!(fetch_message(err).ends_with("local file references are disabled"));
    }

    #[tokio::test]
    async fn test_missing_file_is_fetch_error() {
        let root = tempfile::tempdir().unwrap();
        let err = source(Some(root.path()))
            .fetch("file://not-here.xlsx")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Fetch(_)));
    }
}
