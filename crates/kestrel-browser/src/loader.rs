//! Fetching documents and subresources.
//!
//! Network access is outside this crate; a [`DocumentLoader`] supplies the
//! bytes for a URL. Two loaders ship here: one for local files and one
//! backed by an in-memory map for tests and embedding.

use std::collections::HashMap;
use std::fs;
use std::sync::{Mutex, PoisonError};

use crate::error::LoadError;

/// The body of a fetched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Decoded text of the resource.
    pub body: String,
}

/// Source of documents, scripts, and stylesheets.
pub trait DocumentLoader: Send + Sync {
    /// Fetch `url`. A `payload` turns the request into a form submission.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the resource cannot be produced.
    fn fetch(&self, url: &str, payload: Option<&str>) -> Result<Response, LoadError>;
}

/// Serves `file://` URLs and bare paths from the local filesystem.
///
/// `about:blank` yields an empty document. Payloads are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl DocumentLoader for FileLoader {
    fn fetch(&self, url: &str, _payload: Option<&str>) -> Result<Response, LoadError> {
        if url == "about:blank" {
            return Ok(Response {
                body: String::new(),
            });
        }
        let path = match url.strip_prefix("file://") {
            Some(path) => path,
            None if url.contains("://") => return Err(LoadError::UnsupportedUrl(url.to_string())),
            None => url,
        };
        let body = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(Response { body })
    }
}

/// Serves documents from a fixed map and records form submissions.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    documents: HashMap<String, String>,
    submissions: Mutex<Vec<(String, String)>>,
}

impl MemoryLoader {
    /// An empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document body served for `url`.
    #[must_use]
    pub fn with(mut self, url: &str, body: &str) -> Self {
        let _ = self.documents.insert(url.to_string(), body.to_string());
        self
    }

    /// Every `(url, payload)` submitted so far, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<(String, String)> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DocumentLoader for MemoryLoader {
    fn fetch(&self, url: &str, payload: Option<&str>) -> Result<Response, LoadError> {
        if let Some(payload) = payload {
            self.submissions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((url.to_string(), payload.to_string()));
        }
        self.documents
            .get(url)
            .map(|body| Response { body: body.clone() })
            .ok_or_else(|| LoadError::NotFound(url.to_string()))
    }
}
