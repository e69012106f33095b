//! Byte-stream access to telemetry inputs.
//!
//! Loaders never resolve well-known global paths themselves. Callers inject a
//! [`ResourceOpener`] that maps a logical resource identifier such as
//! `/az_el_DSS-13.txt` to a readable stream.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

/// Errors that occur while acquiring an input stream.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Resource not found: {id}")]
    NotFound { id: String },

    #[error("Failed to open resource {id}: {source}")]
    Io {
        id: String,
        #[source]
        source: io::Error,
    },
}

impl ResourceError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            ResourceError::NotFound { id } => format!("Telemetry resource {id} not found"),
            ResourceError::Io { .. } => "Telemetry resource could not be opened".to_string(),
        }
    }
}

/// Opens logical resources as buffered byte streams.
pub trait ResourceOpener {
    /// Opens the resource named `id` for a single forward read.
    ///
    /// # Errors
    ///
    /// - `ResourceError::NotFound` - No resource exists under `id`
    /// - `ResourceError::Io` - The resource exists but could not be opened
    fn open(&self, id: &str) -> Result<Box<dyn BufRead>, ResourceError>;
}

/// Resolves resource identifiers relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileResources {
    root: PathBuf,
}

impl FileResources {
    /// Creates an opener rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a resource id onto a filesystem path below the root.
    ///
    /// Leading slashes are stripped so classpath-style ids stay below the root.
    pub fn resolve_path(&self, id: &str) -> PathBuf {
        self.root.join(id.trim_start_matches('/'))
    }
}

impl ResourceOpener for FileResources {
    fn open(&self, id: &str) -> Result<Box<dyn BufRead>, ResourceError> {
        let path = self.resolve_path(id);
        match File::open(&path) {
            Ok(file) => {
                tracing::debug!(resource = id, path = %path.display(), "Opened resource");
                Ok(Box::new(BufReader::new(file)))
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                tracing::error!(resource = id, path = %path.display(), "Resource not found");
                Err(ResourceError::NotFound { id: id.to_string() })
            }
            Err(source) => Err(ResourceError::Io {
                id: id.to_string(),
                source,
            }),
        }
    }
}

/// In-memory resources keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResources {
    entries: HashMap<String, Vec<u8>>,
}

impl InMemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `contents` under `id`, replacing any previous entry.
    pub fn insert(&mut self, id: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.entries.insert(id.into(), contents.into());
    }

    /// Builder form of [`InMemoryResources::insert`].
    pub fn with(mut self, id: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(id, contents);
        self
    }
}

impl ResourceOpener for InMemoryResources {
    fn open(&self, id: &str) -> Result<Box<dyn BufRead>, ResourceError> {
        self.entries
            .get(id)
            .map(|contents| Box::new(Cursor::new(contents.clone())) as Box<dyn BufRead>)
            .ok_or_else(|| ResourceError::NotFound { id: id.to_string() })
    }
}
