//! Manifest lookup inside ZIP archives.
//!
//! [`locate_file`] decides which entry is the authoritative manifest;
//! [`ManifestReader`] opens an archive from a path, URL or buffer, runs the
//! lookup and returns the content of the winning entry.

mod error;
pub mod locator;

pub use error::ManifestError;
pub use locator::{Location, locate_file};

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::io::{HttpOptions, HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
use crate::zip::ZipArchive;

/// Default manifest file name
pub const COMPOSER_JSON: &str = "composer.json";

/// Directory listing of an opened archive, as needed by [`locate_file`].
#[async_trait]
pub trait ArchiveIndex: Send + Sync {
    /// Number of entries in the archive
    fn entry_count(&self) -> usize;

    /// Full path of the entry at `index`
    fn name_at(&self, index: usize) -> Option<&str>;

    /// Index of the first entry named exactly `name`
    fn locate_name(&self, name: &str) -> Option<usize>;

    /// Full, decompressed content of the entry at `index`
    async fn read_index(&self, index: usize) -> Result<Vec<u8>>;
}

/// Reads a manifest out of ZIP archives.
///
/// Archives that cannot be opened, are empty, or have no manifest under the
/// accepted layouts all yield `Ok(None)`.
#[derive(Debug, Clone)]
pub struct ManifestReader {
    file_name: String,
    http: HttpOptions,
}

impl Default for ManifestReader {
    fn default() -> Self {
        Self::new(COMPOSER_JSON)
    }
}

impl ManifestReader {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            http: HttpOptions::default(),
        }
    }

    /// Use these options when reading from a URL
    pub fn with_http_options(mut self, http: HttpOptions) -> Self {
        self.http = http;
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Read the manifest of a ZIP file on disk.
    #[instrument(level = "debug", skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn read_path(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Option<Vec<u8>>, ManifestError> {
        let reader = match LocalFileReader::new(path.as_ref()) {
            Ok(reader) => reader,
            Err(err) => {
                debug!(error = %err, "cannot open archive");
                return Ok(None);
            }
        };
        self.read_from(Arc::new(reader)).await
    }

    /// Read the manifest of a remote ZIP file using HTTP Range requests.
    #[instrument(level = "debug", skip(self))]
    pub async fn read_url(&self, url: &str) -> Result<Option<Vec<u8>>, ManifestError> {
        let reader = match HttpRangeReader::with_options(url.to_owned(), self.http).await {
            Ok(reader) => reader,
            Err(err) => {
                debug!(error = %err, "cannot open remote archive");
                return Ok(None);
            }
        };
        let reader = Arc::new(reader);
        let result = self.read_from(reader.clone()).await;
        debug!(transferred = reader.transferred_bytes(), "remote lookup done");
        result
    }

    /// Read the manifest of a ZIP archive held in memory.
    pub async fn read_bytes(
        &self,
        data: impl Into<Vec<u8>>,
    ) -> Result<Option<Vec<u8>>, ManifestError> {
        self.read_from(Arc::new(MemoryReader::new(data))).await
    }

    /// Read the manifest of a ZIP archive from any random access source.
    pub async fn read_from<R: ReadAt>(
        &self,
        reader: Arc<R>,
    ) -> Result<Option<Vec<u8>>, ManifestError> {
        let archive = match ZipArchive::open(reader).await {
            Ok(archive) => archive,
            Err(err) => {
                debug!(error = %err, "not a readable zip archive");
                return Ok(None);
            }
        };
        self.read_archive(&archive).await
    }

    /// Run the lookup against an already opened archive.
    pub async fn read_archive<A>(&self, archive: &A) -> Result<Option<Vec<u8>>, ManifestError>
    where
        A: ArchiveIndex + ?Sized,
    {
        if archive.entry_count() == 0 {
            debug!("archive is empty");
            return Ok(None);
        }

        match locate_file(archive, &self.file_name).await {
            Location::Found { index, content } => {
                debug!(index, entry = ?archive.name_at(index), "manifest found");
                Ok(Some(content))
            }
            Location::NotFound => {
                debug!(file_name = %self.file_name, "no manifest found");
                Ok(None)
            }
            Location::Ambiguous => Err(ManifestError::Ambiguous {
                file_name: self.file_name.clone(),
            }),
        }
    }
}

/// Content of the root `composer.json` inside the ZIP file at `path`.
///
/// Returns `Ok(None)` when the file cannot be opened as a ZIP archive or no
/// `composer.json` is found, and [`ManifestError::Ambiguous`] when several
/// candidates exist.
pub async fn get_composer_json(path: impl AsRef<Path>) -> Result<Option<Vec<u8>>, ManifestError> {
    ManifestReader::default().read_path(path).await
}
