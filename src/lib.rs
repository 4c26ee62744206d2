//! # zip-manifest
//!
//! Locate and read the root `composer.json` of a ZIP archive without
//! extracting it.
//!
//! Package archives conventionally hold their manifest either at the
//! archive root or inside exactly one wrapping directory. This library
//! finds that manifest, refuses to guess when several candidates compete,
//! and reports archives of any other shape as having no manifest.
//!
//! Archives can be read from the local filesystem, from memory, or from
//! HTTP servers using Range requests, in which case only the central
//! directory and the manifest entry are downloaded.
//!
//! ## Example
//!
//! ```no_run
//! use zip_manifest::{ManifestError, get_composer_json};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     match get_composer_json("vendor-package-1.0.0.zip").await {
//!         Ok(Some(content)) => println!("{}", String::from_utf8_lossy(&content)),
//!         Ok(None) => println!("no composer.json"),
//!         Err(ManifestError::Ambiguous { .. }) => eprintln!("archive has several composer.json"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod io;
pub mod manifest;
pub mod zip;

pub use self::cli::Cli;
pub use self::io::{HttpOptions, HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use self::manifest::{
    ArchiveIndex, COMPOSER_JSON, Location, ManifestError, ManifestReader, get_composer_json,
    locate_file,
};
pub use self::zip::{ZipArchive, ZipFileEntry};
