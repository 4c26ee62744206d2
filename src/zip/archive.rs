use async_trait::async_trait;
use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

use crate::io::ReadAt;
use crate::manifest::ArchiveIndex;
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// An opened ZIP archive: the parsed central directory plus random access
/// to entry data.
///
/// Dropping the archive releases the underlying reader.
pub struct ZipArchive<R: ReadAt> {
    parser: ZipParser<R>,
    entries: Vec<ZipFileEntry>,
    /// First index carrying each name
    names: HashMap<String, usize>,
}

impl<R: ReadAt> ZipArchive<R> {
    /// Open an archive by reading its central directory.
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let entries = parser.list_files().await?;

        let mut names = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            names.entry(entry.file_name.clone()).or_insert(index);
        }

        debug!(entries = entries.len(), "opened zip archive");

        Ok(Self {
            parser,
            entries,
            names,
        })
    }

    /// All entries, in central directory order
    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    /// Read and decompress the entry at `index`, verifying size and CRC-32.
    pub async fn read_entry(&self, index: usize) -> Result<Vec<u8>> {
        let Some(entry) = self.entries.get(index) else {
            bail!("No entry at index {}", index);
        };

        if entry.is_encrypted() {
            bail!("Encrypted entry: {}", entry.file_name);
        }

        if entry.compressed_size > self.parser.size() {
            bail!(
                "Entry {} claims {} compressed bytes in a {} byte archive",
                entry.file_name,
                entry.compressed_size,
                self.parser.size()
            );
        }

        let data_offset = self.parser.get_data_offset(entry).await?;
        let compressed_size =
            usize::try_from(entry.compressed_size).context("Entry too large to read")?;
        let raw = self.parser.read_exact_at(data_offset, compressed_size).await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                // One extra byte detects entries inflating past their declared size
                let mut data = Vec::new();
                DeflateDecoder::new(raw.as_slice())
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut data)
                    .with_context(|| format!("Corrupt deflate stream: {}", entry.file_name))?;
                data
            }
            CompressionMethod::Unknown(method) => {
                bail!(
                    "Unsupported compression method {} for {}",
                    method,
                    entry.file_name
                );
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "Size mismatch for {}: expected {} bytes, got {}",
                entry.file_name,
                entry.uncompressed_size,
                data.len()
            );
        }

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!("CRC-32 mismatch for {}", entry.file_name);
        }

        Ok(data)
    }
}

#[async_trait]
impl<R: ReadAt> ArchiveIndex for ZipArchive<R> {
    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn name_at(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.file_name.as_str())
    }

    fn locate_name(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    async fn read_index(&self, index: usize) -> Result<Vec<u8>> {
        self.read_entry(index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use std::io::{Cursor, Write};
    use ::zip::CompressionMethod as Method;
    use ::zip::write::SimpleFileOptions;

    fn build(files: &[(&str, &[u8], Method)]) -> Vec<u8> {
        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content, method) in files {
            let options = SimpleFileOptions::default().compression_method(*method);
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    async fn open(data: Vec<u8>) -> ZipArchive<MemoryReader> {
        ZipArchive::open(Arc::new(MemoryReader::new(data)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reads_stored_and_deflated_entries() {
        let text = b"{\"name\": \"vendor/package\"}\n".repeat(20);
        let data = build(&[
            ("stored.json", b"plain".as_slice(), Method::Stored),
            ("pkg/deflated.json", text.as_slice(), Method::Deflated),
        ]);

        let archive = open(data).await;
        assert_eq!(archive.entry_count(), 2);
        assert_eq!(archive.name_at(1), Some("pkg/deflated.json"));
        assert_eq!(archive.entries()[1].compression_method, CompressionMethod::Deflate);
        assert_eq!(archive.read_entry(0).await.unwrap(), b"plain");
        assert_eq!(archive.read_entry(1).await.unwrap(), text);
    }

    #[tokio::test]
    async fn locates_names_exactly() {
        let data = build(&[
            ("pkg/composer.json", b"{}".as_slice(), Method::Stored),
            ("composer.json", b"{}".as_slice(), Method::Stored),
        ]);

        let archive = open(data).await;
        assert_eq!(archive.locate_name("composer.json"), Some(1));
        assert_eq!(archive.locate_name("pkg/composer.json"), Some(0));
        assert_eq!(archive.locate_name("Composer.json"), None);
        assert_eq!(archive.locate_name("pkg"), None);
    }

    #[tokio::test]
    async fn corrupted_data_fails_crc_check() {
        let mut data = build(&[("composer.json", b"hello world".as_slice(), Method::Stored)]);
        let position = data
            .windows(11)
            .position(|w| w == b"hello world")
            .unwrap();
        data[position] = b'j';

        let archive = open(data).await;
        let err = archive.read_entry(0).await.unwrap_err();
        assert!(err.to_string().contains("CRC-32"));
    }

    #[tokio::test]
    async fn out_of_range_index_is_an_error() {
        let archive = open(build(&[("a.txt", b"a".as_slice(), Method::Stored)])).await;
        assert!(archive.read_entry(1).await.is_err());
        assert_eq!(archive.name_at(1), None);
    }
}
