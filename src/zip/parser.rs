//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For reading an entry, read its Local File Header and data
//!
//! Only the tail of the archive is needed to list its contents, so
//! a manifest lookup over HTTP costs a few Range requests.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Result, bail};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// ZIP64 extended information extra field ID
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Low-level ZIP file parser.
///
/// Generic over the reader type to support local files, HTTP sources
/// and in-memory buffers. Usually driven through
/// [`ZipArchive`](super::ZipArchive).
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    /// Create a new parser for the given reader.
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Read exactly `len` bytes at `offset`, failing on truncated sources.
    ///
    /// `len` is checked against the archive size before anything is allocated.
    pub async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        if offset.checked_add(len as u64).is_none_or(|end| end > self.size) {
            bail!("Unexpected end of archive");
        }

        let mut buf = vec![0u8; len];
        let n = self.reader.read_at(offset, &mut buf).await?;
        if n != len {
            bail!("Unexpected end of archive");
        }
        Ok(buf)
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    ///
    /// Returns the EOCD record and its offset in the file. Fails when no
    /// valid EOCD can be found, i.e. the source is not a ZIP archive.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            bail!("Not a valid ZIP file");
        }

        // Optimization: First try the simple case where there's no comment.
        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let buf = self
            .read_exact_at(offset, EndOfCentralDirectory::SIZE)
            .await?;

        // Check for signature and zero-length comment
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        // The EOCD could be earlier if there's a ZIP comment.
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;
        let buf = self.read_exact_at(search_start, search_size as usize).await?;

        // Search backwards for EOCD signature (PK\x05\x06)
        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // The comment length field must match the remaining bytes.
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        bail!("Not a valid ZIP file")
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD has fields saturated to 0xFFFF or
    /// 0xFFFFFFFF.
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The locator sits immediately before the regular EOCD
        let Some(locator_offset) = eocd_offset.checked_sub(Zip64EOCDLocator::SIZE as u64) else {
            bail!("Invalid ZIP64 format");
        };
        let locator_buf = self
            .read_exact_at(locator_offset, Zip64EOCDLocator::SIZE)
            .await?;
        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let eocd64_buf = self
            .read_exact_at(locator.eocd64_offset, Zip64EOCD::MIN_SIZE)
            .await?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// List all entries in the ZIP archive, in central directory order.
    ///
    /// Reads the EOCD first, then fetches and parses the whole Central
    /// Directory in a single read.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        // Get Central Directory info, using ZIP64 if needed
        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset).await?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        if cd_offset.checked_add(cd_size).is_none_or(|end| end > self.size) {
            bail!("Central Directory lies outside the archive");
        }
        if total_entries > cd_size / CDFH_MIN_SIZE as u64 {
            bail!(
                "Central Directory of {} bytes cannot hold {} entries",
                cd_size,
                total_entries
            );
        }

        let cd_data = self.read_exact_at(cd_offset, cd_size as usize).await?;

        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for _ in 0..total_entries {
            entries.push(Self::parse_cdfh(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Parse a Central Directory File Header from a cursor.
    fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
        // Read and verify the signature (PK\x01\x02)
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            bail!("Invalid Central Directory File Header");
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut file_name_bytes = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut file_name_bytes)?;
        // Lossy conversion keeps non-UTF8 names comparable
        let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();

        let extra_field_end = cursor.position() + extra_field_length as u64;

        while cursor.position() + 4 <= extra_field_end {
            let header_id = cursor.read_u16::<LittleEndian>()?;
            let field_size = cursor.read_u16::<LittleEndian>()?;
            let field_end = (cursor.position() + field_size as u64).min(extra_field_end);

            if header_id == ZIP64_EXTRA_ID {
                // Values are present only for header fields saturated to 0xFFFFFFFF
                if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    uncompressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    compressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    lfh_offset = cursor.read_u64::<LittleEndian>()?;
                }
            }

            cursor.set_position(field_end);
        }

        // Skip trailing padding and the file comment
        cursor.set_position(extra_field_end + file_comment_length as u64);
        if cursor.position() > cursor.get_ref().len() as u64 {
            bail!("Truncated Central Directory File Header");
        }

        Ok(ZipFileEntry {
            file_name,
            flags,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
        })
    }

    /// Total size of the archive in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header has variable-length fields that may differ
    /// from the Central Directory entry, so it has to be read to know
    /// where the entry data begins.
    pub async fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let lfh_buf = self.read_exact_at(entry.lfh_offset, LFH_SIZE).await?;

        // Verify LFH signature (PK\x03\x04)
        if &lfh_buf[0..4] != LFH_SIGNATURE {
            bail!("Invalid Local File Header");
        }

        let mut cursor = Cursor::new(&lfh_buf);
        cursor.set_position(26); // Offset to filename length field

        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        // Data starts after: LFH (30 bytes) + filename + extra field
        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;

    fn parser(data: Vec<u8>) -> ZipParser<MemoryReader> {
        ZipParser::new(Arc::new(MemoryReader::new(data)))
    }

    fn empty_eocd(comment: &[u8]) -> Vec<u8> {
        let mut data = EndOfCentralDirectory::SIGNATURE.to_vec();
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        data.extend_from_slice(comment);
        data
    }

    #[tokio::test]
    async fn finds_eocd_without_comment() {
        let (eocd, offset) = parser(empty_eocd(b"")).find_eocd().await.unwrap();
        assert_eq!(offset, 0);
        assert_eq!(eocd.total_entries, 0);
    }

    #[tokio::test]
    async fn finds_eocd_behind_comment() {
        let mut data = b"junk".to_vec();
        data.extend(empty_eocd(b"archive comment"));

        let (eocd, offset) = parser(data).find_eocd().await.unwrap();
        assert_eq!(offset, 4);
        assert_eq!(eocd.comment_len, 15);
    }

    #[tokio::test]
    async fn lists_nothing_in_empty_archive() {
        let entries = parser(empty_eocd(b"")).list_files().await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn rejects_non_zip_data() {
        assert!(parser(b"definitely not a zip".to_vec()).find_eocd().await.is_err());
        assert!(parser(vec![0u8; 4096]).find_eocd().await.is_err());
    }

    #[tokio::test]
    async fn oversized_read_fails_without_allocating() {
        let parser = parser(vec![0u8; 64]);
        assert!(parser.read_exact_at(0, usize::MAX).await.is_err());
        assert!(parser.read_exact_at(u64::MAX, 2).await.is_err());
        assert!(parser.read_exact_at(60, 8).await.is_err());
        assert_eq!(parser.read_exact_at(60, 4).await.unwrap().len(), 4);
        assert!(parser.read_exact_at(1 << 40, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_directory_outside_archive() {
        let mut data = EndOfCentralDirectory::SIGNATURE.to_vec();
        data.extend_from_slice(&[0, 0, 0, 0, 1, 0, 1, 0]);
        data.extend_from_slice(&46u32.to_le_bytes());
        data.extend_from_slice(&1000u32.to_le_bytes());
        data.extend_from_slice(&[0, 0]);

        assert!(parser(data).list_files().await.is_err());
    }
}
