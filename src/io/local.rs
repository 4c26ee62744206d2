use super::ReadAt;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Local file reader with random access support
pub struct LocalFileReader {
    file: std::fs::File,
    size: u64,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            anyhow::bail!("Not a regular file: {}", path.display());
        }
        Ok(Self {
            file,
            size: metadata.len(),
        })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;

        while filled < buf.len() {
            let position = offset + filled as u64;

            #[cfg(unix)]
            let n = {
                use std::os::unix::fs::FileExt;
                self.file.read_at(&mut buf[filled..], position)?
            };

            #[cfg(windows)]
            let n = {
                use std::os::windows::fs::FileExt;
                self.file.seek_read(&mut buf[filled..], position)?
            };

            #[cfg(not(any(unix, windows)))]
            let n = {
                use std::io::{Read, Seek, SeekFrom};
                let mut file = &self.file;
                file.seek(SeekFrom::Start(position))?;
                file.read(&mut buf[filled..])?
            };

            if n == 0 {
                break;
            }
            filled += n;
        }

        Ok(filled)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
