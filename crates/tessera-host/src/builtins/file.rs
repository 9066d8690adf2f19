//! Local file access with a stream interface.

use std::any::Any;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tessera_core::component::{CapabilitySet, Component, ComponentBox, ComponentHeader};
use tessera_core::ids::CLID_FILE;
use tessera_core::stream::{ByteOrder, Stream, StreamError};

/// Open mode for [`FileObj::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Read-only; the file must exist.
    Read,
    /// Write-only; created or truncated.
    Write,
    /// Read and write; created when missing.
    ReadWrite,
}

/// A local file exposed through the stream interface. Unopened
/// instances behave as empty read-only streams.
pub struct FileObj {
    header: ComponentHeader,
    file: Option<File>,
    writable: bool,
    offset: u64,
    size: u64,
    order: ByteOrder,
}

impl FileObj {
    /// Creates a closed instance.
    pub fn new() -> Self {
        FileObj {
            header: ComponentHeader::new(CLID_FILE),
            file: None,
            writable: false,
            offset: 0,
            size: 0,
            order: ByteOrder::default(),
        }
    }

    /// Opens `path` in `mode`, replacing any previously open file.
    pub fn open(&mut self, path: impl AsRef<Path>, mode: FileMode) -> Result<(), StreamError> {
        self.close();
        let file = match mode {
            FileMode::Read => OpenOptions::new().read(true).open(path)?,
            FileMode::Write => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
            FileMode::ReadWrite => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)?,
        };
        self.size = file.metadata()?.len();
        self.offset = 0;
        self.writable = !matches!(mode, FileMode::Read);
        self.file = Some(file);
        Ok(())
    }

    /// True while a file is open.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl Default for FileObj {
    fn default() -> Self {
        Self::new()
    }
}

impl Stream for FileObj {
    fn byte_order(&self) -> ByteOrder {
        self.order
    }

    fn set_byte_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn set_offset(&mut self, offset: u64) -> Result<(), StreamError> {
        if offset > self.size {
            return Err(StreamError::InvalidSeek {
                offset,
                size: self.size,
            });
        }
        if let Some(file) = self.file.as_mut() {
            file.seek(SeekFrom::Start(offset))?;
        }
        self.offset = offset;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        match self.file.as_mut() {
            Some(file) => {
                let n = file.read(buf)?;
                self.offset += n as u64;
                Ok(n)
            }
            None => Ok(0),
        }
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<(), StreamError> {
        if !self.writable {
            return Err(StreamError::NotWritable);
        }
        match self.file.as_mut() {
            Some(file) => {
                file.write_all(buf)?;
                self.offset += buf.len() as u64;
                self.size = self.size.max(self.offset);
                Ok(())
            }
            None => Err(StreamError::NotWritable),
        }
    }

    fn close(&mut self) {
        self.file = None;
        self.writable = false;
        self.offset = 0;
        self.size = 0;
    }
}

impl Component for FileObj {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn class_name(&self) -> &str {
        "File"
    }

    fn parent_class_name(&self) -> Option<&str> {
        Some("Object")
    }

    fn spawn(&self) -> ComponentBox {
        let mut obj = FileObj::new();
        obj.header.set_class_id(self.header.class_id());
        Box::new(obj)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::STREAM
    }

    fn finalize(&mut self, _host: &dyn tessera_core::host::HostApi) {
        Stream::close(self);
    }

    fn as_stream(&mut self) -> Option<&mut dyn Stream> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");

        let mut file = FileObj::new();
        file.open(&path, FileMode::Write).unwrap();
        file.write_i32(1234).unwrap();
        file.write_len_string("payload").unwrap();
        Stream::close(&mut file);

        file.open(&path, FileMode::Read).unwrap();
        assert_eq!(file.size(), 4 + 4 + 7);
        assert_eq!(file.read_i32().unwrap(), 1234);
        assert_eq!(file.read_len_string(64).unwrap(), "payload");
        assert!(file.eof());
    }

    #[test]
    fn test_read_only_refuses_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.bin");
        std::fs::write(&path, b"x").unwrap();

        let mut file = FileObj::new();
        file.open(&path, FileMode::Read).unwrap();
        assert!(matches!(
            file.write_bytes(b"y"),
            Err(StreamError::NotWritable)
        ));
    }

    #[test]
    fn test_closed_instance_is_empty_stream() {
        let mut file = FileObj::new();
        assert!(!file.is_open());
        assert_eq!(file.size(), 0);
        assert!(file.eof());
        let mut buf = [0u8; 4];
        assert_eq!(file.read_bytes(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_seek_within_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seek.bin");

        let mut file = FileObj::new();
        file.open(&path, FileMode::ReadWrite).unwrap();
        file.write_bytes(&[0, 1, 2, 3]).unwrap();
        file.set_offset(2).unwrap();
        assert_eq!(file.read_u8().unwrap(), 2);
        assert!(file.set_offset(99).is_err());
    }
}
