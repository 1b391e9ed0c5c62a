//! Uploaded file parts.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;

/// Where an uploaded part's content lives.
#[derive(Debug, Clone)]
pub enum Storage {
    /// Held in memory.
    Memory(Bytes),
    /// Spilled to a temporary file that is removed when the request ends.
    Disk(PathBuf),
}

impl Default for Storage {
    fn default() -> Self {
        Self::Memory(Bytes::new())
    }
}

/// Metadata and content of one uploaded file part.
///
/// `Upload::default()` is the zero value bound when a request carries no file
/// under the requested name.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    field: String,
    file_name: String,
    content_type: Option<String>,
    size: u64,
    storage: Storage,
}

impl Upload {
    /// Creates an upload description.
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        size: u64,
        storage: Storage,
    ) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content_type,
            size,
            storage,
        }
    }

    /// Creates an in-memory upload.
    pub fn in_memory(field: impl Into<String>, file_name: impl Into<String>, data: Bytes) -> Self {
        let size = data.len() as u64;
        Self::new(field, file_name, None, size, Storage::Memory(data))
    }

    /// Returns the form field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the client-supplied file name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the part's content type, if sent.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the content size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns where the content is stored.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Returns the on-disk path for spilled uploads.
    pub fn path(&self) -> Option<&Path> {
        match &self.storage {
            Storage::Disk(path) => Some(path),
            Storage::Memory(_) => None,
        }
    }

    /// Reads the full content.
    pub fn bytes(&self) -> io::Result<Bytes> {
        match &self.storage {
            Storage::Memory(data) => Ok(data.clone()),
            Storage::Disk(path) => std::fs::read(path).map(Bytes::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_in_memory_upload() {
        let upload = Upload::in_memory("avatar", "me.png", Bytes::from_static(b"png"));
        assert_eq!(upload.size(), 3);
        assert!(upload.path().is_none());
        assert_eq!(upload.bytes().unwrap().as_ref(), b"png");
    }

    #[test]
    fn test_disk_upload_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"spilled").unwrap();
        let upload = Upload::new(
            "doc",
            "doc.txt",
            Some("text/plain".into()),
            7,
            Storage::Disk(file.path().to_path_buf()),
        );
        assert_eq!(upload.bytes().unwrap().as_ref(), b"spilled");
        assert_eq!(upload.content_type(), Some("text/plain"));
    }
}
