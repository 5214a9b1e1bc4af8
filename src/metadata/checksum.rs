//! MD5 checksums over in-memory buffers and chunked streams.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Size of the chunks pulled from a stream while hashing.
pub const CHUNK_SIZE: usize = 8192;

/// A source that hands out its bytes in bounded chunks.
///
/// `read` returns at most `max_bytes` bytes; an empty chunk signals the end
/// of the stream.
pub trait ReadableStream {
    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>>;
}

/// Disk-backed stream.
pub struct FileStream {
    file: File,
}

impl FileStream {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl ReadableStream for FileStream {
    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; max_bytes];
        loop {
            match self.file.read(&mut buf) {
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(buf);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// In-memory stream over a borrowed buffer.
pub struct MemoryStream<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> MemoryStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }
}

impl ReadableStream for MemoryStream<'_> {
    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let end = self.data.len().min(self.position + max_bytes);
        let chunk = self.data[self.position..end].to_vec();
        self.position = end;
        Ok(chunk)
    }
}

/// Result of hashing a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDigest {
    /// Lowercase hex MD5 digest.
    pub hex: String,
    /// Number of bytes consumed.
    pub bytes_read: u64,
}

/// Hashes `stream` to its end in `CHUNK_SIZE` chunks.
///
/// The caller owns the stream and any cleanup of its backing resource.
pub fn compute_md5(stream: &mut dyn ReadableStream) -> io::Result<StreamDigest> {
    let mut context = md5::Context::new();
    let mut bytes_read = 0u64;
    loop {
        let chunk = stream.read(CHUNK_SIZE)?;
        if chunk.is_empty() {
            break;
        }
        bytes_read += chunk.len() as u64;
        context.consume(&chunk);
    }
    Ok(StreamDigest {
        hex: format!("{:x}", context.finalize()),
        bytes_read,
    })
}

/// Hex MD5 of a whole buffer.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Hex MD5 of a file on disk, streamed.
pub fn file_md5(path: impl AsRef<Path>) -> io::Result<StreamDigest> {
    let mut stream = FileStream::open(path)?;
    compute_md5(&mut stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_known_digest() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"hello world"), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_stream_and_buffer_paths_agree() {
        // Spans several chunks with a ragged tail.
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();

        let mut memory = MemoryStream::new(&data);
        let from_memory = compute_md5(&mut memory).expect("memory stream hashes");

        let mut temp = tempfile::NamedTempFile::new().expect("temp file");
        temp.write_all(&data).expect("write temp file");
        temp.flush().expect("flush temp file");
        let from_file = file_md5(temp.path()).expect("file stream hashes");

        let whole = md5_hex(&data);
        assert_eq!(from_memory.hex, whole);
        assert_eq!(from_file.hex, whole);
        assert_eq!(from_memory.bytes_read, data.len() as u64);
        assert_eq!(from_file.bytes_read, data.len() as u64);
    }

    #[test]
    fn test_hashing_twice_is_stable() {
        let data = b"the same bytes twice";
        let first = compute_md5(&mut MemoryStream::new(data)).expect("hash");
        let second = compute_md5(&mut MemoryStream::new(data)).expect("hash");
        assert_eq!(first, second);
    }

    #[test]
    fn test_memory_stream_respects_max_bytes() {
        let data = [1u8; 10];
        let mut stream = MemoryStream::new(&data);
        assert_eq!(stream.read(4).expect("read").len(), 4);
        assert_eq!(stream.read(4).expect("read").len(), 4);
        assert_eq!(stream.read(4).expect("read").len(), 2);
        assert!(stream.read(4).expect("read").is_empty());
    }
}
