//! The byte-stream contract consumed by the engine, plus the two stock implementations.

use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};

/// A read-only, addressable byte source.
///
/// The engine never writes to a stream and never assumes it is buffered in memory.
/// `read` is only called for ranges `is_available` accepted; a failing read is an I/O
/// error, not a parse failure.
pub trait ByteStream: fmt::Debug {
    fn is_available(&self, offset: &BigInt, length: &BigInt) -> bool;
    fn read(&self, offset: &BigInt, length: &BigInt) -> io::Result<Vec<u8>>;
}

/// Returns `(offset, end)` as native indices when the range is non-negative and ends
/// no later than `size`.
pub(crate) fn checked_range(offset: &BigInt, length: &BigInt, size: u64) -> Option<(u64, u64)> {
    if offset.is_negative() || length.is_negative() {
        return None;
    }
    let start = offset.to_u64()?;
    let end = start.checked_add(length.to_u64()?)?;
    (end <= size).then_some((start, end))
}

fn out_of_range(offset: &BigInt, length: &BigInt) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("range of {length} bytes at offset {offset} is not available"),
    )
}

// ============================================================================
// IN-MEMORY STREAM
// ============================================================================

#[derive(Clone, Default)]
pub struct InMemoryByteStream {
    data: Vec<u8>,
}

impl InMemoryByteStream {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for InMemoryByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InMemoryByteStream({} bytes)", self.data.len())
    }
}

impl ByteStream for InMemoryByteStream {
    fn is_available(&self, offset: &BigInt, length: &BigInt) -> bool {
        checked_range(offset, length, self.data.len() as u64).is_some()
    }

    fn read(&self, offset: &BigInt, length: &BigInt) -> io::Result<Vec<u8>> {
        let (start, end) = checked_range(offset, length, self.data.len() as u64)
            .ok_or_else(|| out_of_range(offset, length))?;
        Ok(self.data[start as usize..end as usize].to_vec())
    }
}

// ============================================================================
// FILE STREAM
// ============================================================================

/// Reads lazily from a file; only the requested ranges are ever loaded.
pub struct FileByteStream {
    name: String,
    file: RefCell<File>,
    size: u64,
}

impl FileByteStream {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            name: path.display().to_string(),
            file: RefCell::new(file),
            size,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl fmt::Debug for FileByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileByteStream({}, {} bytes)", self.name, self.size)
    }
}

impl ByteStream for FileByteStream {
    fn is_available(&self, offset: &BigInt, length: &BigInt) -> bool {
        checked_range(offset, length, self.size).is_some()
    }

    fn read(&self, offset: &BigInt, length: &BigInt) -> io::Result<Vec<u8>> {
        let (start, end) =
            checked_range(offset, length, self.size).ok_or_else(|| out_of_range(offset, length))?;
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(start))?;
        let mut buffer = vec![0u8; (end - start) as usize];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}
