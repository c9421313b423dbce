//! File content storage.
//!
//! Each regular file owns at most one [`DataBlock`]: a fixed-capacity byte
//! buffer plus its occupied length. Writes replace the whole content;
//! there are no extents and no multi-block files. Bytes past `len` keep
//! whatever was written before, so growing a file through truncate exposes
//! them rather than zero-filling, a documented deviation from POSIX
//! sparse-file semantics.

use zerocopy::{AsBytes, FromBytes};

use crate::store::Record;
use crate::MAX_FILE_SIZE;

#[repr(C)]
#[derive(AsBytes, FromBytes, Copy, Clone)]
pub struct DataBlock {
    len: u32,
    bytes: [u8; MAX_FILE_SIZE],
}

impl DataBlock {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Replaces the content. The caller has already checked the capacity;
    /// stale bytes beyond the new length stay in the buffer.
    pub fn replace(&mut self, content: &[u8]) {
        debug_assert!(content.len() <= MAX_FILE_SIZE);
        self.bytes[..content.len()].copy_from_slice(content);
        self.len = content.len() as u32;
    }

    /// Moves the occupied length without touching the buffer.
    pub fn set_len(&mut self, len: usize) {
        debug_assert!(len < MAX_FILE_SIZE);
        self.len = len as u32;
    }

    /// Reads up to `size` bytes at `offset`, clamped to the given logical
    /// size (the inode's recorded size, which the block length tracks).
    pub fn read(&self, offset: usize, size: usize, logical: usize) -> &[u8] {
        let logical = logical.min(MAX_FILE_SIZE);
        if offset >= logical {
            return &[];
        }
        let end = logical.min(offset.saturating_add(size));
        &self.bytes[offset..end]
    }
}

impl Record for DataBlock {
    fn zeroed() -> Self {
        DataBlock {
            len: 0,
            bytes: [0; MAX_FILE_SIZE],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_then_read_back() {
        let mut block = DataBlock::zeroed();
        block.replace(b"hello world");
        assert_eq!(block.len(), 11);
        assert_eq!(block.read(0, 11, block.len()), b"hello world");
        assert_eq!(block.read(6, 100, block.len()), b"world");
    }

    #[test]
    fn read_past_logical_size_is_empty() {
        let mut block = DataBlock::zeroed();
        block.replace(b"abc");
        assert_eq!(block.read(3, 1, 3), b"");
        assert_eq!(block.read(100, 1, 3), b"");
    }

    #[test]
    fn shrink_then_grow_exposes_stale_bytes() {
        let mut block = DataBlock::zeroed();
        block.replace(b"hello world");
        block.set_len(5);
        assert_eq!(block.read(0, 100, block.len()), b"hello");

        block.set_len(11);
        assert_eq!(block.read(0, 100, block.len()), b"hello world");
    }

    #[test]
    fn record_size_is_capacity_plus_header() {
        assert_eq!(DataBlock::SIZE, MAX_FILE_SIZE + 4);
    }
}
