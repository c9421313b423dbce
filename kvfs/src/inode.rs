use zerocopy::{AsBytes, FromBytes};

use crate::id::ObjectId;
use crate::store::Record;

/// File type mask and type bits within `mode`, matching `sys/stat.h`.
pub const S_IFMT: u32 = 0o170_000;
pub const S_IFDIR: u32 = 0o040_000;
pub const S_IFREG: u32 = 0o100_000;

/// Fixed-size metadata record describing one file or directory.
///
/// This structure is the persisted image; every field is written back to
/// the store before a mutation is considered committed. The type bits in
/// `mode` are set at creation and never change afterwards.
#[repr(C)]
#[derive(AsBytes, FromBytes, Copy, Clone)]
pub struct Inode {
    /// The id of the owning user.
    pub uid: u32,
    /// The id of the owning group.
    pub gid: u32,
    /// Type and permission bits.
    pub mode: u32,
    /// Link count: conventionally 2 for directories, 1 for files.
    pub nlink: u32,
    /// Logical size in bytes. Always zero for directories.
    pub size: u64,
    /// Time of last modification, seconds since the epoch.
    pub mtime: i64,
    /// Time of last metadata change, seconds since the epoch.
    pub ctime: i64,
    /// For a directory, its directory block; for a regular file, its data
    /// block. Absent until first use.
    pub data: ObjectId,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    Regular,
}

impl Inode {
    pub fn new_file(mode: u32, uid: u32, gid: u32, now: i64) -> Self {
        Inode {
            uid,
            gid,
            mode: (mode & !S_IFMT) | S_IFREG,
            nlink: 1,
            size: 0,
            mtime: now,
            ctime: now,
            data: ObjectId::NIL,
        }
    }

    pub fn new_dir(mode: u32, uid: u32, gid: u32, now: i64) -> Self {
        Inode {
            uid,
            gid,
            mode: (mode & !S_IFMT) | S_IFDIR,
            nlink: 2,
            size: 0,
            mtime: now,
            ctime: now,
            data: ObjectId::NIL,
        }
    }

    pub fn kind(&self) -> FileKind {
        if self.mode & S_IFMT == S_IFDIR {
            FileKind::Directory
        } else {
            FileKind::Regular
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == FileKind::Directory
    }

    /// Replaces the permission bits, keeping the immutable type bits.
    pub fn set_perm(&mut self, mode: u32) {
        self.mode = (self.mode & S_IFMT) | (mode & !S_IFMT);
    }
}

impl Record for Inode {
    fn zeroed() -> Self {
        Inode {
            uid: 0,
            gid: 0,
            mode: 0,
            nlink: 0,
            size: 0,
            mtime: 0,
            ctime: 0,
            data: ObjectId::NIL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_sets_type_bits_and_link_count() {
        let file = Inode::new_file(0o644, 10, 20, 99);
        assert_eq!(file.kind(), FileKind::Regular);
        assert_eq!(file.mode, S_IFREG | 0o644);
        assert_eq!(file.nlink, 1);
        assert_eq!(file.size, 0);
        assert!(file.data.is_nil());

        let dir = Inode::new_dir(0o755, 10, 20, 99);
        assert!(dir.is_dir());
        assert_eq!(dir.nlink, 2);
    }

    #[test]
    fn set_perm_preserves_type() {
        let mut dir = Inode::new_dir(0o755, 0, 0, 0);
        dir.set_perm(0o700);
        assert!(dir.is_dir());
        assert_eq!(dir.mode, S_IFDIR | 0o700);

        // A sneaky attempt to flip the type bits through chmod is ignored.
        dir.set_perm(S_IFREG | 0o644);
        assert!(dir.is_dir());
        assert_eq!(dir.mode, S_IFDIR | 0o644);
    }

    #[test]
    fn record_size_is_fixed() {
        assert_eq!(Inode::SIZE, 56);
    }
}
