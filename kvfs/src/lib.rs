//! A hierarchical filesystem whose durable state lives in a key-value
//! store.
//!
//! Every persistent object is one fixed-size record under one key:
//! inodes, directory blocks, indirect extension blocks and file data
//! blocks. The root inode sits at a well-known key; every other record is
//! named by a generated 128-bit identifier. [`KvFs`] resolves absolute
//! paths over that record graph and exposes the usual operations
//! (`getattr`, `readdir`, `create`, `mkdir`, `read`, `write`, `truncate`,
//! `unlink`, `rmdir` and the metadata setters), each failing with an
//! [`FsError`] that maps onto a single POSIX errno.
//!
//! ```
//! use kvfs::{Credentials, KvFs, MemoryStore};
//!
//! # fn main() -> kvfs::Result<()> {
//! let mut fs = KvFs::mount(MemoryStore::new(), Credentials { uid: 0, gid: 0 })?;
//! fs.mkdir("/docs", 0o755)?;
//! fs.create("/docs/hello", 0o644)?;
//! fs.write("/docs/hello", b"hi there")?;
//! assert_eq!(fs.read("/docs/hello", 0, 1024)?, b"hi there");
//! # Ok(())
//! # }
//! ```

mod alloc;
mod data;
mod dir;
mod error;
mod fs;
mod id;
mod inode;
mod path;
mod store;

pub use crate::error::{FsError, Result};
pub use crate::fs::{Attr, Credentials, KvFs};
pub use crate::id::{ObjectId, ID_SIZE};
pub use crate::inode::{FileKind, S_IFDIR, S_IFMT, S_IFREG};
pub use crate::store::{KeyValueStore, MemoryStore};

/// Key of the root directory's inode record.
pub const ROOT_KEY: &[u8] = b"root";

/// Entry slots embedded directly in a directory block.
pub const DIRECT_SLOTS: usize = 16;

/// Entry slots in the single indirect extension block.
pub const INDIRECT_SLOTS: usize = 32;

/// Capacity of a file's data block, and so the largest file size.
pub const MAX_FILE_SIZE: usize = 1024;

/// Entry names must be strictly shorter than this, leaving room for the
/// NUL padding in the on-store layout.
pub const NAME_LIMIT: usize = 64;
