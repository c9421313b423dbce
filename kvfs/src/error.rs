use thiserror::Error;

/// Unified error type for all filesystem operations.
///
/// Every variant maps to exactly one POSIX errno via [`FsError::to_errno`];
/// the mapping has no wildcard arm, so adding a variant without assigning an
/// errno is a compile error. None of these conditions are transient and none
/// are retried.
#[derive(Debug, Error)]
pub enum FsError {
    /// A path component or named object does not exist.
    #[error("no such file or directory")]
    NotFound,

    /// An intermediate path component resolved to a regular file.
    #[error("not a directory")]
    NotADirectory,

    /// A file operation was attempted on a directory.
    #[error("is a directory")]
    IsADirectory,

    /// The parent directory already holds an entry with this name.
    #[error("file exists")]
    AlreadyExists,

    /// A path component reached the compile-time component limit.
    #[error("name too long")]
    NameTooLong,

    /// A write or truncate exceeded the data block capacity.
    #[error("file too large")]
    TooLarge,

    /// Both the direct array and the indirect block are full.
    #[error("no space left in directory")]
    NoSpace,

    /// rmdir on a directory that still has children.
    #[error("directory not empty")]
    NotEmpty,

    /// The path is not absolute, or names the root where a child is required.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A backend object exists but violates a layout invariant, most
    /// commonly a blob whose size differs from the fixed record size.
    #[error("corrupt record: {0}")]
    Corruption(String),

    /// The backend store itself failed.
    #[error("backend error: {0}")]
    Backend(String),
}

impl FsError {
    /// The POSIX errno an OS-facing dispatcher should return for this error.
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::IsADirectory => libc::EISDIR,
            FsError::AlreadyExists => libc::EEXIST,
            FsError::NameTooLong => libc::ENAMETOOLONG,
            FsError::TooLarge => libc::EFBIG,
            FsError::NoSpace => libc::ENOSPC,
            FsError::NotEmpty => libc::ENOTEMPTY,
            FsError::InvalidPath(_) => libc::EINVAL,
            FsError::Corruption(_) => libc::EIO,
            FsError::Backend(_) => libc::EIO,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
