use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    /// A block transfer failed or moved fewer than `BLOCK_SIZE` bytes.
    #[error("disk i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("block {block} out of range for a {blocks}-block disk")]
    InvalidBlockId { block: usize, blocks: usize },

    #[error("disk is already mounted")]
    AlreadyMounted,

    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    #[error("no free inode slots")]
    OutOfInodes,

    #[error("no free data blocks")]
    OutOfSpace,

    #[error("inode {0} is invalid or out of range")]
    InvalidInode(usize),

    #[error("offset {0} is past the end of the file")]
    OffsetBeyondEnd(usize),

    #[error("file block {0} is past the largest representable file")]
    FileTooLarge(usize),

    /// A file block inside the live size range maps to pointer 0.
    #[error("file block {0} has no backing data block inside the file size")]
    Corrupted(usize),
}

pub type Result<T> = core::result::Result<T, FsError>;
