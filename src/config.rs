//! Format-defining constants. Changing any of these breaks on-disk
//! compatibility with existing images.

/// First word of the superblock; identifies a formatted image.
pub const MAGIC_NUMBER: u32 = 0xf0f0_3410;

pub const BLOCK_SIZE: usize = 4096; // Granularity of all disk I/O
pub const INODE_SIZE: usize = 32; // Packed on-disk inode record
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

pub const POINTERS_PER_INODE: usize = 5; // Direct pointers held in the inode itself
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / 4; // 32-bit pointers in an indirect block

/// Largest representable file: the direct pointers plus one indirect block's worth.
pub const MAX_FILE_SIZE: usize = (POINTERS_PER_INODE + POINTERS_PER_BLOCK) * BLOCK_SIZE;
