//! SimpleFS is a small block filesystem: a flat namespace of byte-addressable
//! files, each named by a bare inode number, stored inside a single
//! fixed-size image file. No directories, no permissions, no journaling.
//!
//! On-disk layout:
//! - Block 0: superblock
//! - Blocks 1 .. 1+inode_blocks: inode table (32-byte inodes, 128 per block)
//! - Everything else: data blocks, addressed by absolute block number
//!
//! The crate is layered bottom-up:
//! 1. Disk: fixed-size block I/O over a backing file.
//! 2. Layout: the superblock, inode, and block views of raw bytes.
//! 3. Free maps: in-memory block/inode allocation state, rebuilt at mount.
//! 4. Inode table + pointer walk: slot addressing and offset-to-block mapping.
//! 5. FileSystem: format, mount, and the per-inode read/write API.

mod bitmap;
mod config;
mod disk;
mod error;
mod fs;
mod inode;
mod layout;

pub use config::*;
pub use disk::Disk;
pub use error::FsError;
pub use error::Result;
pub use fs::FileSystem;
pub use layout::{Block, Inode, SuperBlock};
