//! On-disk schema: the superblock, the packed inode record, and the four
//! ways a raw block is viewed.

use core::ptr;

use crate::config::*;
use crate::disk::Disk;
use crate::error::FsError;
use crate::Result;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SuperBlock {
    pub magic_number: u32,
    pub blocks: u32,       // Total blocks in the image
    pub inode_blocks: u32, // 10% of blocks, rounded up; fixed at format time
    pub inodes: u32,       // inode_blocks * INODES_PER_BLOCK
}

impl SuperBlock {
    /// Reads block 0 and verifies the magic number.
    pub fn load(disk: &Disk) -> Result<Self> {
        let mut block = Block::zeroed();
        disk.read(0, block.bytes_mut())?;
        let meta = block.super_block();
        if meta.magic_number != MAGIC_NUMBER {
            return Err(FsError::BadMagic(meta.magic_number));
        }
        Ok(meta)
    }

    /// Writes this superblock to block 0, zero padding to a full block.
    pub fn store(&self, disk: &Disk) -> Result<()> {
        let mut block = Block::zeroed();
        block.set_super_block(self);
        disk.write(0, block.bytes())
    }
}

/// One file descriptor: a validity flag, the byte size, five direct data
/// block pointers, and one indirect pointer block. Pointer value 0 means
/// "no block" (block 0 is always the superblock).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Inode {
    pub valid: u32,
    pub size: u32,
    pub direct: [u32; POINTERS_PER_INODE],
    pub indirect: u32,
}

impl Inode {
    pub const EMPTY: Self = Self {
        valid: 0,
        size: 0,
        direct: [0; POINTERS_PER_INODE],
        indirect: 0,
    };

    pub fn is_valid(&self) -> bool {
        self.valid != 0
    }
}

/// A raw block, viewable as a superblock, an inode array, a pointer array,
/// or plain bytes. The alignment lets the pointer view reinterpret in place.
#[repr(C, align(4))]
pub struct Block {
    bytes: [u8; BLOCK_SIZE],
}

impl Block {
    pub fn zeroed() -> Box<Self> {
        Box::new(Block {
            bytes: [0; BLOCK_SIZE],
        })
    }

    pub fn bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8; BLOCK_SIZE] {
        &mut self.bytes
    }

    pub fn super_block(&self) -> SuperBlock {
        unsafe { ptr::read_unaligned(self.bytes.as_ptr() as *const SuperBlock) }
    }

    pub fn set_super_block(&mut self, meta: &SuperBlock) {
        unsafe { ptr::write_unaligned(self.bytes.as_mut_ptr() as *mut SuperBlock, *meta) }
    }

    /// Copies the inode record at `slot` out of the block.
    pub fn inode(&self, slot: usize) -> Inode {
        debug_assert!(slot < INODES_PER_BLOCK);
        unsafe { ptr::read_unaligned(self.bytes.as_ptr().add(slot * INODE_SIZE) as *const Inode) }
    }

    pub fn set_inode(&mut self, slot: usize, inode: &Inode) {
        debug_assert!(slot < INODES_PER_BLOCK);
        unsafe {
            ptr::write_unaligned(
                self.bytes.as_mut_ptr().add(slot * INODE_SIZE) as *mut Inode,
                *inode,
            )
        }
    }

    pub fn pointers(&self) -> &[u32; POINTERS_PER_BLOCK] {
        unsafe { &*(self.bytes.as_ptr() as *const [u32; POINTERS_PER_BLOCK]) }
    }

    pub fn pointers_mut(&mut self) -> &mut [u32; POINTERS_PER_BLOCK] {
        unsafe { &mut *(self.bytes.as_mut_ptr() as *mut [u32; POINTERS_PER_BLOCK]) }
    }
}
