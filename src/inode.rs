//! Inode table access and the pointer walk from file block indexes to data
//! blocks.

use crate::bitmap::FreeMap;
use crate::config::*;
use crate::disk::Disk;
use crate::error::FsError;
use crate::layout::{Block, Inode, SuperBlock};
use crate::Result;

/// Maps an inode number to its hosting block and the slot within it.
/// The inode table starts right behind the superblock.
pub(crate) fn inode_location(inode_number: usize) -> (usize, usize) {
    (
        1 + inode_number / INODES_PER_BLOCK,
        inode_number % INODES_PER_BLOCK,
    )
}

pub(crate) fn load_inode(disk: &Disk, meta: &SuperBlock, inode_number: usize) -> Result<Inode> {
    if inode_number >= meta.inodes as usize {
        return Err(FsError::InvalidInode(inode_number));
    }
    let (block_id, slot) = inode_location(inode_number);
    let mut block = Block::zeroed();
    disk.read(block_id, block.bytes_mut())?;
    Ok(block.inode(slot))
}

/// Read-modify-writes the hosting block so the neighboring slots survive.
pub(crate) fn store_inode(
    disk: &Disk,
    meta: &SuperBlock,
    inode_number: usize,
    inode: &Inode,
) -> Result<()> {
    if inode_number >= meta.inodes as usize {
        return Err(FsError::InvalidInode(inode_number));
    }
    let (block_id, slot) = inode_location(inode_number);
    let mut block = Block::zeroed();
    disk.read(block_id, block.bytes_mut())?;
    block.set_inode(slot, inode);
    disk.write(block_id, block.bytes())
}

/// Resolves the data block backing `file_block` of `inode`.
///
/// With `create`, missing blocks are taken lowest-first from `free_blocks`,
/// the indirect block included; the indirect block is zero filled before
/// first use and written back as soon as a slot changes. The inode itself is
/// only updated in memory, the caller persists it.
///
/// Without `create`, a missing block inside the walk is a corruption signal.
pub(crate) fn bmap(
    disk: &Disk,
    free_blocks: &mut FreeMap,
    inode: &mut Inode,
    file_block: usize,
    create: bool,
) -> Result<u32> {
    // Direct pointers
    if file_block < POINTERS_PER_INODE {
        let ptr = inode.direct[file_block];
        if ptr != 0 {
            return Ok(ptr);
        }
        if !create {
            return Err(FsError::Corrupted(file_block));
        }
        let block_id = alloc_block(free_blocks)?;
        inode.direct[file_block] = block_id;
        return Ok(block_id);
    }

    // Single indirect
    let slot = file_block - POINTERS_PER_INODE;
    if slot >= POINTERS_PER_BLOCK {
        return Err(FsError::FileTooLarge(file_block));
    }

    let indirect = if inode.indirect != 0 {
        inode.indirect
    } else {
        if !create {
            return Err(FsError::Corrupted(file_block));
        }
        let block_id = alloc_block(free_blocks)?;
        // A fresh pointer table must read back as all "no block".
        disk.write(block_id as usize, Block::zeroed().bytes())?;
        inode.indirect = block_id;
        block_id
    };

    let mut table = Block::zeroed();
    disk.read(indirect as usize, table.bytes_mut())?;
    let ptr = table.pointers()[slot];
    if ptr != 0 {
        return Ok(ptr);
    }
    if !create {
        return Err(FsError::Corrupted(file_block));
    }
    let block_id = alloc_block(free_blocks)?;
    table.pointers_mut()[slot] = block_id;
    disk.write(indirect as usize, table.bytes())?;
    Ok(block_id)
}

fn alloc_block(free_blocks: &mut FreeMap) -> Result<u32> {
    let block_id = free_blocks.first_free().ok_or(FsError::OutOfSpace)?;
    free_blocks.set(block_id, false);
    Ok(block_id as u32)
}
