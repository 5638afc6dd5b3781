//! The filesystem proper: formatting, mounting, and the per-inode API.

use std::sync::Arc;

use log::warn;

use crate::bitmap::FreeMap;
use crate::config::*;
use crate::disk::Disk;
use crate::error::FsError;
use crate::inode::{bmap, load_inode, store_inode};
use crate::layout::{Block, Inode, SuperBlock};
use crate::Result;

/// A mounted filesystem. Owns the free maps for the duration of the mount
/// and holds the disk it is attached to; dropping it detaches the disk.
#[derive(Debug)]
pub struct FileSystem {
    disk: Arc<Disk>,
    meta: SuperBlock,
    free_blocks: FreeMap,
    free_inodes: FreeMap,
}

impl FileSystem {
    /// Writes a fresh filesystem onto `disk`: a superblock reserving 10% of
    /// the blocks (rounded up) for inodes, then every other block zeroed.
    /// The disk must not be mounted.
    pub fn format(disk: &Disk) -> Result<()> {
        if disk.mounted() {
            return Err(FsError::AlreadyMounted);
        }

        let blocks = disk.blocks() as u32;
        let inode_blocks = blocks.div_ceil(10);
        let meta = SuperBlock {
            magic_number: MAGIC_NUMBER,
            blocks,
            inode_blocks,
            inodes: inode_blocks * INODES_PER_BLOCK as u32,
        };
        meta.store(disk)?;

        let zero = Block::zeroed();
        for block_id in 1..disk.blocks() {
            disk.write(block_id, zero.bytes())?;
        }
        Ok(())
    }

    /// Reads the superblock, rebuilds both free maps from a single pass over
    /// the inode table, and attaches to `disk`. The superblock is trusted as
    /// read; nothing is recomputed. A failure at any step leaves the disk
    /// unmounted with no state escaping.
    pub fn mount(disk: Arc<Disk>) -> Result<Self> {
        if disk.mounted() {
            return Err(FsError::AlreadyMounted);
        }

        let meta = SuperBlock::load(&disk)?;
        let (free_blocks, free_inodes) = scan_inode_table(&disk, &meta)?;

        disk.set_mounted(true);
        Ok(FileSystem {
            disk,
            meta,
            free_blocks,
            free_inodes,
        })
    }

    /// Detaches from the disk and releases the free maps. Remounting
    /// afterwards rebuilds them from whatever is durably on disk.
    pub fn unmount(self) {}

    pub fn meta(&self) -> &SuperBlock {
        &self.meta
    }

    pub fn free_block_count(&self) -> usize {
        self.free_blocks.count_free()
    }

    pub fn free_inode_count(&self) -> usize {
        self.free_inodes.count_free()
    }

    /// Reserves the lowest-numbered free inode and returns its number.
    pub fn create(&mut self) -> Result<usize> {
        let inode_number = self.free_inodes.first_free().ok_or(FsError::OutOfInodes)?;
        let inode = Inode {
            valid: 1,
            ..Inode::EMPTY
        };
        store_inode(&self.disk, &self.meta, inode_number, &inode)?;
        // The slot is only taken once the table update is durable.
        self.free_inodes.set(inode_number, false);
        Ok(inode_number)
    }

    /// Invalidates `inode_number` and returns every block it reached, the
    /// indirect block included, to the free map.
    pub fn remove(&mut self, inode_number: usize) -> Result<()> {
        let inode = self.load_valid(inode_number)?;

        // Pull the pointer table before mutating anything on disk, so a read
        // failure leaves the inode untouched.
        let mut table = None;
        if inode.indirect != 0 {
            let mut block = Block::zeroed();
            self.disk.read(inode.indirect as usize, block.bytes_mut())?;
            table = Some(block);
        }

        store_inode(&self.disk, &self.meta, inode_number, &Inode::EMPTY)?;

        for &ptr in inode.direct.iter() {
            self.release(ptr);
        }
        if let Some(table) = table {
            for &ptr in table.pointers().iter() {
                self.release(ptr);
            }
            self.release(inode.indirect);
        }
        self.free_inodes.set(inode_number, true);
        Ok(())
    }

    /// Size in bytes of a valid inode.
    pub fn stat(&self, inode_number: usize) -> Result<u32> {
        Ok(self.load_valid(inode_number)?.size)
    }

    /// Reads from `inode_number` starting at `offset` into `buf`, clamped to
    /// the file size. Returns the number of bytes copied.
    pub fn read(&mut self, inode_number: usize, buf: &mut [u8], offset: usize) -> Result<usize> {
        let mut inode = self.load_valid(inode_number)?;
        let size = inode.size as usize;
        if offset > size {
            return Err(FsError::OffsetBeyondEnd(offset));
        }
        let end = size.min(offset + buf.len());

        let mut block = Block::zeroed();
        let mut bytes_read = 0;
        let mut pos = offset;
        while pos < end {
            let block_id = bmap(
                &self.disk,
                &mut self.free_blocks,
                &mut inode,
                pos / BLOCK_SIZE,
                false,
            )?;
            self.disk.read(block_id as usize, block.bytes_mut())?;

            let start = pos % BLOCK_SIZE;
            let take = (BLOCK_SIZE - start).min(end - pos);
            buf[bytes_read..bytes_read + take].copy_from_slice(&block.bytes()[start..start + take]);
            bytes_read += take;
            pos += take;
        }
        Ok(bytes_read)
    }

    /// Writes `buf` at `offset`, allocating missing data blocks lowest-first.
    /// When the disk or the pointer tree runs out, writing stops and the
    /// short count is returned; the size then reflects the bytes that made
    /// it. The inode is written back in either case.
    pub fn write(&mut self, inode_number: usize, buf: &[u8], offset: usize) -> Result<usize> {
        let mut inode = self.load_valid(inode_number)?;

        let mut block = Block::zeroed();
        let mut bytes_written = 0;
        let mut pos = offset;
        let end = offset + buf.len();
        while pos < end {
            let file_block = pos / BLOCK_SIZE;
            let block_id = match bmap(
                &self.disk,
                &mut self.free_blocks,
                &mut inode,
                file_block,
                true,
            ) {
                Ok(block_id) => block_id,
                Err(FsError::OutOfSpace) | Err(FsError::FileTooLarge(_)) => break,
                Err(err) => return Err(err),
            };

            let start = pos % BLOCK_SIZE;
            let take = (BLOCK_SIZE - start).min(end - pos);
            if take < BLOCK_SIZE {
                // Partial block: keep the bytes around the write.
                self.disk.read(block_id as usize, block.bytes_mut())?;
            }
            block.bytes_mut()[start..start + take]
                .copy_from_slice(&buf[bytes_written..bytes_written + take]);
            self.disk.write(block_id as usize, block.bytes())?;
            bytes_written += take;
            pos += take;
        }

        if (inode.size as usize) < offset + bytes_written {
            inode.size = (offset + bytes_written) as u32;
        }
        store_inode(&self.disk, &self.meta, inode_number, &inode)?;
        Ok(bytes_written)
    }

    /// Prints the superblock and every valid inode: number, size, direct
    /// pointers, and the nonzero entries of the indirect block. Touches
    /// nothing on disk.
    pub fn debug(disk: &Disk) -> Result<()> {
        let meta = SuperBlock::load(disk)?;
        println!("SuperBlock:");
        println!("    {} blocks", meta.blocks);
        println!("    {} inode blocks", meta.inode_blocks);
        println!("    {} inodes", meta.inodes);

        let mut block = Block::zeroed();
        let mut table = Block::zeroed();
        for b in 0..meta.inode_blocks as usize {
            disk.read(1 + b, block.bytes_mut())?;
            for slot in 0..INODES_PER_BLOCK {
                let inode = block.inode(slot);
                if !inode.is_valid() {
                    continue;
                }
                println!("Inode {}:", b * INODES_PER_BLOCK + slot);
                println!("    size: {} bytes", inode.size);
                println!("    direct blocks: {:?}", inode.direct);
                if inode.indirect != 0 {
                    println!("    indirect block: {}", inode.indirect);
                    disk.read(inode.indirect as usize, table.bytes_mut())?;
                    let ptrs: Vec<u32> = table
                        .pointers()
                        .iter()
                        .copied()
                        .filter(|&ptr| ptr != 0)
                        .collect();
                    println!("    indirect data blocks: {ptrs:?}");
                }
            }
        }
        Ok(())
    }

    fn load_valid(&self, inode_number: usize) -> Result<Inode> {
        let inode = load_inode(&self.disk, &self.meta, inode_number)?;
        if !inode.is_valid() {
            return Err(FsError::InvalidInode(inode_number));
        }
        Ok(inode)
    }

    fn data_start(&self) -> usize {
        1 + self.meta.inode_blocks as usize
    }

    /// Returns a data block to the free map, ignoring the null pointer and
    /// anything outside the data region.
    fn release(&mut self, ptr: u32) {
        let block_id = ptr as usize;
        if block_id >= self.data_start() && block_id < self.free_blocks.len() {
            self.free_blocks.set(block_id, true);
        }
    }
}

impl Drop for FileSystem {
    fn drop(&mut self) {
        self.disk.set_mounted(false);
    }
}

/// Single pass over the inode table: the superblock and inode blocks are
/// reserved, every block reachable from a valid inode is claimed, every
/// valid slot is claimed. A pointer that is out of range or already claimed
/// is a corruption signal; the bit stays claimed and the pass continues.
fn scan_inode_table(disk: &Disk, meta: &SuperBlock) -> Result<(FreeMap, FreeMap)> {
    let mut free_blocks = FreeMap::new(meta.blocks as usize);
    // Sized from the table itself so the slot arithmetic below always lands.
    let mut free_inodes = FreeMap::new(meta.inode_blocks as usize * INODES_PER_BLOCK);

    let data_start = (1 + meta.inode_blocks as usize).min(meta.blocks as usize);
    for block_id in 0..data_start {
        free_blocks.set(block_id, false);
    }

    let mut block = Block::zeroed();
    let mut table = Block::zeroed();
    for b in 0..meta.inode_blocks as usize {
        disk.read(1 + b, block.bytes_mut())?;
        for slot in 0..INODES_PER_BLOCK {
            let inode = block.inode(slot);
            if !inode.is_valid() {
                continue;
            }
            free_inodes.set(b * INODES_PER_BLOCK + slot, false);

            for &ptr in inode.direct.iter() {
                claim(&mut free_blocks, ptr, data_start);
            }
            if inode.indirect != 0 {
                claim(&mut free_blocks, inode.indirect, data_start);
                disk.read(inode.indirect as usize, table.bytes_mut())?;
                for &ptr in table.pointers().iter() {
                    claim(&mut free_blocks, ptr, data_start);
                }
            }
        }
    }
    Ok((free_blocks, free_inodes))
}

fn claim(free_blocks: &mut FreeMap, ptr: u32, data_start: usize) {
    if ptr == 0 {
        return;
    }
    let block_id = ptr as usize;
    if block_id < data_start || block_id >= free_blocks.len() {
        warn!("inode table references block {block_id} outside the data region");
        return;
    }
    if !free_blocks.get(block_id) {
        warn!("block {block_id} is referenced more than once; kept in use");
        return;
    }
    free_blocks.set(block_id, false);
}
