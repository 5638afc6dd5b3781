#![allow(unused)]

mod common;

use std::sync::Arc;

use common::{formatted_disk, fresh_fs, pattern, scratch_disk};
use simplefs::*;

#[test]
fn format_reports_geometry() {
    let mut fs = fresh_fs("geometry", 10);
    let meta = fs.meta();
    assert_eq!(meta.blocks, 10);
    assert_eq!(meta.inode_blocks, 1);
    assert_eq!(meta.inodes, 128);

    // Superblock plus one inode block reserved.
    assert_eq!(fs.free_block_count(), 8);
    assert_eq!(fs.free_inode_count(), 128);
}

#[test]
fn inode_block_ratio_rounds_up() {
    let fs = fresh_fs("geometry-roundup", 11);
    assert_eq!(fs.meta().inode_blocks, 2);
    assert_eq!(fs.meta().inodes, 256);
}

#[test]
fn debug_reads_a_fresh_image() {
    let disk = formatted_disk("debug", 10);
    FileSystem::debug(&disk).unwrap();
}

#[test]
fn format_rejects_a_mounted_disk() {
    let disk = formatted_disk("format-mounted", 10);
    let fs = FileSystem::mount(disk.clone()).unwrap();
    assert!(matches!(
        FileSystem::format(&disk),
        Err(FsError::AlreadyMounted)
    ));
}

#[test]
fn mount_rejects_bad_magic() {
    let disk = Arc::new(scratch_disk("bad-magic", 10));
    let mut block = Block::zeroed();
    block.set_super_block(&SuperBlock {
        magic_number: 0xdead_beef,
        blocks: 10,
        inode_blocks: 1,
        inodes: 128,
    });
    disk.write(0, block.bytes()).unwrap();

    let err = FileSystem::mount(disk.clone()).unwrap_err();
    assert!(matches!(err, FsError::BadMagic(0xdead_beef)));
    assert!(!disk.mounted());
}

#[test]
fn mount_is_exclusive() {
    let disk = formatted_disk("exclusive", 10);
    let fs = FileSystem::mount(disk.clone()).unwrap();
    assert!(disk.mounted());
    assert!(matches!(
        FileSystem::mount(disk.clone()),
        Err(FsError::AlreadyMounted)
    ));

    fs.unmount();
    assert!(!disk.mounted());
    let fs = FileSystem::mount(disk.clone()).unwrap();
    drop(fs);
    assert!(!disk.mounted());
}

#[test]
fn create_hands_out_lowest_numbers() {
    let mut fs = fresh_fs("create", 10);
    assert_eq!(fs.create().unwrap(), 0);
    assert_eq!(fs.create().unwrap(), 1);
    assert_eq!(fs.stat(0).unwrap(), 0);
    assert_eq!(fs.free_inode_count(), 126);
}

#[test]
fn create_runs_out_of_inodes() {
    let mut fs = fresh_fs("create-exhaust", 10);
    for expected in 0..128 {
        assert_eq!(fs.create().unwrap(), expected);
    }
    assert!(matches!(fs.create(), Err(FsError::OutOfInodes)));
}

#[test]
fn stat_and_remove_reject_bad_inodes() {
    let mut fs = fresh_fs("bad-inodes", 10);
    assert!(matches!(fs.stat(3), Err(FsError::InvalidInode(3))));
    assert!(matches!(fs.stat(4096), Err(FsError::InvalidInode(4096))));
    assert!(fs.remove(3).is_err());

    fs.create().unwrap();
    fs.remove(0).unwrap();
    assert!(matches!(fs.remove(0), Err(FsError::InvalidInode(0))));
}

#[test]
fn small_write_round_trips() {
    let mut fs = fresh_fs("hello", 10);
    let n = fs.create().unwrap();

    assert_eq!(fs.write(n, b"hello", 0).unwrap(), 5);
    assert_eq!(fs.stat(n).unwrap(), 5);

    let mut buf = [0u8; 5];
    assert_eq!(fs.read(n, &mut buf, 0).unwrap(), 5);
    assert_eq!(&buf, b"hello");
}

#[test]
fn overwrite_keeps_surrounding_bytes() {
    let mut fs = fresh_fs("overwrite", 10);
    let n = fs.create().unwrap();

    fs.write(n, b"hello world", 0).unwrap();
    fs.write(n, b"HELLO", 0).unwrap();
    assert_eq!(fs.stat(n).unwrap(), 11);

    let mut buf = [0u8; 11];
    fs.read(n, &mut buf, 0).unwrap();
    assert_eq!(&buf, b"HELLO world");
}

#[test]
fn direct_blocks_fill_before_the_indirect_is_touched() {
    let mut fs = fresh_fs("direct", 200);
    let free_at_mount = fs.free_block_count();
    let n = fs.create().unwrap();

    let data = pattern(POINTERS_PER_INODE * BLOCK_SIZE);
    assert_eq!(fs.write(n, &data, 0).unwrap(), data.len());
    assert_eq!(fs.stat(n).unwrap() as usize, data.len());

    // Five direct blocks and nothing else.
    assert_eq!(fs.free_block_count(), free_at_mount - POINTERS_PER_INODE);

    let mut back = vec![0u8; data.len()];
    assert_eq!(fs.read(n, &mut back, 0).unwrap(), data.len());
    assert_eq!(back, data);
}

#[test]
fn first_block_past_direct_allocates_the_indirect() {
    let mut fs = fresh_fs("indirect", 200);
    let free_at_mount = fs.free_block_count();
    let n = fs.create().unwrap();

    let data = pattern((POINTERS_PER_INODE + 1) * BLOCK_SIZE);
    let split = POINTERS_PER_INODE * BLOCK_SIZE;
    assert_eq!(fs.write(n, &data[..split], 0).unwrap(), split);
    assert_eq!(
        fs.write(n, &data[split..], split).unwrap(),
        data.len() - split
    );
    assert_eq!(fs.stat(n).unwrap() as usize, data.len());

    // Six data blocks plus the indirect block itself.
    assert_eq!(
        fs.free_block_count(),
        free_at_mount - (POINTERS_PER_INODE + 2)
    );

    let mut back = vec![0u8; data.len()];
    assert_eq!(fs.read(n, &mut back, 0).unwrap(), data.len());
    assert_eq!(back, data);
}

#[test]
fn reads_clamp_to_the_file_size() {
    let mut fs = fresh_fs("clamp", 10);
    let n = fs.create().unwrap();
    fs.write(n, b"abc", 0).unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(fs.read(n, &mut buf, 0).unwrap(), 3);
    assert_eq!(fs.read(n, &mut buf, 3).unwrap(), 0);
    assert!(matches!(
        fs.read(n, &mut buf, 4),
        Err(FsError::OffsetBeyondEnd(4))
    ));
}

#[test]
fn remove_returns_every_block() {
    let mut fs = fresh_fs("remove", 200);
    let free_at_mount = fs.free_block_count();

    let n = fs.create().unwrap();
    let data = pattern(7 * BLOCK_SIZE + 123);
    assert_eq!(fs.write(n, &data, 0).unwrap(), data.len());
    assert!(fs.free_block_count() < free_at_mount);

    fs.remove(n).unwrap();
    assert_eq!(fs.free_block_count(), free_at_mount);
    assert!(fs.stat(n).is_err());

    // Lowest-free policy hands the slot straight back.
    assert_eq!(fs.create().unwrap(), n);
    assert_eq!(fs.stat(n).unwrap(), 0);
}

#[test]
fn full_disk_yields_a_short_write() {
    // 10 blocks: superblock + 1 inode block leaves 8 data blocks. Seven file
    // blocks fit once the indirect block takes its slot.
    let mut fs = fresh_fs("full-disk", 10);
    let n = fs.create().unwrap();

    let data = pattern(9 * BLOCK_SIZE);
    assert_eq!(fs.write(n, &data, 0).unwrap(), 7 * BLOCK_SIZE);
    assert_eq!(fs.stat(n).unwrap() as usize, 7 * BLOCK_SIZE);
    assert_eq!(fs.free_block_count(), 0);

    // Nothing left: later writes land zero bytes.
    assert_eq!(fs.write(n, &data[..16], 7 * BLOCK_SIZE).unwrap(), 0);
    assert_eq!(fs.stat(n).unwrap() as usize, 7 * BLOCK_SIZE);

    let mut back = vec![0u8; 7 * BLOCK_SIZE];
    assert_eq!(fs.read(n, &mut back, 0).unwrap(), back.len());
    assert_eq!(back, data[..7 * BLOCK_SIZE]);
}

#[test]
fn file_growth_stops_at_the_pointer_tree() {
    // Enough data blocks for a maximum-size file plus its indirect block.
    let mut fs = fresh_fs("max-file", 1500);
    let n = fs.create().unwrap();

    let data = pattern(MAX_FILE_SIZE + BLOCK_SIZE);
    assert_eq!(fs.write(n, &data, 0).unwrap(), MAX_FILE_SIZE);
    assert_eq!(fs.stat(n).unwrap() as usize, MAX_FILE_SIZE);
    log!("file capped at {} bytes", MAX_FILE_SIZE);

    assert_eq!(fs.write(n, &data[..64], MAX_FILE_SIZE).unwrap(), 0);

    let mut tail = vec![0u8; 5000];
    let tail_offset = MAX_FILE_SIZE - tail.len();
    assert_eq!(fs.read(n, &mut tail, tail_offset).unwrap(), tail.len());
    assert_eq!(tail, data[tail_offset..MAX_FILE_SIZE]);
}

#[test]
fn remount_rebuilds_the_free_maps() {
    let disk = formatted_disk("remount", 200);

    let mut fs = FileSystem::mount(disk.clone()).unwrap();
    let n = fs.create().unwrap();
    let data = pattern(6 * BLOCK_SIZE + 77);
    fs.write(n, &data, 0).unwrap();
    let free_blocks = fs.free_block_count();
    let free_inodes = fs.free_inode_count();
    fs.unmount();

    let mut fs = FileSystem::mount(disk.clone()).unwrap();
    log!("free blocks after remount: {}", fs.free_block_count());
    assert_eq!(fs.free_block_count(), free_blocks);
    assert_eq!(fs.free_inode_count(), free_inodes);

    let mut back = vec![0u8; data.len()];
    assert_eq!(fs.read(n, &mut back, 0).unwrap(), data.len());
    assert_eq!(back, data);
}

#[test]
fn a_hole_inside_the_size_is_corruption() {
    let mut fs = fresh_fs("hole", 200);
    let n = fs.create().unwrap();

    // Writing past unallocated file blocks leaves pointer-0 holes behind.
    assert_eq!(fs.write(n, b"tail", 2 * BLOCK_SIZE).unwrap(), 4);
    assert_eq!(fs.stat(n).unwrap() as usize, 2 * BLOCK_SIZE + 4);

    let mut buf = [0u8; 4];
    assert_eq!(fs.read(n, &mut buf, 2 * BLOCK_SIZE).unwrap(), 4);
    assert_eq!(&buf, b"tail");

    assert!(matches!(
        fs.read(n, &mut buf, 0),
        Err(FsError::Corrupted(0))
    ));
}

#[test]
fn crafted_inode_with_no_blocks_reads_as_corrupt() {
    let disk = formatted_disk("crafted", 20);

    // A valid inode claiming five bytes it has no block for.
    let mut block = Block::zeroed();
    disk.read(1, block.bytes_mut()).unwrap();
    block.set_inode(
        0,
        &Inode {
            valid: 1,
            size: 5,
            direct: [0; POINTERS_PER_INODE],
            indirect: 0,
        },
    );
    disk.write(1, block.bytes()).unwrap();

    let mut fs = FileSystem::mount(disk).unwrap();
    assert_eq!(fs.stat(0).unwrap(), 5);
    let mut buf = [0u8; 5];
    assert!(matches!(fs.read(0, &mut buf, 0), Err(FsError::Corrupted(0))));
}

#[test]
fn scan_keeps_doubly_referenced_blocks_in_use() {
    let disk = formatted_disk("double-ref", 20);

    // Two valid inodes pointing at the same data block. 20 blocks means two
    // inode blocks, so the data region starts at block 3.
    let shared = 5u32;
    let mut block = Block::zeroed();
    disk.read(1, block.bytes_mut()).unwrap();
    let mut inode = Inode {
        valid: 1,
        size: BLOCK_SIZE as u32,
        direct: [0; POINTERS_PER_INODE],
        indirect: 0,
    };
    inode.direct[0] = shared;
    block.set_inode(0, &inode);
    block.set_inode(1, &inode);
    disk.write(1, block.bytes()).unwrap();

    let fs = FileSystem::mount(disk).unwrap();
    assert_eq!(fs.free_inode_count(), 254);
    // 17 data blocks, one of them claimed (once).
    assert_eq!(fs.free_block_count(), 16);
}
