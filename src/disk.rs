//! Block-device emulator: fixed-size random-access block I/O over a backing
//! file, with read/write counters and the mount flag the filesystem uses as
//! its exclusion token.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use log::info;

use crate::config::BLOCK_SIZE;
use crate::error::FsError;
use crate::Result;

#[derive(Debug)]
pub struct Disk {
    file: Mutex<File>,
    blocks: usize,
    reads: AtomicUsize,
    writes: AtomicUsize,
    mounted: AtomicBool,
}

impl Disk {
    /// Opens (creating if needed) the image at `path` and sizes it to exactly
    /// `blocks * BLOCK_SIZE` bytes.
    pub fn open(path: impl AsRef<Path>, blocks: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        file.set_len((blocks * BLOCK_SIZE) as u64)?;

        Ok(Disk {
            file: Mutex::new(file),
            blocks,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            mounted: AtomicBool::new(false),
        })
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn mounted(&self) -> bool {
        self.mounted.load(Ordering::Relaxed)
    }

    pub(crate) fn set_mounted(&self, mounted: bool) {
        self.mounted.store(mounted, Ordering::Relaxed);
    }

    /// Cumulative successful block reads. Observational only.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Cumulative successful block writes. Observational only.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Reads one whole block into `buf`. A transfer of fewer than
    /// `BLOCK_SIZE` bytes is an error.
    pub fn read(&self, block: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        self.check(block)?;
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((block * BLOCK_SIZE) as u64))?;
        file.read_exact(buf)?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes one whole block from `buf`.
    pub fn write(&self, block: usize, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        self.check(block)?;
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((block * BLOCK_SIZE) as u64))?;
        file.write_all(buf)?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn check(&self, block: usize) -> Result<()> {
        if block >= self.blocks {
            return Err(FsError::InvalidBlockId {
                block,
                blocks: self.blocks,
            });
        }
        Ok(())
    }
}

impl Drop for Disk {
    fn drop(&mut self) {
        info!("{} disk block reads", self.reads());
        info!("{} disk block writes", self.writes());
    }
}
