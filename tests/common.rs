//! Common utilities for tests
#![allow(unused)]

use std::sync::Arc;

use simplefs::*;

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// Opens a scratch disk image under the OS temp dir. Every test passes its
/// own name so the suite can run in parallel.
pub fn scratch_disk(name: &str, blocks: usize) -> Disk {
    let path = std::env::temp_dir().join(format!("simplefs-{name}.img"));
    // Leftovers from older runs would leak stale geometry into the test.
    let _ = std::fs::remove_file(&path);
    Disk::open(&path, blocks).unwrap()
}

/// A scratch disk with a fresh filesystem written onto it.
pub fn formatted_disk(name: &str, blocks: usize) -> Arc<Disk> {
    let disk = Arc::new(scratch_disk(name, blocks));
    FileSystem::format(&disk).unwrap();
    disk
}

/// A freshly formatted and mounted filesystem.
pub fn fresh_fs(name: &str, blocks: usize) -> FileSystem {
    FileSystem::mount(formatted_disk(name, blocks)).unwrap()
}

/// Deterministic byte pattern that differs from block to block.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}
