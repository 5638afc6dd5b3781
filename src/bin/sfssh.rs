//! Interactive SimpleFS shell: opens a disk image and dispatches commands
//! against the filesystem API.

use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::error;
use simplefs::{Disk, FileSystem, BLOCK_SIZE};

/// Shell over a SimpleFS disk image.
#[derive(Parser)]
struct Cli {
    /// Path to the disk image (created if missing).
    image: PathBuf,

    /// Number of blocks in the disk image.
    blocks: usize,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let disk = match Disk::open(&cli.image, cli.blocks) {
        Ok(disk) => Arc::new(disk),
        Err(err) => {
            eprintln!("cannot open {}: {err}", cli.image.display());
            return ExitCode::FAILURE;
        }
    };

    let mut fs: Option<FileSystem> = None;
    let stdin = io::stdin();
    loop {
        eprint!("sfs> ");
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else { continue };
        let args: Vec<&str> = words.collect();

        match cmd {
            "debug" => do_debug(&disk, &args),
            "format" => do_format(&disk, &fs, &args),
            "mount" => do_mount(&disk, &mut fs, &args),
            "unmount" => do_unmount(&mut fs, &args),
            "create" => do_create(&mut fs, &args),
            "remove" => do_remove(&mut fs, &args),
            "stat" => do_stat(&fs, &args),
            "cat" => do_cat(&mut fs, &args),
            "copyin" => do_copyin(&mut fs, &args),
            "copyout" => do_copyout(&mut fs, &args),
            "help" => do_help(),
            "exit" | "quit" => break,
            _ => {
                println!("unknown command: {cmd}");
                println!("type 'help' for a list of commands");
            }
        }
    }

    // Detaches the disk if still mounted.
    drop(fs);
    ExitCode::SUCCESS
}

fn do_debug(disk: &Disk, args: &[&str]) {
    if !args.is_empty() {
        println!("usage: debug");
        return;
    }
    if let Err(err) = FileSystem::debug(disk) {
        error!("debug: {err}");
        println!("debug failed!");
    }
}

fn do_format(disk: &Disk, fs: &Option<FileSystem>, args: &[&str]) {
    if !args.is_empty() {
        println!("usage: format");
        return;
    }
    if fs.is_some() {
        println!("unmount first");
        return;
    }
    match FileSystem::format(disk) {
        Ok(()) => println!("disk formatted."),
        Err(err) => {
            error!("format: {err}");
            println!("format failed!");
        }
    }
}

fn do_mount(disk: &Arc<Disk>, fs: &mut Option<FileSystem>, args: &[&str]) {
    if !args.is_empty() {
        println!("usage: mount");
        return;
    }
    if fs.is_some() {
        println!("already mounted");
        return;
    }
    match FileSystem::mount(disk.clone()) {
        Ok(mounted) => {
            *fs = Some(mounted);
            println!("disk mounted.");
        }
        Err(err) => {
            error!("mount: {err}");
            println!("mount failed!");
        }
    }
}

fn do_unmount(fs: &mut Option<FileSystem>, args: &[&str]) {
    if !args.is_empty() {
        println!("usage: unmount");
        return;
    }
    match fs.take() {
        Some(mounted) => {
            mounted.unmount();
            println!("disk unmounted.");
        }
        None => println!("not mounted"),
    }
}

fn do_create(fs: &mut Option<FileSystem>, args: &[&str]) {
    if !args.is_empty() {
        println!("usage: create");
        return;
    }
    let Some(fs) = fs.as_mut() else {
        println!("mount first");
        return;
    };
    match fs.create() {
        Ok(inode_number) => println!("created inode {inode_number}."),
        Err(err) => {
            error!("create: {err}");
            println!("create failed!");
        }
    }
}

fn do_remove(fs: &mut Option<FileSystem>, args: &[&str]) {
    let Some(fs) = fs.as_mut() else {
        println!("mount first");
        return;
    };
    let Some(inode_number) = parse_inode(args) else {
        println!("usage: remove <inode>");
        return;
    };
    match fs.remove(inode_number) {
        Ok(()) => println!("removed inode {inode_number}."),
        Err(err) => {
            error!("remove: {err}");
            println!("remove failed!");
        }
    }
}

fn do_stat(fs: &Option<FileSystem>, args: &[&str]) {
    let Some(fs) = fs.as_ref() else {
        println!("mount first");
        return;
    };
    let Some(inode_number) = parse_inode(args) else {
        println!("usage: stat <inode>");
        return;
    };
    match fs.stat(inode_number) {
        Ok(size) => println!("inode {inode_number} has size {size} bytes."),
        Err(err) => {
            error!("stat: {err}");
            println!("stat failed!");
        }
    }
}

fn do_cat(fs: &mut Option<FileSystem>, args: &[&str]) {
    let Some(fs) = fs.as_mut() else {
        println!("mount first");
        return;
    };
    let Some(inode_number) = parse_inode(args) else {
        println!("usage: cat <inode>");
        return;
    };
    let mut stdout = io::stdout();
    if let Err(err) = copy_out(fs, inode_number, &mut stdout) {
        error!("cat: {err}");
        println!("cat failed!");
    }
}

fn do_copyin(fs: &mut Option<FileSystem>, args: &[&str]) {
    let Some(fs) = fs.as_mut() else {
        println!("mount first");
        return;
    };
    let [path, inode_number] = args else {
        println!("usage: copyin <file> <inode>");
        return;
    };
    let Ok(inode_number) = inode_number.parse::<usize>() else {
        println!("usage: copyin <file> <inode>");
        return;
    };
    match copy_in(fs, path, inode_number) {
        Ok(copied) => println!("{copied} bytes copied"),
        Err(err) => {
            error!("copyin: {err}");
            println!("copyin failed!");
        }
    }
}

fn do_copyout(fs: &mut Option<FileSystem>, args: &[&str]) {
    let Some(fs) = fs.as_mut() else {
        println!("mount first");
        return;
    };
    let [inode_number, path] = args else {
        println!("usage: copyout <inode> <file>");
        return;
    };
    let Ok(inode_number) = inode_number.parse::<usize>() else {
        println!("usage: copyout <inode> <file>");
        return;
    };
    let result = File::create(path)
        .map_err(simplefs::FsError::from)
        .and_then(|mut file| copy_out(fs, inode_number, &mut file));
    match result {
        Ok(copied) => println!("{copied} bytes copied"),
        Err(err) => {
            error!("copyout: {err}");
            println!("copyout failed!");
        }
    }
}

fn parse_inode(args: &[&str]) -> Option<usize> {
    match args {
        [inode_number] => inode_number.parse().ok(),
        _ => None,
    }
}

fn do_help() {
    println!("Commands are:");
    println!("    format");
    println!("    mount");
    println!("    unmount");
    println!("    debug");
    println!("    create");
    println!("    remove  <inode>");
    println!("    stat    <inode>");
    println!("    cat     <inode>");
    println!("    copyin  <file> <inode>");
    println!("    copyout <inode> <file>");
    println!("    help");
    println!("    quit");
    println!("    exit");
}

/// Streams a host file into an inode, one block-sized chunk at a time.
/// A short write means the disk filled up; copying stops there.
fn copy_in(fs: &mut FileSystem, path: &str, inode_number: usize) -> simplefs::Result<usize> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; BLOCK_SIZE];
    let mut offset = 0;
    loop {
        let chunk = file.read(&mut buf)?;
        if chunk == 0 {
            break;
        }
        let written = fs.write(inode_number, &buf[..chunk], offset)?;
        offset += written;
        if written < chunk {
            break;
        }
    }
    Ok(offset)
}

/// Streams an inode's contents into `writer`.
fn copy_out(
    fs: &mut FileSystem,
    inode_number: usize,
    writer: &mut impl Write,
) -> simplefs::Result<usize> {
    let size = fs.stat(inode_number)? as usize;
    let mut buf = [0u8; BLOCK_SIZE];
    let mut offset = 0;
    while offset < size {
        let chunk = fs.read(inode_number, &mut buf, offset)?;
        if chunk == 0 {
            break;
        }
        writer.write_all(&buf[..chunk])?;
        offset += chunk;
    }
    Ok(offset)
}
