//! mkfs.vsfs - Create MiniVSFS disk images
//!
//! Writes a checksummed superblock into block 0 followed by zeroed blocks.
//! Block 1 is the root directory, empty at creation.
//!
//! Usage:
//!   mkfs_vsfs --image disk.img --size-kib 1024 --inodes 128

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use vsfs_common::{create_image, BLOCK_SIZE};

#[derive(Parser, Debug)]
#[command(name = "mkfs.vsfs")]
#[command(about = "Create MiniVSFS disk images")]
struct Args {
    /// Output disk image file (overwritten if it exists)
    #[arg(long)]
    image: PathBuf,

    /// Image size in KiB
    #[arg(long = "size-kib")]
    size_kib: u64,

    /// Inode count recorded in the superblock
    #[arg(long = "inodes")]
    inodes: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    // Usage errors exit 1 like every other failure; --help and --version exit 0
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            let _ = error.print();
            std::process::exit(if error.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(error) = run(args) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    init_logging(args.verbose);

    let sb = create_image(&args.image, args.size_kib, args.inodes)
        .with_context(|| format!("failed to create image {}", args.image.display()))?;

    if args.verbose {
        println!("  Total blocks: {}", sb.total_blocks);
        println!("  Block size:   {} bytes", BLOCK_SIZE);
        println!("  Inodes:       {}", sb.inode_count);
        println!("  Checksum:     {:#010x}", sb.checksum);
    }
    if sb.total_blocks < 2 {
        log::warn!("image has no root directory block; files cannot be added to it");
    }

    println!("File system image '{}' created successfully.", args.image.display());
    Ok(())
}

fn init_logging(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .format_timestamp(None)
        .format_target(false)
        .init();
}
