//! inspect.vsfs - Dump a MiniVSFS image
//!
//! Prints the superblock and every occupied root directory slot, flagging
//! checksum mismatches. Never writes to the image.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use vsfs_common::{inspect, ImageFile};

#[derive(Parser, Debug)]
#[command(name = "inspect.vsfs")]
#[command(about = "Dump the superblock and root directory of a MiniVSFS image")]
struct Args {
    /// Disk image to read
    image: PathBuf,

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

    let mut image = ImageFile::open_read_only(&args.image)?;
    let report = inspect(&mut image)
        .with_context(|| format!("failed to read {}", args.image.display()))?;
    let sb = &report.superblock;

    println!("MiniVSFS image: {}", args.image.display());
    println!("  magic:        {:#010x}", sb.magic);
    println!("  version:      {}", sb.version);
    println!("  block_size:   {}", sb.block_size);
    println!("  total_blocks: {}", sb.total_blocks);
    println!("  inode_count:  {}", sb.inode_count);
    println!("  root_inode:   {}", sb.root_inode);
    println!("  mtime_epoch:  {}", sb.mtime_epoch);
    println!(
        "  checksum:     {:#010x} ({})",
        sb.checksum,
        if report.superblock_ok { "ok" } else { "BAD" }
    );
    println!("  image length: {} bytes ({} appended)", report.image_len, report.trailing_bytes());

    println!("\nRoot directory ({} entries):", report.entries.len());
    for slot in &report.entries {
        println!(
            "  [{:2}] ino={} type={} {}{}",
            slot.slot,
            slot.entry.inode_no,
            slot.entry.entry_type,
            slot.entry.name_lossy(),
            if slot.checksum_ok { "" } else { "  (checksum mismatch)" }
        );
    }

    if !report.superblock_ok {
        anyhow::bail!("superblock failed validation");
    }
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
