//! addfile.vsfs - Add one file to a MiniVSFS disk image
//!
//! The file's bytes are appended to the end of the image and a root directory
//! entry is written for its base name.
//!
//! Usage:
//!   addfile_vsfs --input disk.img --file notes/hello.txt
//!   addfile_vsfs --input base.img --output copy.img --file hello.txt
//!
//! With a distinct `--output`, the input image is never modified and the
//! output only appears once the file has been added.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use vsfs_common::{add_file, AddedFile};

#[derive(Parser, Debug)]
#[command(name = "addfile.vsfs")]
#[command(about = "Add a file to a MiniVSFS disk image")]
struct Args {
    /// Image to add the file to
    #[arg(short, long)]
    input: PathBuf,

    /// Write the result here instead of updating the input in place
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// File to add; only its final path component is stored
    #[arg(short, long)]
    file: PathBuf,

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

    let (target, added) = match args.output.as_deref() {
        Some(output) if output != args.input => {
            (output.to_path_buf(), add_to_copy(&args.input, output, &args.file)?)
        }
        _ => {
            let added = add_file(&args.input, &args.file)
                .with_context(|| format!("failed to add {}", args.file.display()))?;
            (args.input.clone(), added)
        }
    };

    if args.verbose {
        println!("  Slot:     {}", added.slot);
        println!("  Bytes:    {}", added.bytes_appended);
        println!("  Image:    {} bytes", added.image_len);
    }
    println!(
        "File '{}' added to the image '{}'.",
        String::from_utf8_lossy(&added.name),
        target.display()
    );
    Ok(())
}

/// Add `file` to a staged copy of `input` next to `output`.
///
/// The copy replaces `output` only after the add succeeds; on any failure it
/// is removed and `output` is left as it was.
fn add_to_copy(input: &Path, output: &Path, file: &Path) -> Result<AddedFile> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = tempfile::Builder::new()
        .prefix(".vsfs-")
        .suffix(".img")
        .tempfile_in(dir)
        .with_context(|| format!("failed to stage output in {}", dir.display()))?;

    fs::copy(input, staged.path()).with_context(|| {
        format!("failed to copy image {} to {}", input.display(), staged.path().display())
    })?;
    log::debug!("staged {} at {}", input.display(), staged.path().display());

    let added = add_file(staged.path(), file)
        .with_context(|| format!("failed to add {}", file.display()))?;

    staged
        .persist(output)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(added)
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
