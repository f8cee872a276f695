//! Error type for MiniVSFS image operations.
//!
//! Every failure is detected where it happens and reported once; nothing is
//! retried or rolled back.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VsfsError {
    /// I/O error on an already-open image.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The destination image could not be created or truncated.
    #[error("failed to create image '{}': {source}", path.display())]
    Create { path: PathBuf, source: io::Error },

    /// An existing image could not be opened for update.
    #[error("failed to open image '{}': {source}", path.display())]
    OpenImage { path: PathBuf, source: io::Error },

    /// The file to add could not be opened. The image is untouched.
    #[error("failed to open file to add '{}': {source}", path.display())]
    SourceOpen { path: PathBuf, source: io::Error },

    /// An occupied directory entry already carries this name. The image is
    /// untouched.
    #[error("cannot add same file twice: '{name}' already exists in the image (slot {slot})")]
    Duplicate { name: String, slot: usize },

    /// All root directory slots are taken.
    ///
    /// The source bytes were appended before the slot search ran, so the image
    /// now ends with `orphaned_bytes` bytes that no entry references.
    #[error("directory is full, cannot add more files ({orphaned_bytes} unreferenced bytes left at end of image)")]
    DirectoryFull { orphaned_bytes: u64 },

    /// A record buffer was shorter than the record.
    #[error("truncated {what}: need {need} bytes, got {got}")]
    Truncated {
        what: &'static str,
        need: usize,
        got: usize,
    },

    #[error("not a MiniVSFS image: bad magic {found:#010x}")]
    BadMagic { found: u32 },

    #[error("unsupported MiniVSFS version {found}")]
    UnsupportedVersion { found: u32 },

    #[error("superblock checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    SuperblockChecksum { stored: u32, computed: u32 },
}

pub type Result<T, E = VsfsError> = std::result::Result<T, E>;
