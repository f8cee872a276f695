//! VSFS Common - Shared MiniVSFS on-disk structures and image operations
//!
//! This crate provides the canonical definitions for the MiniVSFS image format.
//! The `mkfs.vsfs`, `addfile.vsfs` and `inspect.vsfs` tools all go through it.
//!
//! ## Disk Layout
//!
//! ```text
//! Block 0:        Superblock (112 bytes used, rest of the block zero)
//! Block 1:        Root directory (64 x 64-byte entries, packed)
//! Block 2..N:     Reserved regions, then appended file content
//! ```
//!
//! File content is not block-allocated: each added file is appended as a raw
//! byte stream at the current end of the image and named by a root directory
//! entry. The bitmap, inode table and data region descriptors in the
//! superblock are part of the format but are never populated.
//!
//! ## Integrity
//!
//! | Record | Size | Checksum |
//! |--------|------|----------|
//! | Superblock | 112 | CRC32 over the whole record, checksum field zeroed |
//! | Inode | 128 | CRC32 over bytes `[0,120)` |
//! | DirEntry | 64 | XOR of bytes `[0,63)` |

pub mod append;
pub mod crc;
pub mod dir;
pub mod error;
pub mod image;
pub mod inspect;
pub mod structures;


pub use append::{add_file, add_file_with, basename, AddedFile};
pub use crc::{crc32, xor_checksum63};
pub use dir::DirOps;
pub use error::{Result, VsfsError};
pub use image::{create_image, format_image, ImageFile};
pub use inspect::{inspect, ImageReport, SlotReport};
pub use structures::{DirEntry, EntryType, Inode, Superblock};

// ============================================================================
// VERSION AND MAGIC
// ============================================================================

/// "MVSF" read big-endian
pub const VSFS_MAGIC: u32 = 0x4D56_5346;
pub const VSFS_VERSION: u32 = 1;

// ============================================================================
// LAYOUT CONSTANTS
// ============================================================================

pub const BLOCK_SIZE: u32 = 4096;

/// Root inode number, also stamped into every directory entry
pub const ROOT_INODE: u64 = 1;

/// Block holding the root directory
pub const ROOT_DIR_BLOCK: u64 = 1;

pub const SUPERBLOCK_SIZE: usize = 112;
pub const INODE_SIZE: usize = 128;
pub const DIRENT_SIZE: usize = 64;

/// Root directory capacity
pub const DIR_ENTRIES: usize = BLOCK_SIZE as usize / DIRENT_SIZE;

/// Name field width in a directory entry
pub const NAME_FIELD_LEN: usize = 58;

/// Usable name bytes; the last byte of the field is always a terminator
pub const MAX_FILENAME: usize = NAME_FIELD_LEN - 1;

/// Number of direct block pointers in an inode
pub const DIRECT_MAX: usize = 12;

// ============================================================================
// COMPILE-TIME CHECKS
// ============================================================================

const _: () = assert!(DIR_ENTRIES == 64);
const _: () = assert!(SUPERBLOCK_SIZE <= BLOCK_SIZE as usize);
