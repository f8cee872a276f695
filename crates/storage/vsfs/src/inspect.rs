//! Read-only image inspection.

use std::io::{Read, Seek};

use crate::dir::DirOps;
use crate::error::Result;
use crate::image::ImageFile;
use crate::structures::{DirEntry, Superblock};

/// One occupied root directory slot
#[derive(Clone, Debug)]
pub struct SlotReport {
    pub slot: usize,
    pub entry: DirEntry,
    pub checksum_ok: bool,
}

#[derive(Clone, Debug)]
pub struct ImageReport {
    pub superblock: Superblock,
    /// Magic, version and checksum all hold
    pub superblock_ok: bool,
    pub image_len: u64,
    pub entries: Vec<SlotReport>,
}

impl ImageReport {
    /// Bytes past the last block the superblock accounts for
    pub fn trailing_bytes(&self) -> u64 {
        let formatted = self.superblock.total_blocks.max(1) * self.superblock.block_size as u64;
        self.image_len.saturating_sub(formatted)
    }
}

/// Decode the superblock and every occupied directory slot without
/// rejecting anything.
pub fn inspect<F>(image: &mut ImageFile<F>) -> Result<ImageReport>
where
    F: Read + Seek,
{
    let superblock = image.read_superblock()?;
    let image_len = image.len()?;
    let entries = DirOps::occupied_entries(image)?
        .into_iter()
        .map(|(slot, entry)| SlotReport {
            slot,
            checksum_ok: entry.verify_checksum(),
            entry,
        })
        .collect();

    Ok(ImageReport {
        superblock_ok: superblock.is_valid(),
        superblock,
        image_len,
        entries,
    })
}
