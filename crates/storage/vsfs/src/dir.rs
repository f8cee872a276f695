//! Root directory slot scanning.
//!
//! The root directory is a dense array of 64 [`DirEntry`] records filling
//! block 1. There is no index: lookups and allocation are linear scans in
//! slot order, and the first eligible slot always wins.

use std::io::{Read, Seek, Write};

use log::debug;

use crate::error::Result;
use crate::image::ImageFile;
use crate::structures::DirEntry;
use crate::{BLOCK_SIZE, DIRENT_SIZE, DIR_ENTRIES, ROOT_DIR_BLOCK};

/// Directory operations on the root directory block
pub struct DirOps;

impl DirOps {
    /// Byte offset of `slot` within the image
    pub fn slot_offset(slot: usize) -> u64 {
        ROOT_DIR_BLOCK * BLOCK_SIZE as u64 + (slot * DIRENT_SIZE) as u64
    }

    /// Read one slot. `None` means the image ends inside the slot.
    pub fn read_slot<F>(image: &mut ImageFile<F>, slot: usize) -> Result<Option<DirEntry>>
    where
        F: Read + Seek,
    {
        let mut buf = [0u8; DIRENT_SIZE];
        if !image.read_at(Self::slot_offset(slot), &mut buf)? {
            return Ok(None);
        }
        DirEntry::from_bytes(&buf).map(Some)
    }

    pub fn write_slot<F>(image: &mut ImageFile<F>, slot: usize, entry: &DirEntry) -> Result<()>
    where
        F: Read + Write + Seek,
    {
        debug!(
            "writing '{}' to slot {} (offset {})",
            entry.name_lossy(),
            slot,
            Self::slot_offset(slot)
        );
        image.write_at(Self::slot_offset(slot), &entry.to_bytes())
    }

    /// First occupied slot whose name matches `name`.
    ///
    /// Stops at the first short read; slots past the end of the image cannot
    /// hold a name.
    pub fn find_duplicate<F>(image: &mut ImageFile<F>, name: &[u8]) -> Result<Option<usize>>
    where
        F: Read + Seek,
    {
        for slot in 0..DIR_ENTRIES {
            let Some(entry) = Self::read_slot(image, slot)? else {
                break;
            };
            if !entry.is_free() && entry.name_matches(name) {
                debug!("duplicate '{}' in slot {}", entry.name_lossy(), slot);
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    /// First slot that is free (`inode_no == 0`) or that the image ends
    /// inside. `None` when all 64 slots are occupied.
    pub fn find_free_slot<F>(image: &mut ImageFile<F>) -> Result<Option<usize>>
    where
        F: Read + Seek,
    {
        for slot in 0..DIR_ENTRIES {
            match Self::read_slot(image, slot)? {
                None => {
                    debug!("slot {} is past the end of the image, using it", slot);
                    return Ok(Some(slot));
                }
                Some(entry) if entry.is_free() => return Ok(Some(slot)),
                Some(_) => {}
            }
        }
        Ok(None)
    }

    /// Every occupied slot in slot order, up to the first short read
    pub fn occupied_entries<F>(image: &mut ImageFile<F>) -> Result<Vec<(usize, DirEntry)>>
    where
        F: Read + Seek,
    {
        let mut entries = Vec::new();
        for slot in 0..DIR_ENTRIES {
            let Some(entry) = Self::read_slot(image, slot)? else {
                break;
            };
            if !entry.is_free() {
                entries.push((slot, entry));
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn blank_image(len: usize) -> ImageFile<Cursor<Vec<u8>>> {
        ImageFile::new(Cursor::new(vec![0u8; len]))
    }

    fn two_blocks() -> ImageFile<Cursor<Vec<u8>>> {
        blank_image(2 * BLOCK_SIZE as usize)
    }

    #[test]
    fn test_slot_offsets() {
        assert_eq!(DirOps::slot_offset(0), 4096);
        assert_eq!(DirOps::slot_offset(1), 4160);
        assert_eq!(DirOps::slot_offset(63), 4096 + 63 * 64);
    }

    #[test]
    fn test_free_slot_order() {
        let mut image = two_blocks();
        assert_eq!(DirOps::find_free_slot(&mut image).unwrap(), Some(0));

        DirOps::write_slot(&mut image, 0, &DirEntry::new_file(b"a")).unwrap();
        DirOps::write_slot(&mut image, 2, &DirEntry::new_file(b"c")).unwrap();
        // Slot 1 is the first hole
        assert_eq!(DirOps::find_free_slot(&mut image).unwrap(), Some(1));
    }

    #[test]
    fn test_full_directory() {
        let mut image = two_blocks();
        for slot in 0..DIR_ENTRIES {
            let name = format!("f{slot}");
            DirOps::write_slot(&mut image, slot, &DirEntry::new_file(name.as_bytes())).unwrap();
        }
        assert_eq!(DirOps::find_free_slot(&mut image).unwrap(), None);
        assert_eq!(DirOps::occupied_entries(&mut image).unwrap().len(), DIR_ENTRIES);
    }

    #[test]
    fn test_short_directory_block() {
        // Three whole slots, then a partial one
        let len = BLOCK_SIZE as usize + 3 * DIRENT_SIZE + 10;
        let mut image = blank_image(len);
        for slot in 0..3 {
            DirOps::write_slot(&mut image, slot, &DirEntry::new_file(b"x")).unwrap();
        }
        assert!(DirOps::read_slot(&mut image, 3).unwrap().is_none());
        assert_eq!(DirOps::find_free_slot(&mut image).unwrap(), Some(3));
        assert_eq!(DirOps::occupied_entries(&mut image).unwrap().len(), 3);
    }

    #[test]
    fn test_superblock_only_image() {
        let mut image = blank_image(BLOCK_SIZE as usize);
        assert_eq!(DirOps::find_free_slot(&mut image).unwrap(), Some(0));
        assert_eq!(DirOps::find_duplicate(&mut image, b"x").unwrap(), None);
    }

    #[test]
    fn test_find_duplicate() {
        let mut image = two_blocks();
        DirOps::write_slot(&mut image, 0, &DirEntry::new_file(b"one")).unwrap();
        DirOps::write_slot(&mut image, 5, &DirEntry::new_file(b"two")).unwrap();

        assert_eq!(DirOps::find_duplicate(&mut image, b"one").unwrap(), Some(0));
        assert_eq!(DirOps::find_duplicate(&mut image, b"two").unwrap(), Some(5));
        assert_eq!(DirOps::find_duplicate(&mut image, b"three").unwrap(), None);
    }

    #[test]
    fn test_free_slot_name_is_ignored() {
        // A name left in a free slot never counts as a duplicate
        let mut image = two_blocks();
        let mut stale = DirEntry::new_file(b"ghost");
        stale.inode_no = 0;
        DirOps::write_slot(&mut image, 0, &stale).unwrap();

        assert_eq!(DirOps::find_duplicate(&mut image, b"ghost").unwrap(), None);
        assert_eq!(DirOps::find_free_slot(&mut image).unwrap(), Some(0));
    }
}
