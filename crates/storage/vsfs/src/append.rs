//! Adding a file to an image.
//!
//! Content goes onto the end of the image as a raw byte stream; it is not
//! block-aligned and no size or block pointer records where it lives. The
//! root directory entry is the only trace of the file.

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use log::{debug, info, warn};

use crate::dir::DirOps;
use crate::error::{Result, VsfsError};
use crate::image::ImageFile;
use crate::structures::DirEntry;

/// Result of a successful add
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddedFile {
    /// Directory slot the entry landed in
    pub slot: usize,
    /// Name as stored (at most 57 bytes)
    pub name: Vec<u8>,
    pub bytes_appended: u64,
    /// Image length after the append
    pub image_len: u64,
}

/// Final component of a `/`-separated path. A trailing `/` yields an empty
/// name.
pub fn basename(path: &[u8]) -> &[u8] {
    match path.iter().rposition(|&b| b == b'/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Add a file named `name` whose bytes come from `open_source`.
///
/// Steps run in this order:
/// 1. duplicate scan; a hit fails with the image untouched
/// 2. `open_source`; a failure leaves the image untouched
/// 3. append the source bytes at the current end of the image
/// 4. free-slot scan; a full directory fails *after* step 3, leaving the
///    appended bytes orphaned ([`VsfsError::DirectoryFull`])
/// 5. write the checksummed entry into the slot
pub fn add_file_with<F, R, O>(image: &mut ImageFile<F>, name: &[u8], open_source: O) -> Result<AddedFile>
where
    F: Read + Write + Seek,
    R: Read,
    O: FnOnce() -> Result<R>,
{
    if let Some(slot) = DirOps::find_duplicate(image, name)? {
        return Err(VsfsError::Duplicate {
            name: String::from_utf8_lossy(name).into_owned(),
            slot,
        });
    }

    let source = open_source()?;

    let start = image.len()?;
    let end = image.append_from(source)?;
    let bytes_appended = end - start;
    debug!("appended {} bytes at offset {}", bytes_appended, start);

    let entry = DirEntry::new_file(name);

    let Some(slot) = DirOps::find_free_slot(image)? else {
        warn!(
            "root directory full; {} bytes at offset {} are not referenced by any entry",
            bytes_appended, start
        );
        return Err(VsfsError::DirectoryFull {
            orphaned_bytes: bytes_appended,
        });
    };

    DirOps::write_slot(image, slot, &entry)?;

    Ok(AddedFile {
        slot,
        name: entry.name_bytes().to_vec(),
        bytes_appended,
        image_len: end,
    })
}

/// Add the file at `file_path` to the image at `image_path`.
///
/// The image superblock must be valid. Only the final path component is
/// used as the entry name.
pub fn add_file(image_path: &Path, file_path: &Path) -> Result<AddedFile> {
    let mut image = ImageFile::open(image_path)?;
    let sb = image.read_valid_superblock()?;
    debug!(
        "opened {}: {} blocks, mtime {}",
        image_path.display(),
        sb.total_blocks,
        sb.mtime_epoch
    );

    let name = basename(file_path.as_os_str().as_encoded_bytes()).to_vec();

    let added = add_file_with(&mut image, &name, || {
        File::open(file_path).map_err(|source| VsfsError::SourceOpen {
            path: file_path.to_path_buf(),
            source,
        })
    })?;
    image.sync()?;

    info!(
        "added '{}' to {} in slot {} ({} bytes)",
        String::from_utf8_lossy(&added.name),
        image_path.display(),
        added.slot,
        added.bytes_appended
    );
    Ok(added)
}
