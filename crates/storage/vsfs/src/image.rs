//! Image container access and image creation.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::error::{Result, VsfsError};
use crate::structures::Superblock;
use crate::{BLOCK_SIZE, SUPERBLOCK_SIZE};

const ZERO_BLOCK: [u8; BLOCK_SIZE as usize] = [0; BLOCK_SIZE as usize];

// ============================================================================
// IMAGE FILE
// ============================================================================

/// A MiniVSFS image. Reads need only `Read + Seek`; updates also need `Write`.
///
/// Works over anything seekable so tests can run against an in-memory
/// `Cursor<Vec<u8>>`. No state is cached: every call goes back to the
/// underlying container.
pub struct ImageFile<F> {
    inner: F,
}

impl ImageFile<File> {
    /// Open an existing image for read+write
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| VsfsError::OpenImage {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(file))
    }

    /// Open an existing image for reading only
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| VsfsError::OpenImage {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(file))
    }

    pub fn sync(&mut self) -> Result<()> {
        self.inner.sync_all()?;
        Ok(())
    }
}

impl<F> ImageFile<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: Read + Seek> ImageFile<F> {
    /// Current image length in bytes
    pub fn len(&mut self) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Fill `buf` from `offset`.
    ///
    /// Returns `false` when the image ends before `buf` is full; the contents
    /// of `buf` are then unspecified.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<bool> {
        self.inner.seek(SeekFrom::Start(offset))?;
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the superblock without checking it
    pub fn read_superblock(&mut self) -> Result<Superblock> {
        let mut buf = [0u8; SUPERBLOCK_SIZE];
        if !self.read_at(0, &mut buf)? {
            let got = self.len()?.min(SUPERBLOCK_SIZE as u64) as usize;
            return Err(VsfsError::Truncated {
                what: "superblock",
                need: SUPERBLOCK_SIZE,
                got,
            });
        }
        Superblock::from_bytes(&buf)
    }

    /// Read the superblock and reject it unless magic, version and checksum
    /// all hold
    pub fn read_valid_superblock(&mut self) -> Result<Superblock> {
        let sb = self.read_superblock()?;
        sb.validate()?;
        Ok(sb)
    }
}

impl<F: Read + Write + Seek> ImageFile<F> {
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(data)?;
        Ok(())
    }

    /// Copy everything `source` yields onto the end of the image, one block
    /// at a time. Returns the new image length.
    pub fn append_from<R: Read>(&mut self, mut source: R) -> Result<u64> {
        let mut end = self.inner.seek(SeekFrom::End(0))?;
        let mut buf = [0u8; BLOCK_SIZE as usize];
        loop {
            let n = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.inner.write_all(&buf[..n])?;
            end += n as u64;
        }
        self.inner.flush()?;
        Ok(end)
    }
}

// ============================================================================
// IMAGE CREATION
// ============================================================================

/// Write a fresh image: block 0 holds `sb` padded with zeros, followed by
/// `total_blocks - 1` zero blocks.
///
/// Block 0 is always written, even when `total_blocks` is 0.
pub fn format_image<W: Write>(out: &mut W, sb: &Superblock) -> io::Result<()> {
    let mut block = [0u8; BLOCK_SIZE as usize];
    block[..SUPERBLOCK_SIZE].copy_from_slice(&sb.to_bytes());
    out.write_all(&block)?;

    for _ in 1..sb.total_blocks {
        out.write_all(&ZERO_BLOCK)?;
    }
    out.flush()
}

/// Create (or truncate) the image at `path`.
///
/// Sizes are taken as given. An image under two blocks has no room for the
/// root directory but is still written.
pub fn create_image(path: &Path, size_kib: u64, inode_count: u64) -> Result<Superblock> {
    let mut sb = Superblock::for_size_kib(size_kib, inode_count, now_epoch());
    sb.update_crc();

    debug!(
        "creating {}: {} blocks of {} bytes, {} inodes, crc {:#010x}",
        path.display(),
        sb.total_blocks,
        BLOCK_SIZE,
        sb.inode_count,
        sb.checksum
    );

    let create_err = |source: io::Error| VsfsError::Create {
        path: path.to_path_buf(),
        source,
    };

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(create_err)?;

    let mut out = BufWriter::new(file);
    format_image(&mut out, &sb).map_err(create_err)?;
    let file = out.into_inner().map_err(|e| create_err(e.into_error()))?;
    file.sync_all().map_err(create_err)?;

    info!("created image {} ({} blocks)", path.display(), sb.total_blocks);
    Ok(sb)
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
