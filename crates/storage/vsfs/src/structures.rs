//! MiniVSFS On-Disk Structures
//!
//! All records are packed little-endian with no padding between fields.
//! They are encoded and decoded field by field at fixed offsets.

use std::borrow::Cow;

use crate::crc::{crc32, xor_checksum63};
use crate::error::{Result, VsfsError};
use crate::{
    BLOCK_SIZE, DIRECT_MAX, DIRENT_SIZE, INODE_SIZE, MAX_FILENAME, NAME_FIELD_LEN, ROOT_INODE,
    SUPERBLOCK_SIZE, VSFS_MAGIC, VSFS_VERSION,
};

// ============================================================================
// SUPERBLOCK (Block 0)
// ============================================================================

/// Superblock - stored at the start of block 0
///
/// Size: 112 bytes
///
/// ```text
/// 0x00 magic         u32     0x3C inode_table_start/blocks  2 x u64
/// 0x04 version       u32     0x4C data_region_start/blocks  2 x u64
/// 0x08 block_size    u32     0x5C root_inode                u64
/// 0x0C total_blocks  u64     0x64 mtime_epoch               u64
/// 0x14 inode_count   u64     0x6C checksum                  u32
/// 0x1C inode_bitmap_start/blocks  2 x u64
/// 0x2C data_bitmap_start/blocks   2 x u64
/// ```
///
/// The bitmap, inode table and data region descriptors are carried for
/// format compatibility. Nothing in this crate fills them in or reads them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Superblock {
    pub magic: u32,
    pub version: u32,
    pub block_size: u32,
    pub total_blocks: u64,
    pub inode_count: u64,
    pub inode_bitmap_start: u64,
    pub inode_bitmap_blocks: u64,
    pub data_bitmap_start: u64,
    pub data_bitmap_blocks: u64,
    pub inode_table_start: u64,
    pub inode_table_blocks: u64,
    pub data_region_start: u64,
    pub data_region_blocks: u64,
    pub root_inode: u64,
    pub mtime_epoch: u64,
    pub checksum: u32,
}

/// Offset of the checksum field; everything before it is covered
pub const SUPERBLOCK_CRC_OFFSET: usize = 108;

impl Superblock {
    /// Create a superblock for an image of `total_blocks` blocks.
    ///
    /// The checksum is left at zero; call [`Superblock::update_crc`] once all
    /// fields are final.
    pub fn new(total_blocks: u64, inode_count: u64, mtime_epoch: u64) -> Self {
        Self {
            magic: VSFS_MAGIC,
            version: VSFS_VERSION,
            block_size: BLOCK_SIZE,
            total_blocks,
            inode_count,
            inode_bitmap_start: 0,
            inode_bitmap_blocks: 0,
            data_bitmap_start: 0,
            data_bitmap_blocks: 0,
            inode_table_start: 0,
            inode_table_blocks: 0,
            data_region_start: 0,
            data_region_blocks: 0,
            root_inode: ROOT_INODE,
            mtime_epoch,
            checksum: 0,
        }
    }

    /// Create a superblock sized from a KiB count (`size_kib * 1024 / 4096`,
    /// rounded down).
    pub fn for_size_kib(size_kib: u64, inode_count: u64, mtime_epoch: u64) -> Self {
        Self::new(blocks_for_kib(size_kib), inode_count, mtime_epoch)
    }

    pub fn to_bytes(&self) -> [u8; SUPERBLOCK_SIZE] {
        let mut b = [0u8; SUPERBLOCK_SIZE];
        put_u32(&mut b, 0, self.magic);
        put_u32(&mut b, 4, self.version);
        put_u32(&mut b, 8, self.block_size);
        put_u64(&mut b, 12, self.total_blocks);
        put_u64(&mut b, 20, self.inode_count);
        put_u64(&mut b, 28, self.inode_bitmap_start);
        put_u64(&mut b, 36, self.inode_bitmap_blocks);
        put_u64(&mut b, 44, self.data_bitmap_start);
        put_u64(&mut b, 52, self.data_bitmap_blocks);
        put_u64(&mut b, 60, self.inode_table_start);
        put_u64(&mut b, 68, self.inode_table_blocks);
        put_u64(&mut b, 76, self.data_region_start);
        put_u64(&mut b, 84, self.data_region_blocks);
        put_u64(&mut b, 92, self.root_inode);
        put_u64(&mut b, 100, self.mtime_epoch);
        put_u32(&mut b, SUPERBLOCK_CRC_OFFSET, self.checksum);
        b
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let b = ensure_len(data, SUPERBLOCK_SIZE, "superblock")?;
        Ok(Self {
            magic: get_u32(b, 0),
            version: get_u32(b, 4),
            block_size: get_u32(b, 8),
            total_blocks: get_u64(b, 12),
            inode_count: get_u64(b, 20),
            inode_bitmap_start: get_u64(b, 28),
            inode_bitmap_blocks: get_u64(b, 36),
            data_bitmap_start: get_u64(b, 44),
            data_bitmap_blocks: get_u64(b, 52),
            inode_table_start: get_u64(b, 60),
            inode_table_blocks: get_u64(b, 68),
            data_region_start: get_u64(b, 76),
            data_region_blocks: get_u64(b, 84),
            root_inode: get_u64(b, 92),
            mtime_epoch: get_u64(b, 100),
            checksum: get_u32(b, SUPERBLOCK_CRC_OFFSET),
        })
    }

    /// CRC32 over all 112 bytes with the checksum field taken as zero
    pub fn calculate_crc(&self) -> u32 {
        let mut bytes = self.to_bytes();
        bytes[SUPERBLOCK_CRC_OFFSET..].fill(0);
        crc32(&bytes)
    }

    /// Calculate and set CRC
    pub fn update_crc(&mut self) -> u32 {
        self.checksum = self.calculate_crc();
        self.checksum
    }

    pub fn verify_crc(&self) -> bool {
        self.checksum == self.calculate_crc()
    }

    /// Check magic, version and checksum, reporting the first that fails
    pub fn validate(&self) -> Result<()> {
        if self.magic != VSFS_MAGIC {
            return Err(VsfsError::BadMagic { found: self.magic });
        }
        if self.version != VSFS_VERSION {
            return Err(VsfsError::UnsupportedVersion {
                found: self.version,
            });
        }
        let computed = self.calculate_crc();
        if self.checksum != computed {
            return Err(VsfsError::SuperblockChecksum {
                stored: self.checksum,
                computed,
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Whole blocks that fit in `size_kib` KiB
pub const fn blocks_for_kib(size_kib: u64) -> u64 {
    size_kib / (BLOCK_SIZE as u64 / 1024)
}

// ============================================================================
// INODE (inode table, reserved)
// ============================================================================

/// Inode - 128 bytes
///
/// No operation allocates or writes inodes yet; the record is defined so the
/// inode table region has a fixed contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Inode {
    pub mode: u16,
    pub links: u16,
    pub uid: u32,
    pub gid: u32,
    pub size_bytes: u64,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
    pub direct: [u32; DIRECT_MAX],
    pub reserved_0: u32,
    pub reserved_1: u32,
    pub reserved_2: u32,
    pub proj_id: u32,
    pub uid16_gid16: u32,
    pub xattr_ptr: u64,
    /// CRC32 in the low 32 bits
    pub inode_crc: u64,
}

/// Bytes covered by the inode CRC
pub const INODE_CRC_OFFSET: usize = 120;

impl Inode {
    pub fn to_bytes(&self) -> [u8; INODE_SIZE] {
        let mut b = [0u8; INODE_SIZE];
        put_u16(&mut b, 0, self.mode);
        put_u16(&mut b, 2, self.links);
        put_u32(&mut b, 4, self.uid);
        put_u32(&mut b, 8, self.gid);
        put_u64(&mut b, 12, self.size_bytes);
        put_u64(&mut b, 20, self.atime);
        put_u64(&mut b, 28, self.mtime);
        put_u64(&mut b, 36, self.ctime);
        for (i, ptr) in self.direct.iter().enumerate() {
            put_u32(&mut b, 44 + i * 4, *ptr);
        }
        put_u32(&mut b, 92, self.reserved_0);
        put_u32(&mut b, 96, self.reserved_1);
        put_u32(&mut b, 100, self.reserved_2);
        put_u32(&mut b, 104, self.proj_id);
        put_u32(&mut b, 108, self.uid16_gid16);
        put_u64(&mut b, 112, self.xattr_ptr);
        put_u64(&mut b, INODE_CRC_OFFSET, self.inode_crc);
        b
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let b = ensure_len(data, INODE_SIZE, "inode")?;
        let mut direct = [0u32; DIRECT_MAX];
        for (i, ptr) in direct.iter_mut().enumerate() {
            *ptr = get_u32(b, 44 + i * 4);
        }
        Ok(Self {
            mode: get_u16(b, 0),
            links: get_u16(b, 2),
            uid: get_u32(b, 4),
            gid: get_u32(b, 8),
            size_bytes: get_u64(b, 12),
            atime: get_u64(b, 20),
            mtime: get_u64(b, 28),
            ctime: get_u64(b, 36),
            direct,
            reserved_0: get_u32(b, 92),
            reserved_1: get_u32(b, 96),
            reserved_2: get_u32(b, 100),
            proj_id: get_u32(b, 104),
            uid16_gid16: get_u32(b, 108),
            xattr_ptr: get_u64(b, 112),
            inode_crc: get_u64(b, INODE_CRC_OFFSET),
        })
    }

    /// CRC32 over bytes `[0,120)`
    pub fn calculate_crc(&self) -> u32 {
        let bytes = self.to_bytes();
        crc32(&bytes[..INODE_CRC_OFFSET])
    }

    pub fn update_crc(&mut self) -> u32 {
        let crc = self.calculate_crc();
        self.inode_crc = crc as u64;
        crc
    }

    pub fn verify_crc(&self) -> bool {
        self.inode_crc == self.calculate_crc() as u64
    }
}

// ============================================================================
// DIRECTORY ENTRY (Block 1)
// ============================================================================

/// Type of directory entry
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryType {
    Unknown = 0,
    /// Regular file, the only type ever written
    File = 1,
}

impl EntryType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => EntryType::File,
            _ => EntryType::Unknown,
        }
    }
}

/// Inode number recorded in every entry written by this crate.
///
/// Entries are not individually addressable by inode: all of them point at
/// the root inode.
pub const SHARED_ENTRY_INODE: u32 = ROOT_INODE as u32;

/// Directory entry - 64 bytes, 64 per root directory block
///
/// `inode_no == 0` marks a free slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub inode_no: u32,
    pub entry_type: u8,
    /// NUL-padded; not terminated when all 58 bytes are used
    pub name: [u8; NAME_FIELD_LEN],
    /// XOR of bytes `[0,63)`
    pub checksum: u8,
}

const DIRENT_NAME_OFFSET: usize = 5;
const DIRENT_CHECKSUM_OFFSET: usize = DIRENT_SIZE - 1;

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            inode_no: 0,
            entry_type: EntryType::Unknown as u8,
            name: [0; NAME_FIELD_LEN],
            checksum: 0,
        }
    }
}

impl DirEntry {
    /// Build a finalized regular-file entry.
    ///
    /// Names longer than 57 bytes are cut; byte 57 of the field is always NUL.
    pub fn new_file(name: &[u8]) -> Self {
        let mut entry = Self {
            inode_no: SHARED_ENTRY_INODE,
            entry_type: EntryType::File as u8,
            ..Self::default()
        };
        let len = name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(name.len())
            .min(MAX_FILENAME);
        entry.name[..len].copy_from_slice(&name[..len]);
        entry.update_checksum();
        entry
    }

    pub fn is_free(&self) -> bool {
        self.inode_no == 0
    }

    pub fn entry_type(&self) -> EntryType {
        EntryType::from_u8(self.entry_type)
    }

    /// Name bytes up to the first NUL
    pub fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_FIELD_LEN);
        &self.name[..len]
    }

    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    /// Bounded C-string comparison over the 58-byte field.
    ///
    /// `candidate` behaves as if NUL-terminated. A candidate longer than 57
    /// bytes never matches a name stored by [`DirEntry::new_file`], since the
    /// stored copy ends at byte 57.
    pub fn name_matches(&self, candidate: &[u8]) -> bool {
        for (i, &stored) in self.name.iter().enumerate() {
            let other = candidate.get(i).copied().unwrap_or(0);
            if stored != other {
                return false;
            }
            if stored == 0 {
                return true;
            }
        }
        true
    }

    pub fn to_bytes(&self) -> [u8; DIRENT_SIZE] {
        let mut b = [0u8; DIRENT_SIZE];
        put_u32(&mut b, 0, self.inode_no);
        b[4] = self.entry_type;
        b[DIRENT_NAME_OFFSET..DIRENT_CHECKSUM_OFFSET].copy_from_slice(&self.name);
        b[DIRENT_CHECKSUM_OFFSET] = self.checksum;
        b
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let b = ensure_len(data, DIRENT_SIZE, "directory entry")?;
        let mut name = [0u8; NAME_FIELD_LEN];
        name.copy_from_slice(&b[DIRENT_NAME_OFFSET..DIRENT_CHECKSUM_OFFSET]);
        Ok(Self {
            inode_no: get_u32(b, 0),
            entry_type: b[4],
            name,
            checksum: b[DIRENT_CHECKSUM_OFFSET],
        })
    }

    pub fn calculate_checksum(&self) -> u8 {
        xor_checksum63(&self.to_bytes())
    }

    pub fn update_checksum(&mut self) -> u8 {
        self.checksum = self.calculate_checksum();
        self.checksum
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum == self.calculate_checksum()
    }
}

// ============================================================================
// FIELD HELPERS
// ============================================================================

fn ensure_len<'a>(data: &'a [u8], need: usize, what: &'static str) -> Result<&'a [u8]> {
    if data.len() < need {
        return Err(VsfsError::Truncated {
            what,
            need,
            got: data.len(),
        });
    }
    Ok(&data[..need])
}

fn get_u16(b: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([b[off], b[off + 1]])
}

fn get_u32(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

fn get_u64(b: &[u8], off: usize) -> u64 {
    u64::from_le_bytes([
        b[off],
        b[off + 1],
        b[off + 2],
        b[off + 3],
        b[off + 4],
        b[off + 5],
        b[off + 6],
        b[off + 7],
    ])
}

fn put_u16(b: &mut [u8], off: usize, v: u16) {
    b[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(b: &mut [u8], off: usize, v: u32) {
    b[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_u64(b: &mut [u8], off: usize, v: u64) {
    b[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

// ============================================================================
// COMPILE-TIME CHECKS
// ============================================================================

const _: () = assert!(SUPERBLOCK_CRC_OFFSET + 4 == SUPERBLOCK_SIZE);
const _: () = assert!(INODE_CRC_OFFSET + 8 == INODE_SIZE);
const _: () = assert!(DIRENT_NAME_OFFSET + NAME_FIELD_LEN + 1 == DIRENT_SIZE);
const _: () = assert!(44 + DIRECT_MAX * 4 == 92);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superblock_layout() {
        let mut sb = Superblock::new(16, 32, 0x1122_3344_5566_7788);
        sb.update_crc();
        let b = sb.to_bytes();
        assert_eq!(&b[0..4], &VSFS_MAGIC.to_le_bytes());
        assert_eq!(&b[8..12], &4096u32.to_le_bytes());
        assert_eq!(&b[12..20], &16u64.to_le_bytes());
        assert_eq!(&b[20..28], &32u64.to_le_bytes());
        assert_eq!(&b[92..100], &1u64.to_le_bytes());
        assert_eq!(&b[100..108], &0x1122_3344_5566_7788u64.to_le_bytes());
        assert_eq!(&b[108..112], &sb.checksum.to_le_bytes());
        assert_eq!(Superblock::from_bytes(&b).unwrap(), sb);
    }

    #[test]
    fn test_superblock_crc() {
        let mut sb = Superblock::for_size_kib(64, 16, 1_700_000_000);
        assert_eq!(sb.total_blocks, 16);
        let crc = sb.update_crc();
        assert!(sb.verify_crc());

        // Recomputing over the zeroed-field record reproduces the stored value
        let mut zeroed = sb.to_bytes();
        zeroed[SUPERBLOCK_CRC_OFFSET..].fill(0);
        assert_eq!(crc32(&zeroed), crc);
        assert_eq!(sb.calculate_crc(), crc);

        sb.total_blocks = 17;
        assert!(!sb.verify_crc());
    }

    #[test]
    fn test_superblock_validate() {
        let mut sb = Superblock::new(16, 16, 0);
        sb.update_crc();
        assert!(sb.is_valid());

        let mut bad = sb;
        bad.magic = 0xDEAD_BEEF;
        assert!(matches!(bad.validate(), Err(VsfsError::BadMagic { found: 0xDEAD_BEEF })));

        let mut bad = sb;
        bad.version = 2;
        bad.update_crc();
        assert!(matches!(bad.validate(), Err(VsfsError::UnsupportedVersion { found: 2 })));

        let mut bad = sb;
        bad.checksum ^= 1;
        assert!(matches!(bad.validate(), Err(VsfsError::SuperblockChecksum { .. })));
    }

    #[test]
    fn test_blocks_for_kib_rounds_down() {
        assert_eq!(blocks_for_kib(0), 0);
        assert_eq!(blocks_for_kib(3), 0);
        assert_eq!(blocks_for_kib(4), 1);
        assert_eq!(blocks_for_kib(7), 1);
        assert_eq!(blocks_for_kib(1024), 256);
    }

    #[test]
    fn test_truncated_record() {
        let err = Superblock::from_bytes(&[0u8; 100]).unwrap_err();
        assert!(matches!(
            err,
            VsfsError::Truncated { need: 112, got: 100, .. }
        ));
        assert!(DirEntry::from_bytes(&[0u8; 63]).is_err());
        assert!(Inode::from_bytes(&[0u8; 127]).is_err());
    }

    #[test]
    fn test_inode_crc() {
        let mut ino = Inode {
            mode: 0o100644,
            links: 1,
            size_bytes: 10,
            ..Inode::default()
        };
        ino.direct[0] = 7;
        ino.direct[11] = 9;
        let crc = ino.update_crc();
        assert!(ino.verify_crc());

        let bytes = ino.to_bytes();
        assert_eq!(crc32(&bytes[..INODE_CRC_OFFSET]), crc);
        assert_eq!(&bytes[120..124], &crc.to_le_bytes());
        assert_eq!(&bytes[124..128], &[0u8; 4]);
        assert_eq!(&bytes[44..48], &7u32.to_le_bytes());
        assert_eq!(&bytes[88..92], &9u32.to_le_bytes());

        let back = Inode::from_bytes(&bytes).unwrap();
        assert_eq!(back, ino);

        ino.size_bytes = 11;
        assert!(!ino.verify_crc());
    }

    #[test]
    fn test_dirent_new_file() {
        let entry = DirEntry::new_file(b"hello.txt");
        assert_eq!(entry.inode_no, 1);
        assert_eq!(entry.entry_type(), EntryType::File);
        assert_eq!(entry.name_bytes(), b"hello.txt");
        assert!(entry.name[9..].iter().all(|&b| b == 0));
        assert!(entry.verify_checksum());

        let bytes = entry.to_bytes();
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(bytes[4], 1);
        assert_eq!(&bytes[5..14], b"hello.txt");
        assert_eq!(bytes[63], xor_checksum63(&bytes));
    }

    #[test]
    fn test_dirent_checksum_detects_corruption() {
        let entry = DirEntry::new_file(b"notes.md");
        let good = entry.to_bytes();
        for i in 0..DIRENT_SIZE - 1 {
            let mut corrupt = good;
            corrupt[i] ^= 0x5A;
            let parsed = DirEntry::from_bytes(&corrupt).unwrap();
            assert!(!parsed.verify_checksum(), "byte {i} corruption undetected");
        }
    }

    #[test]
    fn test_dirent_long_name_truncated() {
        let long = [b'x'; 80];
        let entry = DirEntry::new_file(&long);
        assert_eq!(entry.name_bytes().len(), MAX_FILENAME);
        assert_eq!(entry.name[MAX_FILENAME], 0);
        assert!(entry.verify_checksum());

        // The full candidate differs at byte 57 from the stored copy
        assert!(!entry.name_matches(&long));
        assert!(entry.name_matches(&long[..MAX_FILENAME]));
    }

    #[test]
    fn test_dirent_name_matches() {
        let entry = DirEntry::new_file(b"a.txt");
        assert!(entry.name_matches(b"a.txt"));
        assert!(!entry.name_matches(b"a.tx"));
        assert!(!entry.name_matches(b"a.txt2"));
        assert!(!entry.name_matches(b"b.txt"));

        // Full 58-byte field with no terminator
        let mut full = DirEntry::default();
        full.inode_no = 1;
        full.name = [b'z'; NAME_FIELD_LEN];
        assert!(full.name_matches(&[b'z'; NAME_FIELD_LEN]));
        assert!(full.name_matches(&[b'z'; NAME_FIELD_LEN + 3]));
        assert_eq!(full.name_bytes().len(), NAME_FIELD_LEN);
    }

    #[test]
    fn test_free_entry() {
        let entry = DirEntry::from_bytes(&[0u8; DIRENT_SIZE]).unwrap();
        assert!(entry.is_free());
        assert_eq!(entry, DirEntry::default());
    }
}
