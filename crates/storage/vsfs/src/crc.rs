//! Checksums used by the on-disk records.
//!
//! CRC32 (IEEE, reflected) protects the superblock and inodes. Directory
//! entries carry a one-byte XOR fold instead.

use crate::DIRENT_SIZE;

// ============================================================================
// CRC32 - IEEE polynomial
// ============================================================================

const CRC32_POLY: u32 = 0xEDB88320;

/// Lookup table, built at compile time
static CRC32_TABLE: [u32; 256] = crc32_table();

/// Build the 256-entry table for the reflected IEEE polynomial
pub const fn crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC32_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Calculate CRC32 of data
///
/// Records that embed their own checksum must have that field zeroed by the
/// caller before the bytes are passed in.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFFFFFF_u32;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

// ============================================================================
// XOR FOLD - directory entries
// ============================================================================

/// XOR of the first 63 bytes of a directory entry.
///
/// Byte 63 is the checksum slot itself and is never folded in.
pub fn xor_checksum63(entry: &[u8; DIRENT_SIZE]) -> u8 {
    entry[..DIRENT_SIZE - 1].iter().fold(0u8, |acc, &b| acc ^ b)
}
