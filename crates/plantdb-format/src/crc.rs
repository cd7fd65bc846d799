use crc32fast::Hasher as Crc32;

/// IEEE CRC32 (reflected, init and xorout 0xFFFFFFFF) over `bytes`.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(bytes);
    hasher.finalize()
}
