//! Content fingerprinting.

/// FNV-1a hash of `content`.
///
/// Used both as the content hash of indexed files and to derive symbol ids
/// from USR strings. Stable across runs and platforms, which matters because
/// hashes are persisted in the disk cache.
pub fn compute_hash(content: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in content {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
