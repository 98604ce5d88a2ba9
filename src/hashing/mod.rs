use blake3::Hasher;

/// Sentinel fed into cache ids in place of a session for global entries.
pub const GLOBAL_SESSION_SENTINEL: &str = "-";

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// 64 bits is plenty for point ids: with the birthday bound at ~4.3 billion
/// items, collision probability stays negligible for realistic index sizes
/// (millions of blocks), and a collision degrades to one block shadowing
/// another in the index rather than data corruption.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Derives the vector-index point id for a conversation block.
#[inline]
pub fn block_point_id(block_id: &str) -> u64 {
    hash_to_u64(block_id.as_bytes())
}

/// Derives the deterministic cache point id from (scope, session, raw query).
///
/// Repeating the exact same triple yields the same id, so a re-set overwrites
/// instead of duplicating. The separator keeps `("ab", "c")` and `("a", "bc")`
/// distinct.
#[inline]
pub fn cache_point_id(scope: &str, session_id: Option<&str>, query: &str) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(scope.as_bytes());
    hasher.update(b"|");
    hasher.update(session_id.unwrap_or(GLOBAL_SESSION_SENTINEL).as_bytes());
    hasher.update(b"|");
    hasher.update(query.as_bytes());

    let hash = hasher.finalize();
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}
