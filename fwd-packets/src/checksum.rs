//! The 16 bit one's complement Internet checksum (RFC 1071) and its incremental update (RFC 1624).

// Folds carries back into the low 16 bits until none are left
fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

/// One's complement sum of `data` taken as big-endian 16 bit words. An odd trailing byte is
/// padded with a zero.
pub fn ones_complement_sum(data: &[u8]) -> u16 {
    let mut chunks = data.chunks_exact(2);
    let mut sum = chunks.by_ref().fold(0u32, |acc, word| {
        acc + u32::from(u16::from_be_bytes([word[0], word[1]]))
    });
    if let [last] = chunks.remainder() {
        sum += u32::from(u16::from_be_bytes([*last, 0]));
    }
    fold(sum)
}

/// Checksum to store in a header whose checksum field is currently zero.
pub fn internet_checksum(data: &[u8]) -> u16 {
    !ones_complement_sum(data)
}

/// A region that includes its own checksum field is valid when it sums to all ones.
pub fn verify_checksum(data: &[u8]) -> bool {
    ones_complement_sum(data) == 0xFFFF
}

/// Recomputes `checksum` after one 16 bit word of the covered data changed from `old_word` to
/// `new_word`, without touching the rest of the data: HC' = ~(~HC + ~m + m').
pub fn incremental_update(checksum: u16, old_word: u16, new_word: u16) -> u16 {
    let sum = u32::from(!checksum) + u32::from(!old_word) + u32::from(new_word);
    !fold(sum)
}
