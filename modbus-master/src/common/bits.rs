/// number of bytes needed to pack `count` bits
pub(crate) fn num_bytes_for_bits(count: u16) -> usize {
    (count as usize + 7) / 8
}

/// pack bits LSB-first, bit n of the input lands in byte n/8 at position n%8
pub(crate) fn pack(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; (bits.len() + 7) / 8];
    for (pos, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[pos / 8] |= 1 << (pos % 8);
        }
    }
    bytes
}

/// unpack the first `count` bits, or None if `bytes` is too short
pub(crate) fn unpack(bytes: &[u8], count: u16) -> Option<Vec<bool>> {
    if bytes.len() < num_bytes_for_bits(count) {
        return None;
    }
    let bits = (0..count as usize)
        .map(|pos| bytes[pos / 8] & (1 << (pos % 8)) != 0)
        .collect();
    Some(bits)
}
