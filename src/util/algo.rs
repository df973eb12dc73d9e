/// One's-complement of the byte sum over `buf`, masked to 8 bits.
#[inline]
pub fn checksum_calc(buf: &[u8]) -> u8 {
    !buf.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}
