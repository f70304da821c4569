//! Bit range access on 32-bit words.
//!
//! Indices run from 0 (least significant) to 31 (most significant) and ranges are inclusive on
//! both ends. Callers are expected to pass `start <= end <= 31`.

#[inline]
fn mask(start: u32, end: u32) -> u32 {
    debug_assert!(start <= end && end < 32);
    u32::MAX >> (31 - (end - start))
}

/// Value of bits `start..=end`, shifted down to bit 0.
#[inline]
pub fn get_bits(word: u32, start: u32, end: u32) -> u32 {
    (word >> start) & mask(start, end)
}

#[inline]
pub fn get_bit(word: u32, index: u32) -> bool {
    get_bits(word, index, index) != 0
}

/// Replace bits `start..=end` of `word` with the low bits of `value`.
#[inline]
pub fn set_bits_to(word: u32, start: u32, end: u32, value: u32) -> u32 {
    let field = mask(start, end) << start;
    (word & !field) | ((value << start) & field)
}

#[inline]
pub fn set_bit(word: u32, index: u32) -> u32 {
    word | (1 << index)
}

#[inline]
pub fn clear_bit(word: u32, index: u32) -> u32 {
    word & !(1 << index)
}

#[inline]
pub fn set_bit_to(word: u32, index: u32, value: bool) -> u32 {
    if value {
        set_bit(word, index)
    } else {
        clear_bit(word, index)
    }
}

/// Treat the low `bits` bits of `val` as a two's complement number and widen it to 32 bits.
#[inline]
pub fn sign_extend(val: u32, bits: u32) -> u32 {
    debug_assert!(bits > 0 && bits < 32);
    let shift = 32 - bits;
    (((val << shift) as i32) >> shift) as u32
}
