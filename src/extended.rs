//! The 80-bit IEEE 754 extended-precision field AIFF uses for its sample
//! rate: a 2-byte biased exponent followed by a 64-bit mantissa whose
//! leading 1 bit is explicit. Only non-negative integer rates are carried,
//! so both directions work on integers and never touch float math.

use crate::prelude::*;

const EXPONENT_BIAS: u16 = 16383;

/// Ten-byte patterns for the standard rates, as emitted by common AIFF
/// writers. Checked before the general decode path so files written by
/// this library and most others resolve by table lookup.
const STANDARD_RATES: [(u32, [u8; 10]); 19] = [
    (8000, [0x40, 0x0B, 0xFA, 0x00, 0, 0, 0, 0, 0, 0]),
    (11025, [0x40, 0x0C, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]),
    (16000, [0x40, 0x0C, 0xFA, 0x00, 0, 0, 0, 0, 0, 0]),
    (22050, [0x40, 0x0D, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]),
    (32000, [0x40, 0x0D, 0xFA, 0x00, 0, 0, 0, 0, 0, 0]),
    (37800, [0x40, 0x0E, 0x93, 0xA8, 0, 0, 0, 0, 0, 0]),
    (44056, [0x40, 0x0E, 0xAC, 0x18, 0, 0, 0, 0, 0, 0]),
    (44100, [0x40, 0x0E, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]),
    (47250, [0x40, 0x0E, 0xB8, 0x92, 0, 0, 0, 0, 0, 0]),
    (48000, [0x40, 0x0E, 0xBB, 0x80, 0, 0, 0, 0, 0, 0]),
    (50000, [0x40, 0x0E, 0xC3, 0x50, 0, 0, 0, 0, 0, 0]),
    (50400, [0x40, 0x0E, 0xC4, 0xE0, 0, 0, 0, 0, 0, 0]),
    (88200, [0x40, 0x0F, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]),
    (96000, [0x40, 0x0F, 0xBB, 0x80, 0, 0, 0, 0, 0, 0]),
    (176400, [0x40, 0x10, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]),
    (192000, [0x40, 0x10, 0xBB, 0x80, 0, 0, 0, 0, 0, 0]),
    (352800, [0x40, 0x11, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]),
    (2822400, [0x40, 0x14, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]),
    (5644800, [0x40, 0x15, 0xAC, 0x44, 0, 0, 0, 0, 0, 0]),
];

/// Synthesize the ten-byte field for an integer rate. Zero encodes as all
/// zero bytes.
pub(crate) fn encode(rate: u32) -> [u8; 10] {
    let mut out = [0u8; 10];
    if rate == 0 {
        return out;
    }
    // Shift the rate's top set bit up to mantissa bit 63
    let top_bit = 31 - rate.leading_zeros() as u16;
    let mantissa = (rate as u64) << (63 - top_bit as u64);
    BigEndian::write_u16(&mut out[0..2], EXPONENT_BIAS + top_bit);
    BigEndian::write_u64(&mut out[2..10], mantissa);
    out
}

/// Recover the integer rate from the ten-byte field. Exponents that cannot
/// produce a rate between 1 Hz and `u32::MAX` Hz yield zero.
pub(crate) fn decode(bytes: &[u8; 10]) -> u32 {
    for (rate, pattern) in &STANDARD_RATES {
        if pattern == bytes {
            return *rate;
        }
    }
    let exponent = BigEndian::read_u16(&bytes[0..2]) & 0x7FFF;
    let mantissa = BigEndian::read_u64(&bytes[2..10]);
    let Some(power) = exponent.checked_sub(EXPONENT_BIAS) else {
        return 0;
    };
    if power > 31 {
        return 0;
    }
    (mantissa >> (63 - power as u64)) as u32
}
