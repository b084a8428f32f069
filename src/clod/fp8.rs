//! 8-bit logarithmic encoding for variance values
//!
//! The high nibble holds an exponent, the low nibble a mantissa with an
//! implicit leading bit. Values below 16 are stored exactly; larger values
//! keep roughly 3% relative precision up to about 2^19.

/// Largest value that encodes without saturating
pub const FP8_MAX: u32 = 31 << 14;

/// Encode a non-negative integer, rounding to the nearest representable value.
/// Saturates to `0xFF`.
pub fn encode(value: u32) -> u8 {
    if value < 16 {
        return value as u8;
    }

    let bits = 32 - value.leading_zeros();
    let mut exp = bits - 4;
    let shift = exp - 1;
    if shift == 0 {
        return ((exp << 4) | (value - 16)) as u8;
    }
    let mut mantissa = ((value as u64 + (1u64 << (shift - 1))) >> shift) as u32;

    // rounding carried into the next exponent
    if mantissa >= 32 {
        exp += 1;
        mantissa = 16;
    }
    if exp > 15 {
        return 0xFF;
    }

    ((exp << 4) | (mantissa - 16)) as u8
}

/// Decode a value produced by [`encode`]
pub fn decode(code: u8) -> u32 {
    let exp = (code >> 4) as u32;
    let mantissa = (code & 0x0F) as u32;
    if exp == 0 {
        mantissa
    } else {
        (mantissa + 16) << (exp - 1)
    }
}
