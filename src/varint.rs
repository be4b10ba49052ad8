//! RFVAR / RFVARS variable-length integers.
//!
//! Up to four bytes. The first three carry seven payload bits each, low bits first,
//! with bit 7 set when another byte follows. A fourth byte carries eight payload bits
//! and never continues, so the format holds 29 bits. RFVARS is the same layout read
//! back with sign extension from the top payload bit of the last byte.

pub const MAX_LEN: usize = 4;

/// Largest value an RFVAR can hold.
pub const RFVAR_MAX: u32 = 0x1FFF_FFFF;

/// Inclusive range an RFVARS can hold.
pub const RFVARS_MIN: i64 = -(1 << 28);
pub const RFVARS_MAX: i64 = (1 << 28) - 1;

/// Encoded length of an unsigned value; bits above 28 are ignored.
pub fn rfvar_len(value: u32) -> usize {
    match value & RFVAR_MAX {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        _ => 4,
    }
}

/// Encoded length of a signed value, after sign-extending from bit 28.
pub fn rfvars_len(value: i32) -> usize {
    match sign_extend(value as u32, 29) {
        -0x40..=0x3F => 1,
        -0x2000..=0x1FFF => 2,
        -0x10_0000..=0xF_FFFF => 3,
        _ => 4,
    }
}

pub fn fits_rfvars(value: i64) -> bool {
    (RFVARS_MIN..=RFVARS_MAX).contains(&value)
}

pub fn encode_rfvar(value: u32) -> Vec<u8> {
    encode_with_len(value, rfvar_len(value))
}

pub fn encode_rfvars(value: i32) -> Vec<u8> {
    encode_with_len(value as u32, rfvars_len(value))
}

/// Signed encoding padded to exactly `width` bytes. Branches keep a width once it has
/// grown, so a shorter displacement on a later pass must still fill the same space.
/// `width` is raised to the natural length if it is too small and capped at [`MAX_LEN`].
pub fn encode_rfvars_padded(value: i32, width: usize) -> Vec<u8> {
    let width = width.clamp(rfvars_len(value), MAX_LEN);
    encode_with_len(value as u32, width)
}

fn encode_with_len(value: u32, len: usize) -> Vec<u8> {
    let bits = value & RFVAR_MAX;
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        if i == 3 {
            out.push((bits >> 21) as u8);
            break;
        }
        let byte = ((bits >> (7 * i)) & 0x7F) as u8;
        out.push(if i + 1 < len { byte | 0x80 } else { byte });
    }
    out
}

/// Decode an unsigned value, returning it with the number of bytes consumed.
pub fn decode_rfvar(bytes: &[u8]) -> Option<(u32, usize)> {
    let mut value = 0u32;
    for i in 0..MAX_LEN {
        let byte = *bytes.get(i)? as u32;
        if i == 3 {
            return Some((value | (byte << 21), 4));
        }
        value |= (byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

/// Decode a signed value, returning it with the number of bytes consumed.
pub fn decode_rfvars(bytes: &[u8]) -> Option<(i32, usize)> {
    let (raw, len) = decode_rfvar(bytes)?;
    let bits = if len == MAX_LEN { 29 } else { 7 * len as u32 };
    Some((sign_extend(raw, bits), len))
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}
