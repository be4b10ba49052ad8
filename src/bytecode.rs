//! Bytecode numbering and the small encoders shared by the expression and block compilers.

use crate::varint;

// ── Flow and stack ───────────────────────────────────────────────────

pub const BC_RETURN_RESULTS: u8 = 0x04;
pub const BC_ABORT_0: u8 = 0x06;
pub const BC_JMP: u8 = 0x12;
pub const BC_JZ: u8 = 0x13;
pub const BC_JNZ: u8 = 0x14;
pub const BC_TJZ: u8 = 0x15;
pub const BC_DJNZ: u8 = 0x16;
pub const BC_POP_RFVAR: u8 = 0x18;
pub const BC_HUB_BYTECODE: u8 = 0x19;
pub const BC_CASE_FAST_INIT: u8 = 0x1A;
pub const BC_CASE_FAST_DONE: u8 = 0x1B;
pub const BC_CASE_VALUE: u8 = 0x1C;
pub const BC_CASE_RANGE: u8 = 0x1D;
pub const BC_CASE_DONE: u8 = 0x1E;
pub const BC_LOOKUP_VALUE: u8 = 0x1F;
pub const BC_LOOKDOWN_VALUE: u8 = 0x20;
pub const BC_LOOKUP_RANGE: u8 = 0x21;
pub const BC_LOOKDOWN_RANGE: u8 = 0x22;
pub const BC_LOOK_DONE: u8 = 0x23;
pub const BC_ADD_PBASE: u8 = 0x24;

// ── Constants ────────────────────────────────────────────────────────

pub const BC_CON_RFBYTE: u8 = 0x42;
pub const BC_CON_RFBYTE_NOT: u8 = 0x43;
pub const BC_CON_RFWORD: u8 = 0x44;
pub const BC_CON_RFWORD_NOT: u8 = 0x45;
pub const BC_CON_RFLONG: u8 = 0x46;
pub const BC_CON_RFBYTE_DECOD: u8 = 0x47;
pub const BC_CON_RFBYTE_DECOD_NOT: u8 = 0x48;
pub const BC_CON_RFBYTE_BMASK: u8 = 0x49;
pub const BC_CON_RFBYTE_BMASK_NOT: u8 = 0x4A;
/// `0xA0 + (n + 1)` pushes `n` for `n` in -1..=14.
pub const BC_CON_N: u8 = 0xA0;

// ── Variables ────────────────────────────────────────────────────────

pub const BC_SETUP_LONG_VBASE: u8 = 0x5C;
pub const BC_SETUP_LONG_DBASE: u8 = 0x5D;
pub const BC_SETUP_VAR_0_15: u8 = 0xC0;
pub const BC_SETUP_LOCAL_0_15: u8 = 0xD0;
pub const BC_READ_LOCAL_0_15: u8 = 0xE0;
pub const BC_WRITE_LOCAL_0_15: u8 = 0xF0;

// Variable operations, emitted after a setup bytecode.
pub const VAR_REPEAT_INIT_N: u8 = 0x7A;
pub const VAR_REPEAT_INIT_1: u8 = 0x7B;
pub const VAR_REPEAT_INIT: u8 = 0x7C;
pub const VAR_REPEAT_LOOP: u8 = 0x7D;
pub const VAR_READ: u8 = 0x80;
pub const VAR_WRITE: u8 = 0x81;

// ── Operators ────────────────────────────────────────────────────────

pub const BC_TERNARY: u8 = 0x6B;
pub const BC_LT: u8 = 0x6C;
pub const BC_LTU: u8 = 0x6D;
pub const BC_LTE: u8 = 0x6E;
pub const BC_LTEU: u8 = 0x6F;
pub const BC_E: u8 = 0x70;
pub const BC_NE: u8 = 0x71;
pub const BC_GTE: u8 = 0x72;
pub const BC_GTEU: u8 = 0x73;
pub const BC_GT: u8 = 0x74;
pub const BC_GTU: u8 = 0x75;
pub const BC_LTEGT: u8 = 0x76;
pub const BC_LOGNOT: u8 = 0x77;
pub const BC_BITNOT: u8 = 0x78;
pub const BC_NEG: u8 = 0x79;
pub const BC_ABS: u8 = 0x7A;
pub const BC_ENCOD: u8 = 0x7B;
pub const BC_DECOD: u8 = 0x7C;
pub const BC_BMASK: u8 = 0x7D;
pub const BC_ONES: u8 = 0x7E;
pub const BC_SQRT: u8 = 0x7F;
pub const BC_QLOG: u8 = 0x80;
pub const BC_QEXP: u8 = 0x81;
pub const BC_SHR: u8 = 0x82;
pub const BC_SHL: u8 = 0x83;
pub const BC_SAR: u8 = 0x84;
pub const BC_ROR: u8 = 0x85;
pub const BC_ROL: u8 = 0x86;
pub const BC_REV: u8 = 0x87;
pub const BC_ZEROX: u8 = 0x88;
pub const BC_SIGNX: u8 = 0x89;
pub const BC_ADD: u8 = 0x8A;
pub const BC_SUB: u8 = 0x8B;
pub const BC_LOGAND: u8 = 0x8C;
pub const BC_LOGXOR: u8 = 0x8D;
pub const BC_LOGOR: u8 = 0x8E;
pub const BC_BITAND: u8 = 0x8F;
pub const BC_BITXOR: u8 = 0x90;
pub const BC_BITOR: u8 = 0x91;
pub const BC_FGE: u8 = 0x92;
pub const BC_FLE: u8 = 0x93;
pub const BC_ADDBITS: u8 = 0x94;
pub const BC_ADDPINS: u8 = 0x95;
pub const BC_MUL: u8 = 0x96;
pub const BC_DIV: u8 = 0x97;
pub const BC_DIVU: u8 = 0x98;
pub const BC_REM: u8 = 0x99;
pub const BC_REMU: u8 = 0x9A;
pub const BC_SCA: u8 = 0x9B;
pub const BC_SCAS: u8 = 0x9C;
pub const BC_FRAC: u8 = 0x9D;

// ── Hub bytecodes (after BC_HUB_BYTECODE) ────────────────────────────

pub const HUB_FLOAT: u8 = 166;
pub const HUB_ROUND: u8 = 168;
pub const HUB_TRUNC: u8 = 170;
pub const HUB_FNEG: u8 = 174;
pub const HUB_FABS: u8 = 176;
pub const HUB_FLT: u8 = 178;
pub const HUB_FGT: u8 = 180;
pub const HUB_FNE: u8 = 182;
pub const HUB_FE: u8 = 184;
pub const HUB_FLTE: u8 = 186;
pub const HUB_FGTE: u8 = 188;
pub const HUB_FADD: u8 = 190;
pub const HUB_FSUB: u8 = 192;
pub const HUB_FMUL: u8 = 194;
pub const HUB_FDIV: u8 = 196;
pub const HUB_POW: u8 = 198;
pub const HUB_LOG2: u8 = 200;
pub const HUB_LOG10: u8 = 202;
pub const HUB_LOG: u8 = 204;
pub const HUB_EXP2: u8 = 206;
pub const HUB_EXP10: u8 = 208;
pub const HUB_EXP: u8 = 210;
pub const HUB_FSQRT: u8 = 212;

// ── Encoders ─────────────────────────────────────────────────────────

/// Shortest push for a 32-bit constant.
pub fn constant_bytes(value: u32) -> Vec<u8> {
    let signed = value as i32;
    if (-1..=14).contains(&signed) {
        return vec![BC_CON_N.wrapping_add((signed + 1) as u8)];
    }
    if value <= 0xFF {
        return vec![BC_CON_RFBYTE, value as u8];
    }
    if !value <= 0xFF {
        return vec![BC_CON_RFBYTE_NOT, !value as u8];
    }
    if value.is_power_of_two() {
        return vec![BC_CON_RFBYTE_DECOD, value.trailing_zeros() as u8];
    }
    if (!value).is_power_of_two() {
        return vec![BC_CON_RFBYTE_DECOD_NOT, (!value).trailing_zeros() as u8];
    }
    if let Some(bits) = mask_width(value) {
        return vec![BC_CON_RFBYTE_BMASK, bits];
    }
    if let Some(bits) = mask_width(!value) {
        return vec![BC_CON_RFBYTE_BMASK_NOT, bits];
    }
    if value <= 0xFFFF {
        let [lo, hi] = (value as u16).to_le_bytes();
        return vec![BC_CON_RFWORD, lo, hi];
    }
    if !value <= 0xFFFF {
        let [lo, hi] = (!value as u16).to_le_bytes();
        return vec![BC_CON_RFWORD_NOT, lo, hi];
    }
    let mut out = vec![BC_CON_RFLONG];
    out.extend_from_slice(&value.to_le_bytes());
    out
}

/// `n` such that `value == (2 << n) - 1`.
fn mask_width(value: u32) -> Option<u8> {
    if value != 0 && value.wrapping_add(1) & value == 0 {
        Some((value.count_ones() - 1) as u8)
    } else {
        None
    }
}

/// Lengths of the constant forms usable for a code address, shortest first.
const ADDRESS_LENGTHS: [usize; 4] = [1, 2, 3, 5];

/// Constant-part length an address needs on its own.
pub fn address_len(address: u32) -> usize {
    match address {
        0..=14 => 1,
        15..=0xFF => 2,
        0x100..=0xFFFF => 3,
        _ => 5,
    }
}

/// Push of a code address relative to the object base, followed by `add_pbase`.
/// The constant part is at least `min_len` bytes; addresses only use forms whose
/// length grows with the value, so a grown width can always hold a smaller address.
pub fn address_bytes(address: u32, min_len: usize) -> Vec<u8> {
    let need = address_len(address).max(min_len);
    let len = ADDRESS_LENGTHS
        .iter()
        .copied()
        .find(|&l| l >= need)
        .unwrap_or(5);
    let mut out = match len {
        1 => vec![BC_CON_N + address as u8 + 1],
        2 => vec![BC_CON_RFBYTE, address as u8],
        3 => {
            let [lo, hi] = (address as u16).to_le_bytes();
            vec![BC_CON_RFWORD, lo, hi]
        }
        _ => {
            let mut long = vec![BC_CON_RFLONG];
            long.extend_from_slice(&address.to_le_bytes());
            long
        }
    };
    out.push(BC_ADD_PBASE);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Local,
    Var,
}

/// Setup (and for locals 0..15, the fused read/write) for a long variable at `offset`.
pub fn variable_bytes(kind: VarKind, offset: u32, op: u8) -> Vec<u8> {
    let short = offset % 4 == 0 && offset / 4 < 16;
    let index = (offset / 4) as u8;
    match (kind, short) {
        (VarKind::Local, true) => match op {
            VAR_READ => vec![BC_READ_LOCAL_0_15 + index],
            VAR_WRITE => vec![BC_WRITE_LOCAL_0_15 + index],
            _ => vec![BC_SETUP_LOCAL_0_15 + index, op],
        },
        (VarKind::Var, true) => vec![BC_SETUP_VAR_0_15 + index, op],
        (VarKind::Local, false) => long_setup(BC_SETUP_LONG_DBASE, offset, op),
        (VarKind::Var, false) => long_setup(BC_SETUP_LONG_VBASE, offset, op),
    }
}

fn long_setup(setup: u8, offset: u32, op: u8) -> Vec<u8> {
    let mut out = vec![setup];
    out.extend(varint::encode_rfvar(offset));
    out.push(op);
    out
}

/// Branch `prefix` placed at `origin`, displacement encoded as RFVARS relative to the
/// first byte after the displacement. The displacement takes the smallest width of at
/// least `min_width` bytes that can represent it once its own length is accounted for.
/// Returns `None` when no four-byte displacement reaches `target`.
pub fn branch_bytes(prefix: &[u8], origin: usize, target: usize, min_width: usize) -> Option<Vec<u8>> {
    let after_prefix = (origin + prefix.len()) as i64;
    for width in min_width.max(1)..=varint::MAX_LEN {
        let displacement = target as i64 - (after_prefix + width as i64);
        if !varint::fits_rfvars(displacement) {
            continue;
        }
        if varint::rfvars_len(displacement as i32) <= width {
            let mut out = prefix.to_vec();
            out.extend(varint::encode_rfvars_padded(displacement as i32, width));
            return Some(out);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_constants_use_con_n() {
        assert_eq!(constant_bytes(u32::MAX), vec![0xA0]);
        assert_eq!(constant_bytes(0), vec![0xA1]);
        assert_eq!(constant_bytes(14), vec![0xAF]);
        assert_eq!(constant_bytes(20), vec![BC_CON_RFBYTE, 20]);
    }

    #[test]
    fn two_byte_constant_forms() {
        assert_eq!(constant_bytes(!100), vec![BC_CON_RFBYTE_NOT, 100]);
        assert_eq!(constant_bytes(0x1000), vec![BC_CON_RFBYTE_DECOD, 12]);
        assert_eq!(constant_bytes(0x7FFF_FFFF), vec![BC_CON_RFBYTE_DECOD_NOT, 31]);
        assert_eq!(constant_bytes(0x0003_FFFF), vec![BC_CON_RFBYTE_BMASK, 17]);
        assert_eq!(constant_bytes(!0x0003_FFFF), vec![BC_CON_RFBYTE_BMASK_NOT, 17]);
        assert_eq!(constant_bytes(!0x0004_0000), vec![BC_CON_RFBYTE_DECOD_NOT, 18]);
    }

    #[test]
    fn wider_constant_forms() {
        assert_eq!(constant_bytes(0x1234), vec![BC_CON_RFWORD, 0x34, 0x12]);
        assert_eq!(constant_bytes(!0x1234), vec![BC_CON_RFWORD_NOT, 0x34, 0x12]);
        assert_eq!(
            constant_bytes(0x1234_5678),
            vec![BC_CON_RFLONG, 0x78, 0x56, 0x34, 0x12]
        );
    }

    #[test]
    fn address_widths_only_grow() {
        assert_eq!(address_bytes(3, 1), vec![0xA4, BC_ADD_PBASE]);
        assert_eq!(address_bytes(3, 2), vec![BC_CON_RFBYTE, 3, BC_ADD_PBASE]);
        assert_eq!(address_bytes(3, 4), vec![BC_CON_RFLONG, 3, 0, 0, 0, BC_ADD_PBASE]);
        assert_eq!(address_bytes(0x100, 1), vec![BC_CON_RFWORD, 0, 1, BC_ADD_PBASE]);
        assert_eq!(address_len(0x1_0000), 5);
    }

    #[test]
    fn local_variables_use_fused_forms() {
        assert_eq!(variable_bytes(VarKind::Local, 4, VAR_READ), vec![0xE1]);
        assert_eq!(variable_bytes(VarKind::Local, 60, VAR_WRITE), vec![0xFF]);
        assert_eq!(
            variable_bytes(VarKind::Local, 8, VAR_REPEAT_LOOP),
            vec![0xD2, VAR_REPEAT_LOOP]
        );
        assert_eq!(
            variable_bytes(VarKind::Local, 64, VAR_READ),
            vec![BC_SETUP_LONG_DBASE, 64, VAR_READ]
        );
    }

    #[test]
    fn object_variables() {
        assert_eq!(variable_bytes(VarKind::Var, 0, VAR_WRITE), vec![0xC0, VAR_WRITE]);
        assert_eq!(
            variable_bytes(VarKind::Var, 200, VAR_READ),
            vec![BC_SETUP_LONG_VBASE, 0xC8, 0x01, VAR_READ]
        );
    }

    #[test]
    fn branch_displacement_counts_its_own_width() {
        // target 64 bytes past the one-byte displacement: fits in one byte
        assert_eq!(branch_bytes(&[BC_JMP], 0, 2 + 63, 1), Some(vec![BC_JMP, 63]));
        // one further needs a second byte, which moves the origin again
        assert_eq!(
            branch_bytes(&[BC_JMP], 0, 2 + 64, 1),
            Some(vec![BC_JMP, 0xBF, 0x00])
        );
        // backwards
        assert_eq!(branch_bytes(&[BC_JZ], 10, 0, 1), Some(vec![BC_JZ, 0x74]));
    }

    #[test]
    fn branch_respects_sticky_width() {
        let bytes = branch_bytes(&[BC_JMP], 0, 4, 3).unwrap();
        assert_eq!(bytes.len(), 4);
        assert_eq!(varint::decode_rfvars(&bytes[1..]), Some((0, 3)));
    }

    #[test]
    fn branch_out_of_range() {
        assert_eq!(branch_bytes(&[BC_JMP], 0, 1 << 29, 1), None);
    }
}
