//! Operator table and constant-folding arithmetic.
//!
//! Every operator carries a precedence (0 = unary, 14 = ternary), an arity, the
//! evaluation mode it demands, and the bytecodes used to run it when it cannot be
//! folded. Folding works on raw 32-bit patterns: integers as two's complement,
//! floats as IEEE-754 single precision.

/// Lowest binding strength: the ternary `? :` level.
pub const TERNARY_PRECEDENCE: u8 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // unary, precedence 0
    BitNot,
    Neg,
    FNeg,
    Abs,
    FAbs,
    Encod,
    Decod,
    Bmask,
    Ones,
    Sqrt,
    FSqrt,
    Qlog,
    Qexp,
    Log2,
    Log10,
    Log,
    Exp2,
    Exp10,
    Exp,
    // 1
    Shr,
    Shl,
    Sar,
    Ror,
    Rol,
    Rev,
    Zerox,
    Signx,
    // 2..4
    BitAnd,
    BitXor,
    BitOr,
    // 5
    Mul,
    FMul,
    Div,
    FDiv,
    DivU,
    Rem,
    RemU,
    Sca,
    Scas,
    Frac,
    // 6
    Add,
    FAdd,
    Sub,
    FSub,
    Pow,
    // 7
    Fge,
    Fle,
    // 8
    AddBits,
    AddPins,
    // 9
    Lt,
    FLt,
    LtU,
    Lte,
    FLte,
    LteU,
    Eq,
    FEq,
    Ne,
    FNe,
    Gte,
    FGte,
    GteU,
    Gt,
    FGt,
    GtU,
    LteGt,
    // 10..13
    LogNot,
    LogAnd,
    LogXor,
    LogOr,
    // 14
    Ternary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Binary,
    Ternary,
}

/// What an operator demands of the expression's evaluation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeClass {
    /// Locks the expression to integer mode.
    IntOnly,
    /// Locks the expression to float mode.
    FloatOnly,
    /// Works in either mode; picks its float twin in float mode.
    Dual,
    /// Works in either mode with the same bytecode.
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub precedence: u8,
    pub arity: Arity,
    pub class: ModeClass,
    /// Main bytecode used in integer (or mode-neutral) context.
    pub int_code: Option<u8>,
    /// Hub bytecode used in float context.
    pub float_code: Option<u8>,
}

const fn op(
    precedence: u8,
    arity: Arity,
    class: ModeClass,
    int_code: Option<u8>,
    float_code: Option<u8>,
) -> OpInfo {
    OpInfo { precedence, arity, class, int_code, float_code }
}

impl Operator {
    pub fn info(self) -> OpInfo {
        use crate::bytecode as bc;
        use Arity::{Binary, Unary};
        use ModeClass::*;
        use Operator::*;
        match self {
            BitNot => op(0, Unary, IntOnly, Some(bc::BC_BITNOT), None),
            Neg => op(0, Unary, Dual, Some(bc::BC_NEG), Some(bc::HUB_FNEG)),
            FNeg => op(0, Unary, FloatOnly, None, Some(bc::HUB_FNEG)),
            Abs => op(0, Unary, Dual, Some(bc::BC_ABS), Some(bc::HUB_FABS)),
            FAbs => op(0, Unary, FloatOnly, None, Some(bc::HUB_FABS)),
            Encod => op(0, Unary, IntOnly, Some(bc::BC_ENCOD), None),
            Decod => op(0, Unary, IntOnly, Some(bc::BC_DECOD), None),
            Bmask => op(0, Unary, IntOnly, Some(bc::BC_BMASK), None),
            Ones => op(0, Unary, IntOnly, Some(bc::BC_ONES), None),
            Sqrt => op(0, Unary, IntOnly, Some(bc::BC_SQRT), None),
            FSqrt => op(0, Unary, FloatOnly, None, Some(bc::HUB_FSQRT)),
            Qlog => op(0, Unary, IntOnly, Some(bc::BC_QLOG), None),
            Qexp => op(0, Unary, IntOnly, Some(bc::BC_QEXP), None),
            Log2 => op(0, Unary, FloatOnly, None, Some(bc::HUB_LOG2)),
            Log10 => op(0, Unary, FloatOnly, None, Some(bc::HUB_LOG10)),
            Log => op(0, Unary, FloatOnly, None, Some(bc::HUB_LOG)),
            Exp2 => op(0, Unary, FloatOnly, None, Some(bc::HUB_EXP2)),
            Exp10 => op(0, Unary, FloatOnly, None, Some(bc::HUB_EXP10)),
            Exp => op(0, Unary, FloatOnly, None, Some(bc::HUB_EXP)),

            Shr => op(1, Binary, IntOnly, Some(bc::BC_SHR), None),
            Shl => op(1, Binary, IntOnly, Some(bc::BC_SHL), None),
            Sar => op(1, Binary, IntOnly, Some(bc::BC_SAR), None),
            Ror => op(1, Binary, IntOnly, Some(bc::BC_ROR), None),
            Rol => op(1, Binary, IntOnly, Some(bc::BC_ROL), None),
            Rev => op(1, Binary, IntOnly, Some(bc::BC_REV), None),
            Zerox => op(1, Binary, IntOnly, Some(bc::BC_ZEROX), None),
            Signx => op(1, Binary, IntOnly, Some(bc::BC_SIGNX), None),

            BitAnd => op(2, Binary, IntOnly, Some(bc::BC_BITAND), None),
            BitXor => op(3, Binary, IntOnly, Some(bc::BC_BITXOR), None),
            BitOr => op(4, Binary, IntOnly, Some(bc::BC_BITOR), None),

            Mul => op(5, Binary, Dual, Some(bc::BC_MUL), Some(bc::HUB_FMUL)),
            FMul => op(5, Binary, FloatOnly, None, Some(bc::HUB_FMUL)),
            Div => op(5, Binary, Dual, Some(bc::BC_DIV), Some(bc::HUB_FDIV)),
            FDiv => op(5, Binary, FloatOnly, None, Some(bc::HUB_FDIV)),
            DivU => op(5, Binary, IntOnly, Some(bc::BC_DIVU), None),
            Rem => op(5, Binary, IntOnly, Some(bc::BC_REM), None),
            RemU => op(5, Binary, IntOnly, Some(bc::BC_REMU), None),
            Sca => op(5, Binary, IntOnly, Some(bc::BC_SCA), None),
            Scas => op(5, Binary, IntOnly, Some(bc::BC_SCAS), None),
            Frac => op(5, Binary, IntOnly, Some(bc::BC_FRAC), None),

            Add => op(6, Binary, Dual, Some(bc::BC_ADD), Some(bc::HUB_FADD)),
            FAdd => op(6, Binary, FloatOnly, None, Some(bc::HUB_FADD)),
            Sub => op(6, Binary, Dual, Some(bc::BC_SUB), Some(bc::HUB_FSUB)),
            FSub => op(6, Binary, FloatOnly, None, Some(bc::HUB_FSUB)),
            Pow => op(6, Binary, FloatOnly, None, Some(bc::HUB_POW)),

            // Foldable in both modes; the interpreter has no float form.
            Fge => op(7, Binary, Dual, Some(bc::BC_FGE), None),
            Fle => op(7, Binary, Dual, Some(bc::BC_FLE), None),

            AddBits => op(8, Binary, IntOnly, Some(bc::BC_ADDBITS), None),
            AddPins => op(8, Binary, IntOnly, Some(bc::BC_ADDPINS), None),

            Lt => op(9, Binary, Dual, Some(bc::BC_LT), Some(bc::HUB_FLT)),
            FLt => op(9, Binary, FloatOnly, None, Some(bc::HUB_FLT)),
            LtU => op(9, Binary, IntOnly, Some(bc::BC_LTU), None),
            Lte => op(9, Binary, Dual, Some(bc::BC_LTE), Some(bc::HUB_FLTE)),
            FLte => op(9, Binary, FloatOnly, None, Some(bc::HUB_FLTE)),
            LteU => op(9, Binary, IntOnly, Some(bc::BC_LTEU), None),
            Eq => op(9, Binary, Dual, Some(bc::BC_E), Some(bc::HUB_FE)),
            FEq => op(9, Binary, FloatOnly, None, Some(bc::HUB_FE)),
            Ne => op(9, Binary, Dual, Some(bc::BC_NE), Some(bc::HUB_FNE)),
            FNe => op(9, Binary, FloatOnly, None, Some(bc::HUB_FNE)),
            Gte => op(9, Binary, Dual, Some(bc::BC_GTE), Some(bc::HUB_FGTE)),
            FGte => op(9, Binary, FloatOnly, None, Some(bc::HUB_FGTE)),
            GteU => op(9, Binary, IntOnly, Some(bc::BC_GTEU), None),
            Gt => op(9, Binary, Dual, Some(bc::BC_GT), Some(bc::HUB_FGT)),
            FGt => op(9, Binary, FloatOnly, None, Some(bc::HUB_FGT)),
            GtU => op(9, Binary, IntOnly, Some(bc::BC_GTU), None),
            LteGt => op(9, Binary, Dual, Some(bc::BC_LTEGT), None),

            LogNot => op(10, Unary, Neutral, Some(bc::BC_LOGNOT), None),
            LogAnd => op(11, Binary, Neutral, Some(bc::BC_LOGAND), None),
            LogXor => op(12, Binary, Neutral, Some(bc::BC_LOGXOR), None),
            LogOr => op(13, Binary, Neutral, Some(bc::BC_LOGOR), None),

            Ternary => op(14, Arity::Ternary, Neutral, Some(bc::BC_TERNARY), None),
        }
    }

    /// The form this operator takes when it starts a term: `-` is negation, `-.` float negation.
    pub fn unary_form(self) -> Option<Operator> {
        match self {
            Operator::Sub => Some(Operator::Neg),
            Operator::FSub => Some(Operator::FNeg),
            other if other.info().arity == Arity::Unary => Some(other),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        use Operator::*;
        match self {
            BitNot => "!",
            Neg | Sub => "-",
            FNeg | FSub => "-.",
            Abs => "ABS",
            FAbs => "FABS",
            Encod => "ENCOD",
            Decod => "DECOD",
            Bmask => "BMASK",
            Ones => "ONES",
            Sqrt => "SQRT",
            FSqrt => "FSQRT",
            Qlog => "QLOG",
            Qexp => "QEXP",
            Log2 => "LOG2",
            Log10 => "LOG10",
            Log => "LOG",
            Exp2 => "EXP2",
            Exp10 => "EXP10",
            Exp => "EXP",
            Shr => ">>",
            Shl => "<<",
            Sar => "SAR",
            Ror => "ROR",
            Rol => "ROL",
            Rev => "REV",
            Zerox => "ZEROX",
            Signx => "SIGNX",
            BitAnd => "&",
            BitXor => "^",
            BitOr => "|",
            Mul => "*",
            FMul => "*.",
            Div => "/",
            FDiv => "/.",
            DivU => "+/",
            Rem => "//",
            RemU => "+//",
            Sca => "SCA",
            Scas => "SCAS",
            Frac => "FRAC",
            Add => "+",
            FAdd => "+.",
            Pow => "POW",
            Fge => "#>",
            Fle => "<#",
            AddBits => "ADDBITS",
            AddPins => "ADDPINS",
            Lt => "<",
            FLt => "<.",
            LtU => "+<",
            Lte => "<=",
            FLte => "<=.",
            LteU => "+<=",
            Eq => "==",
            FEq => "==.",
            Ne => "<>",
            FNe => "<>.",
            Gte => ">=",
            FGte => ">=.",
            GteU => "+>=",
            Gt => ">",
            FGt => ">.",
            GtU => "+>",
            LteGt => "<=>",
            LogNot => "!!",
            LogAnd => "&&",
            LogXor => "^^",
            LogOr => "||",
            Ternary => "?",
        }
    }
}

// ── Folding ────────────────────────────────────────────────────────────────

/// Why a fold could not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OpFault {
    #[error("divide by zero")]
    DivideByZero,
    #[error("floating-point overflow")]
    FloatOverflow,
    #[error("operator '{0}' cannot be folded in this mode")]
    WrongMode(&'static str),
}

const FLOAT_ONE: u32 = 0x3F80_0000;
const FLOAT_MINUS_ONE: u32 = 0xBF80_0000;
const EXPONENT_MASK: u32 = 0x7F80_0000;
const SIGN_BIT: u32 = 0x8000_0000;

/// Nonzero test for a value in the given mode. In float mode `-0.0` is false.
pub fn truthy(value: u32, float: bool) -> bool {
    if float { value & !SIGN_BIT != 0 } else { value != 0 }
}

fn int_bool(b: bool) -> u32 {
    if b { u32::MAX } else { 0 }
}

fn float_bool(b: bool) -> u32 {
    if b { FLOAT_ONE } else { 0 }
}

/// Fold a unary or binary operator. `b` is ignored for unary operators.
pub fn apply(op: Operator, float: bool, a: u32, b: u32) -> Result<u32, OpFault> {
    if float { apply_float(op, a, b) } else { apply_int(op, a, b) }
}

fn apply_int(op: Operator, a: u32, b: u32) -> Result<u32, OpFault> {
    use Operator::*;
    let (sa, sb) = (a as i32, b as i32);
    let value = match op {
        BitNot => !a,
        Neg => sa.wrapping_neg() as u32,
        Abs => sa.wrapping_abs() as u32,
        Encod => 31u32.saturating_sub(a.leading_zeros()),
        Decod => 1 << (a & 31),
        Bmask => u32::MAX >> (31 - (a & 31)),
        Ones => a.count_ones(),
        Sqrt => isqrt(a),
        Qlog => qlog(a),
        Qexp => qexp(a),

        Shr => a >> (b & 31),
        Shl => a << (b & 31),
        Sar => (sa >> (b & 31)) as u32,
        Ror => a.rotate_right(b & 31),
        Rol => a.rotate_left(b & 31),
        Rev => a.reverse_bits() >> (31 - (b & 31)),
        Zerox => a & (u32::MAX >> (31 - (b & 31))),
        Signx => {
            let shift = 31 - (b & 31);
            (((a << shift) as i32) >> shift) as u32
        }

        BitAnd => a & b,
        BitXor => a ^ b,
        BitOr => a | b,

        Mul => a.wrapping_mul(b),
        Div => {
            if b == 0 {
                return Err(OpFault::DivideByZero);
            }
            sa.wrapping_div(sb) as u32
        }
        DivU => a.checked_div(b).ok_or(OpFault::DivideByZero)?,
        Rem => {
            if b == 0 {
                return Err(OpFault::DivideByZero);
            }
            sa.wrapping_rem(sb) as u32
        }
        RemU => a.checked_rem(b).ok_or(OpFault::DivideByZero)?,
        Sca => ((a as u64 * b as u64) >> 32) as u32,
        Scas => ((sa as i64 * sb as i64) >> 30) as u32,
        Frac => {
            if b == 0 {
                return Err(OpFault::DivideByZero);
            }
            (((a as u64) << 32) / b as u64) as u32
        }

        Add => a.wrapping_add(b),
        Sub => a.wrapping_sub(b),
        Fge => sa.max(sb) as u32,
        Fle => sa.min(sb) as u32,
        AddBits => (a & 31) | ((b & 31) << 5),
        AddPins => (a & 63) | ((b & 31) << 6),

        Lt => int_bool(sa < sb),
        LtU => int_bool(a < b),
        Lte => int_bool(sa <= sb),
        LteU => int_bool(a <= b),
        Eq => int_bool(a == b),
        Ne => int_bool(a != b),
        Gte => int_bool(sa >= sb),
        GteU => int_bool(a >= b),
        Gt => int_bool(sa > sb),
        GtU => int_bool(a > b),
        LteGt => match sa.cmp(&sb) {
            std::cmp::Ordering::Less => u32::MAX,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        },

        LogNot => int_bool(a == 0),
        LogAnd => int_bool(a != 0 && b != 0),
        LogXor => int_bool((a != 0) != (b != 0)),
        LogOr => int_bool(a != 0 || b != 0),

        other => return Err(OpFault::WrongMode(other.symbol())),
    };
    Ok(value)
}

fn apply_float(op: Operator, a: u32, b: u32) -> Result<u32, OpFault> {
    use Operator::*;
    let (fa, fb) = (f32::from_bits(a), f32::from_bits(b));
    let result = match op {
        Neg | FNeg => return Ok(a ^ SIGN_BIT),
        Abs | FAbs => return Ok(a & !SIGN_BIT),
        FSqrt => fa.sqrt(),
        Log2 => (fa as f64).log2() as f32,
        Log10 => (fa as f64).log10() as f32,
        Log => (fa as f64).ln() as f32,
        Exp2 => (fa as f64).exp2() as f32,
        Exp10 => 10f64.powf(fa as f64) as f32,
        Exp => (fa as f64).exp() as f32,

        Mul | FMul => fa * fb,
        Div | FDiv => {
            if fb == 0.0 {
                return Err(OpFault::DivideByZero);
            }
            fa / fb
        }
        Add | FAdd => fa + fb,
        Sub | FSub => fa - fb,
        Pow => (fa as f64).powf(fb as f64) as f32,
        Fge => fa.max(fb),
        Fle => fa.min(fb),

        Lt | FLt => return Ok(float_bool(fa < fb)),
        Lte | FLte => return Ok(float_bool(fa <= fb)),
        Eq | FEq => return Ok(float_bool(fa == fb)),
        Ne | FNe => return Ok(float_bool(fa != fb)),
        Gte | FGte => return Ok(float_bool(fa >= fb)),
        Gt | FGt => return Ok(float_bool(fa > fb)),
        LteGt => {
            return match fa.partial_cmp(&fb) {
                Some(std::cmp::Ordering::Less) => Ok(FLOAT_MINUS_ONE),
                Some(std::cmp::Ordering::Equal) => Ok(0),
                Some(std::cmp::Ordering::Greater) => Ok(FLOAT_ONE),
                None => Err(OpFault::FloatOverflow),
            };
        }

        LogNot => return Ok(float_bool(!truthy(a, true))),
        LogAnd => return Ok(float_bool(truthy(a, true) && truthy(b, true))),
        LogXor => return Ok(float_bool(truthy(a, true) != truthy(b, true))),
        LogOr => return Ok(float_bool(truthy(a, true) || truthy(b, true))),

        other => return Err(OpFault::WrongMode(other.symbol())),
    };
    check_float(result)
}

/// Reject results whose exponent field is all ones (infinities and NaNs).
fn check_float(value: f32) -> Result<u32, OpFault> {
    let bits = value.to_bits();
    if bits & EXPONENT_MASK == EXPONENT_MASK {
        Err(OpFault::FloatOverflow)
    } else {
        Ok(bits)
    }
}

/// `FLOAT(x)`: signed integer to float.
pub fn int_to_float(value: u32) -> u32 {
    (value as i32 as f32).to_bits()
}

/// `ROUND(x)` / `TRUNC(x)`: float to signed integer.
pub fn float_to_int(value: u32, round: bool) -> Result<u32, OpFault> {
    let f = f32::from_bits(value) as f64;
    let whole = if round { f.round() } else { f.trunc() };
    if !whole.is_finite() || whole < i32::MIN as f64 || whole > i32::MAX as f64 {
        return Err(OpFault::FloatOverflow);
    }
    Ok(whole as i32 as u32)
}

fn isqrt(value: u32) -> u32 {
    let n = value as u64;
    let mut root = (n as f64).sqrt() as u64;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root as u32
}

/// Fixed-point log2: whole part in bits 31..27, fraction in bits 26..0.
fn qlog(value: u32) -> u32 {
    if value == 0 {
        return 0;
    }
    let whole = 31 - value.leading_zeros();
    let fraction = ((value as f64).log2() - whole as f64) * (1u64 << 27) as f64;
    (whole << 27) | ((fraction as u32) & 0x07FF_FFFF)
}

/// Inverse of [`qlog`].
fn qexp(value: u32) -> u32 {
    let exponent = (value >> 27) as f64 + (value & 0x07FF_FFFF) as f64 / (1u64 << 27) as f64;
    let result = exponent.exp2();
    if result >= u32::MAX as f64 { u32::MAX } else { result as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(op: Operator, a: i32, b: i32) -> i32 {
        apply(op, false, a as u32, b as u32).unwrap() as i32
    }

    fn float(op: Operator, a: f32, b: f32) -> f32 {
        f32::from_bits(apply(op, true, a.to_bits(), b.to_bits()).unwrap())
    }

    #[test]
    fn precedence_levels() {
        assert_eq!(Operator::Neg.info().precedence, 0);
        assert_eq!(Operator::Signx.info().precedence, 1);
        assert_eq!(Operator::Frac.info().precedence, 5);
        assert_eq!(Operator::Pow.info().precedence, 6);
        assert_eq!(Operator::Fle.info().precedence, 7);
        assert_eq!(Operator::AddPins.info().precedence, 8);
        assert_eq!(Operator::LteGt.info().precedence, 9);
        assert_eq!(Operator::LogNot.info().precedence, 10);
        assert_eq!(Operator::LogOr.info().precedence, 13);
        assert_eq!(Operator::Ternary.info().precedence, TERNARY_PRECEDENCE);
    }

    #[test]
    fn unary_forms() {
        assert_eq!(Operator::Sub.unary_form(), Some(Operator::Neg));
        assert_eq!(Operator::FSub.unary_form(), Some(Operator::FNeg));
        assert_eq!(Operator::LogNot.unary_form(), Some(Operator::LogNot));
        assert_eq!(Operator::Mul.unary_form(), None);
    }

    #[test]
    fn wrapping_arithmetic() {
        assert_eq!(int(Operator::Add, i32::MAX, 1), i32::MIN);
        assert_eq!(int(Operator::Neg, i32::MIN, 0), i32::MIN);
        assert_eq!(int(Operator::Abs, -7, 0), 7);
        assert_eq!(int(Operator::Mul, 0x10000, 0x10000), 0);
        assert_eq!(int(Operator::Div, i32::MIN, -1), i32::MIN);
        assert_eq!(int(Operator::Div, -7, 2), -3);
        assert_eq!(int(Operator::Rem, -7, 2), -1);
        assert_eq!(int(Operator::DivU, -1, 2), i32::MAX);
    }

    #[test]
    fn divide_by_zero_faults() {
        for op in [Operator::Div, Operator::DivU, Operator::Rem, Operator::RemU, Operator::Frac] {
            assert_eq!(apply(op, false, 5, 0), Err(OpFault::DivideByZero));
        }
        assert_eq!(
            apply(Operator::FDiv, true, 1.0f32.to_bits(), 0),
            Err(OpFault::DivideByZero)
        );
    }

    #[test]
    fn bit_operators() {
        assert_eq!(int(Operator::Encod, 0, 0), 0);
        assert_eq!(int(Operator::Encod, 0x100, 0), 8);
        assert_eq!(int(Operator::Decod, 33, 0), 2);
        assert_eq!(int(Operator::Bmask, 3, 0), 0xF);
        assert_eq!(int(Operator::Bmask, 31, 0), -1);
        assert_eq!(int(Operator::Ones, 0xF0F0, 0), 8);
        assert_eq!(int(Operator::Sar, -16, 2), -4);
        assert_eq!(int(Operator::Shr, -16, 28), 0xF);
        assert_eq!(int(Operator::Ror, 1, 1), i32::MIN);
        assert_eq!(int(Operator::Rev, 0b0011, 3), 0b1100);
        assert_eq!(int(Operator::Zerox, -1, 7), 0xFF);
        assert_eq!(int(Operator::Signx, 0x80, 7), -128);
        assert_eq!(int(Operator::AddBits, 3, 4), 3 | (4 << 5));
        assert_eq!(int(Operator::AddPins, 40, 2), 40 | (2 << 6));
    }

    #[test]
    fn scaling_operators() {
        assert_eq!(int(Operator::Sca, 0x8000_0000u32 as i32, 10), 5);
        assert_eq!(int(Operator::Scas, 1 << 30, -3), -3);
        assert_eq!(int(Operator::Frac, 1, 2), i32::MIN);
        assert_eq!(int(Operator::Sqrt, 99, 0), 9);
        assert_eq!(int(Operator::Sqrt, -1, 0), 65535);
    }

    #[test]
    fn qlog_and_qexp_invert() {
        assert_eq!(qlog(1), 0);
        assert_eq!(qlog(2), 1 << 27);
        assert_eq!(qexp(qlog(1 << 20)), 1 << 20);
        assert_eq!(qexp(u32::MAX), u32::MAX);
    }

    #[test]
    fn comparisons_produce_all_ones() {
        assert_eq!(int(Operator::Lt, -1, 0), -1);
        assert_eq!(int(Operator::LtU, -1, 0), 0);
        assert_eq!(int(Operator::LteGt, 5, 2), 1);
        assert_eq!(int(Operator::LteGt, 2, 5), -1);
        assert_eq!(int(Operator::LogAnd, 3, 0), 0);
        assert_eq!(int(Operator::LogXor, 3, 0), -1);
        assert_eq!(int(Operator::Fge, -5, 3), 3);
        assert_eq!(int(Operator::Fle, -5, 3), -5);
    }

    #[test]
    fn float_arithmetic() {
        assert_eq!(float(Operator::Add, 1.5, 2.25), 3.75);
        assert_eq!(float(Operator::FMul, 3.0, -2.0), -6.0);
        assert_eq!(float(Operator::Neg, 2.0, 0.0), -2.0);
        assert_eq!(float(Operator::FSqrt, 16.0, 0.0), 4.0);
        assert_eq!(float(Operator::Pow, 2.0, 10.0), 1024.0);
        assert_eq!(float(Operator::Log2, 8.0, 0.0), 3.0);
        assert_eq!(float(Operator::Lt, 1.0, 2.0), 1.0);
        assert_eq!(float(Operator::LteGt, 1.0, 2.0), -1.0);
        assert_eq!(float(Operator::Fge, 1.0, 2.0), 2.0);
    }

    #[test]
    fn float_overflow_is_reported() {
        let big = f32::MAX.to_bits();
        assert_eq!(apply(Operator::Mul, true, big, big), Err(OpFault::FloatOverflow));
        assert_eq!(
            apply(Operator::Log, true, (-1.0f32).to_bits(), 0),
            Err(OpFault::FloatOverflow)
        );
    }

    #[test]
    fn subnormal_results_are_kept() {
        let tiny = f32::MIN_POSITIVE.to_bits();
        let half = 0.5f32.to_bits();
        let result = apply(Operator::Mul, true, tiny, half).unwrap();
        assert!(f32::from_bits(result) > 0.0);
        assert_eq!(result & EXPONENT_MASK, 0);
    }

    #[test]
    fn float_truthiness_ignores_sign() {
        assert!(!truthy((-0.0f32).to_bits(), true));
        assert!(truthy((-0.0f32).to_bits(), false));
        assert_eq!(float(Operator::LogNot, -0.0, 0.0), 1.0);
    }

    #[test]
    fn int_only_ops_reject_float_mode() {
        assert_eq!(apply(Operator::BitAnd, true, 1, 1), Err(OpFault::WrongMode("&")));
        assert_eq!(apply(Operator::Pow, false, 1, 1), Err(OpFault::WrongMode("POW")));
    }

    #[test]
    fn conversions() {
        assert_eq!(f32::from_bits(int_to_float(-3i32 as u32)), -3.0);
        assert_eq!(float_to_int(2.5f32.to_bits(), true), Ok(3));
        assert_eq!(float_to_int((-2.7f32).to_bits(), false), Ok(-2i32 as u32));
        assert_eq!(float_to_int(3.0e10f32.to_bits(), true), Err(OpFault::FloatOverflow));
    }
}
