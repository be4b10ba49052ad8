//! Constant folding by precedence climbing.
//!
//! The folder walks exactly the grammar the emitter walks. Operands it cannot know at
//! compile time (variables, unknown identifiers) drop the stack's `resolved` flag and
//! stand in as zero; from then on operators are parsed but not applied, so domain errors
//! only come from concrete operands. LOOKUP and friends are walked like a variable: their
//! inner expressions are checked in their own modes and the result is never known.

use crate::ops::{self, ModeClass, Operator, TERNARY_PRECEDENCE};
use crate::token::{Span, TokenKind};

use super::{CompileError, Compiler, Mode, Result};

impl Compiler<'_> {
    /// Try to fold the expression at the cursor at `precedence`.
    ///
    /// `Ok(Some(v))` leaves the cursor after the expression. `Ok(None)` restores the
    /// cursor and stack depth, and the evaluation mode too unless `keep_mode` is set.
    pub(super) fn try_resolve(&mut self, precedence: u8, keep_mode: bool) -> Result<Option<u32>> {
        let start = self.cursor.mark();
        let depth = self.stack.depth();
        let mode = self.mode;
        let outer = self.stack.begin();

        self.fold_level(precedence)?;
        let resolved = self.stack.is_resolved();
        let value = if resolved { self.stack.pop() } else { None };
        self.stack.restore(outer);
        self.stack.truncate(depth);

        if let Some(value) = value {
            return Ok(Some(value));
        }
        self.cursor.reset(start);
        if !keep_mode {
            self.mode = mode;
        }
        Ok(None)
    }

    /// Binary operator of exactly `precedence` at the cursor, if any.
    pub(super) fn binary_at(&self, precedence: u8) -> Option<Operator> {
        match self.cursor.peek_kind() {
            TokenKind::Op(op)
                if op.info().arity == ops::Arity::Binary && op.info().precedence == precedence =>
            {
                Some(op)
            }
            _ => None,
        }
    }

    pub(super) fn require_op_mode(&mut self, op: Operator, span: Span) -> Result<()> {
        match op.info().class {
            ModeClass::IntOnly => self.require_mode(Mode::Int, span),
            ModeClass::FloatOnly => self.require_mode(Mode::Float, span),
            ModeClass::Dual | ModeClass::Neutral => Ok(()),
        }
    }

    fn fold_level(&mut self, precedence: u8) -> Result<()> {
        if precedence == 0 {
            return self.fold_term();
        }
        if precedence == TERNARY_PRECEDENCE {
            return self.fold_ternary();
        }
        self.fold_level(precedence - 1)?;
        while let Some(op) = self.binary_at(precedence) {
            let token = self.cursor.advance();
            self.require_op_mode(op, token.span)?;
            self.fold_level(precedence - 1)?;
            let b = self.pop_operand(token.span)?;
            let a = self.pop_operand(token.span)?;
            let value = self.fold(op, a, b, token.span)?;
            self.stack.push(value);
        }
        Ok(())
    }

    fn fold_ternary(&mut self) -> Result<()> {
        self.fold_level(TERNARY_PRECEDENCE - 1)?;
        if self.cursor.peek_kind() != TokenKind::Op(Operator::Ternary) {
            return Ok(());
        }
        let token = self.cursor.advance();
        self.fold_level(TERNARY_PRECEDENCE)?;
        self.expect(TokenKind::Colon)?;
        self.fold_level(TERNARY_PRECEDENCE)?;
        let if_false = self.pop_operand(token.span)?;
        let if_true = self.pop_operand(token.span)?;
        let condition = self.pop_operand(token.span)?;
        let float = self.mode == Mode::Float;
        self.stack.push(if ops::truthy(condition, float) { if_true } else { if_false });
        Ok(())
    }

    fn fold_term(&mut self) -> Result<()> {
        let token = self.cursor.advance();
        match &token.kind {
            TokenKind::ConInt => {
                self.require_mode(Mode::Int, token.span)?;
                self.stack.push(token.value);
            }
            TokenKind::ConFloat => {
                self.require_mode(Mode::Float, token.span)?;
                self.stack.push(token.value);
            }
            TokenKind::Local | TokenKind::Var | TokenKind::Ident(_) => {
                self.stack.mark_unresolved();
                self.stack.push(0);
            }
            TokenKind::Op(op) => {
                let Some(unary) = op.unary_form() else {
                    return Err(expected_term(&token.kind, token.span));
                };
                self.require_op_mode(unary, token.span)?;
                let operand_level = unary.info().precedence.saturating_sub(1);
                self.fold_level(operand_level)?;
                let a = self.pop_operand(token.span)?;
                let value = self.fold(unary, a, 0, token.span)?;
                self.stack.push(value);
            }
            TokenKind::LeftParen => {
                self.fold_level(TERNARY_PRECEDENCE)?;
                self.expect(TokenKind::RightParen)?;
            }
            kind @ (TokenKind::Float | TokenKind::Round | TokenKind::Trunc) => {
                return self.fold_conversion(kind, token.span);
            }
            TokenKind::Look(_) => {
                self.fold_lookup()?;
                self.stack.mark_unresolved();
                self.stack.push(0);
            }
            other => return Err(expected_term(other, token.span)),
        }
        Ok(())
    }

    /// `FLOAT(int)`, `ROUND(float)`, `TRUNC(float)`. The argument is evaluated in its
    /// own mode; the result locks the surrounding mode.
    fn fold_conversion(&mut self, kind: &TokenKind, span: Span) -> Result<()> {
        let (argument_mode, result_mode) = conversion_modes(kind);
        self.expect(TokenKind::LeftParen)?;
        let outer = self.mode;
        self.mode = argument_mode;
        let walk = self.fold_level(TERNARY_PRECEDENCE);
        self.mode = outer;
        walk?;
        self.expect(TokenKind::RightParen)?;
        self.require_mode(result_mode, span)?;

        let a = self.pop_operand(span)?;
        let value = if !self.stack.is_resolved() {
            0
        } else {
            match kind {
                TokenKind::Float => ops::int_to_float(a),
                TokenKind::Round => ops::float_to_int(a, true).map_err(|f| CompileError::from_fault(f, span))?,
                _ => ops::float_to_int(a, false).map_err(|f| CompileError::from_fault(f, span))?,
            }
        };
        self.stack.push(value);
        Ok(())
    }

    /// Walk `(index : item, lo..hi, ...)`. Each inner expression gets a fresh mode, as
    /// the emitter gives it; the values are discarded.
    fn fold_lookup(&mut self) -> Result<()> {
        self.expect(TokenKind::LeftParen)?;
        self.fold_inner()?;
        self.expect(TokenKind::Colon)?;
        loop {
            self.fold_inner()?;
            if self.cursor.peek_kind() == TokenKind::DotDot {
                self.cursor.advance();
                self.fold_inner()?;
            }
            if self.cursor.peek_kind() != TokenKind::Comma {
                break;
            }
            self.cursor.advance();
        }
        self.expect(TokenKind::RightParen).map(|_| ())
    }

    fn fold_inner(&mut self) -> Result<()> {
        let outer = self.mode;
        self.mode = Mode::Undecided;
        let walk = self.fold_level(TERNARY_PRECEDENCE);
        self.mode = outer;
        walk?;
        let span = self.cursor.peek().span;
        self.pop_operand(span).map(|_| ())
    }

    /// Apply `op` unless an earlier operand was unresolved, in which case the result is a placeholder.
    fn fold(&self, op: Operator, a: u32, b: u32, span: Span) -> Result<u32> {
        if !self.stack.is_resolved() {
            return Ok(0);
        }
        ops::apply(op, self.mode == Mode::Float, a, b).map_err(|f| CompileError::from_fault(f, span))
    }

    fn pop_operand(&mut self, span: Span) -> Result<u32> {
        self.stack
            .pop()
            .ok_or_else(|| CompileError::internal("SPN-I002", span, "Value stack underflow"))
    }
}

pub(super) fn conversion_modes(kind: &TokenKind) -> (Mode, Mode) {
    match kind {
        TokenKind::Float => (Mode::Int, Mode::Float),
        _ => (Mode::Float, Mode::Int),
    }
}

pub(super) fn expected_term(found: &TokenKind, span: Span) -> CompileError {
    CompileError::syntax(
        "SPN-S001",
        span,
        format!("Expected a constant, variable, unary operator or '(', found {}", found.describe()),
    )
}

#[cfg(test)]
mod tests {
    use crate::compiler::{Compiler, Constant, ErrorKind};
    use crate::config::CompilerConfig;
    use crate::lexer::lex;
    use crate::symbols::{Symbol, SymbolTable};

    fn symbols() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.insert("width", Symbol::ConInt(40));
        table.insert("scale", Symbol::ConFloat(2.0f32.to_bits()));
        table.insert("x", Symbol::Local(0));
        table
    }

    fn resolve(source: &str) -> Result<Option<Constant>, crate::compiler::CompileError> {
        let tokens = lex(source).unwrap();
        let table = symbols();
        let mut compiler = Compiler::new(&tokens, &table, CompilerConfig::default());
        compiler.resolve_constant()
    }

    fn int(source: &str) -> i32 {
        let constant = resolve(source).unwrap().expect("should fold");
        assert!(!constant.float, "{source} folded as float");
        constant.value as i32
    }

    fn float(source: &str) -> f32 {
        let constant = resolve(source).unwrap().expect("should fold");
        assert!(constant.float, "{source} folded as integer");
        f32::from_bits(constant.value)
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(int("(2 + 3) * 4"), 20);
        assert_eq!(int("2 + 3 * 4"), 14);
        assert_eq!(int("10 - 3 - 2"), 5);
        assert_eq!(int("1 << 4 + 1"), 17);
        assert_eq!(int("-3 * -3"), 9);
        assert_eq!(int("6 | 1 & 3"), 7);
    }

    #[test]
    fn logical_and_comparison_levels() {
        assert_eq!(int("1 < 2 AND 3 > 4"), 0);
        assert_eq!(int("1 < 2 OR 3 > 4"), -1);
        assert_eq!(int("NOT 1 == 2"), -1);
        assert_eq!(int("!0"), -1);
        assert_eq!(int("5 <=> 9"), -1);
    }

    #[test]
    fn ternary_is_right_associative() {
        assert_eq!(int("1 ? 2 : 3"), 2);
        assert_eq!(int("0 ? 2 : 0 ? 3 : 4"), 4);
        assert_eq!(int("(1 > 2) ? 10 : 20 + 1"), 21);
    }

    #[test]
    fn symbols_fold_and_lock_mode() {
        assert_eq!(int("width / 4"), 10);
        assert_eq!(float("scale * 1.5"), 3.0);
        assert_eq!(float("1.0 < 2.0"), 1.0);
        assert_eq!(float("FLOAT(width) / 8.0"), 5.0);
        assert_eq!(int("ROUND(2.6) + TRUNC(-2.6)"), 1);
    }

    #[test]
    fn runtime_operands_do_not_fold() {
        assert_eq!(resolve("x + 1").unwrap(), None);
        assert_eq!(resolve("undefined_name * 2").unwrap(), None);
        assert_eq!(resolve("LOOKUP(2 : 5, 6, 7)").unwrap(), None);
    }

    #[test]
    fn unresolved_chain_suppresses_domain_errors() {
        assert_eq!(resolve("x / 0").unwrap(), None);
        let err = resolve("1 / 0").unwrap_err();
        assert_eq!((err.kind, err.code), (ErrorKind::Type, "SPN-T003"));
    }

    #[test]
    fn failed_fold_restores_cursor() {
        let tokens = lex("x + 1").unwrap();
        let table = symbols();
        let mut compiler = Compiler::new(&tokens, &table, CompilerConfig::default());
        assert_eq!(compiler.resolve_constant().unwrap(), None);
        assert_eq!(compiler.cursor().mark(), 0);
        assert!(compiler.stack.depth() == 0);
    }

    #[test]
    fn successful_fold_consumes_expression() {
        let tokens = lex("3 * 3 : rest").unwrap();
        let table = symbols();
        let mut compiler = Compiler::new(&tokens, &table, CompilerConfig::default());
        let folded = compiler.resolve_constant().unwrap().unwrap();
        assert_eq!(folded.value, 9);
        assert_eq!(compiler.cursor().peek_kind(), crate::token::TokenKind::Colon);
    }

    #[test]
    fn mode_conflicts() {
        let err = resolve("1.5 & 3").unwrap_err();
        assert_eq!((err.kind, err.code), (ErrorKind::Type, "SPN-T001"));
        let err = resolve("3 & 1.5").unwrap_err();
        assert_eq!((err.kind, err.code), (ErrorKind::Type, "SPN-T002"));
        let err = resolve("2 +. 1").unwrap_err();
        assert_eq!((err.kind, err.code), (ErrorKind::Type, "SPN-T002"));
        let err = resolve("FLOAT(1.0)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn float_overflow() {
        let err = resolve("3.0e38 * 10.0").unwrap_err();
        assert_eq!(err.code, "SPN-T004");
    }

    #[test]
    fn malformed_expressions() {
        assert_eq!(resolve("(1 + 2").unwrap_err().code, "SPN-S002");
        assert_eq!(resolve("1 + )").unwrap_err().code, "SPN-S001");
        assert_eq!(resolve("1 ? 2").unwrap_err().code, "SPN-S002");
    }

    #[test]
    fn folds_match_reference_arithmetic() {
        let mut rng = fastrand::Rng::with_seed(0x0BAD_CAFE);
        for _ in 0..300 {
            let a = rng.i32(..);
            let b = rng.i32(1..=i32::MAX);
            let sum = format!("{a} + {b}");
            assert_eq!(int(&sum), a.wrapping_add(b), "{sum}");
            assert_eq!(int(&format!("({a}) * {b}")), a.wrapping_mul(b));
            assert_eq!(int(&format!("({a}) / {b}")), a.wrapping_div(b));
            assert_eq!(int(&format!("({a}) SAR {}", b & 31)), a >> (b & 31));
        }
    }

    fn bool_bits(b: bool) -> u32 {
        if b { u32::MAX } else { 0 }
    }

    #[test]
    fn unsigned_and_shift_folds_match_reference() {
        let mut rng = fastrand::Rng::with_seed(0x5EED_0003);
        for _ in 0..300 {
            let a = rng.u32(..);
            let b = rng.u32(1..);
            let s = rng.u32(0..32);
            let mask = ((1u64 << (s + 1)) - 1) as u32;
            let sign = 1u32 << s;
            let signx = if a & sign != 0 { a | !mask } else { a & mask };
            let cases = [
                ("+/", b, a / b),
                ("+//", b, a % b),
                ("//", b, (a as i32).wrapping_rem(b as i32) as u32),
                ("<<", s, a << s),
                (">>", s, a >> s),
                ("ROR", s, a.rotate_right(s)),
                ("ROL", s, a.rotate_left(s)),
                ("ZEROX", s, a & mask),
                ("SIGNX", s, signx),
                ("+<", b, bool_bits(a < b)),
                ("+<=", b, bool_bits(a <= b)),
                ("+>", b, bool_bits(a > b)),
                ("+>=", b, bool_bits(a >= b)),
            ];
            for (op, rhs, expected) in cases {
                let text = format!("${a:X} {op} ${rhs:X}");
                assert_eq!(int(&text) as u32, expected, "{text}");
            }
        }
    }

    fn float_literal(rng: &mut fastrand::Rng) -> String {
        let text = format!("{}.{}e{}", rng.u32(1..1000), rng.u32(0..1000), rng.i32(-30..=30));
        if rng.bool() { format!("(-{text})") } else { text }
    }

    fn literal_value(text: &str) -> f32 {
        let negative = text.starts_with('(');
        let digits = text.trim_start_matches("(-").trim_end_matches(')');
        let value: f32 = digits.parse().unwrap();
        if negative { -value } else { value }
    }

    #[test]
    fn float_folds_match_reference() {
        let mut rng = fastrand::Rng::with_seed(0x5EED_0004);
        let arithmetic: [(&str, fn(f32, f32) -> f32); 8] = [
            ("+", |x, y| x + y),
            ("+.", |x, y| x + y),
            ("-", |x, y| x - y),
            ("-.", |x, y| x - y),
            ("*", |x, y| x * y),
            ("*.", |x, y| x * y),
            ("/", |x, y| x / y),
            ("/.", |x, y| x / y),
        ];
        let comparisons: [(&str, fn(f32, f32) -> bool); 8] = [
            ("<", |x, y| x < y),
            ("<.", |x, y| x < y),
            ("<=", |x, y| x <= y),
            ("==", |x, y| x == y),
            ("<>", |x, y| x != y),
            (">=", |x, y| x >= y),
            (">", |x, y| x > y),
            (">.", |x, y| x > y),
        ];
        let mut overflows = 0;
        for _ in 0..300 {
            let (lhs, rhs) = (float_literal(&mut rng), float_literal(&mut rng));
            let (x, y) = (literal_value(&lhs), literal_value(&rhs));
            for (op, reference) in arithmetic {
                let text = format!("{lhs} {op} {rhs}");
                let expected = reference(x, y);
                if expected.is_finite() {
                    assert_eq!(float(&text).to_bits(), expected.to_bits(), "{text}");
                } else {
                    overflows += 1;
                    assert_eq!(resolve(&text).unwrap_err().code, "SPN-T004", "{text}");
                }
            }
            for (op, reference) in comparisons {
                let text = format!("{lhs} {op} {rhs}");
                let expected = if reference(x, y) { 1.0 } else { 0.0 };
                assert_eq!(float(&text), expected, "{text}");
            }
        }
        assert!(overflows > 0);
    }
}
