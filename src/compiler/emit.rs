//! Bytecode emission for expressions.
//!
//! Same precedence climb as the folder. Every level first asks the folder whether the
//! tokens ahead reduce to a constant; only when they do not does it emit operands and
//! operators.

use crate::bytecode::{self, VarKind};
use crate::ops::{ModeClass, Operator, TERNARY_PRECEDENCE};
use crate::token::{Span, TokenKind};

use super::resolve::{conversion_modes, expected_term};
use super::{CompileError, Compiler, ErrorKind, Mode, Result};

impl Compiler<'_> {
    /// Emit one complete expression in a fresh evaluation mode.
    pub(crate) fn emit_expression(&mut self) -> Result<()> {
        let outer = self.mode;
        self.mode = Mode::Undecided;
        let result = self.emit_top();
        self.mode = outer;
        result
    }

    fn emit_top(&mut self) -> Result<()> {
        // A failed whole-expression fold still settles the mode from the literals it saw,
        // so operators emitted before the deciding operand pick the right form.
        if let Some(value) = self.try_resolve(TERNARY_PRECEDENCE, true)? {
            return self.emit_constant(value);
        }
        self.emit_structure(TERNARY_PRECEDENCE)
    }

    fn emit_level(&mut self, precedence: u8) -> Result<()> {
        if let Some(value) = self.try_resolve(precedence, false)? {
            return self.emit_constant(value);
        }
        self.emit_structure(precedence)
    }

    fn emit_structure(&mut self, precedence: u8) -> Result<()> {
        if precedence == 0 {
            return self.emit_term();
        }
        if precedence == TERNARY_PRECEDENCE {
            self.emit_level(TERNARY_PRECEDENCE - 1)?;
            if self.cursor.peek_kind() == TokenKind::Op(Operator::Ternary) {
                self.cursor.advance();
                self.emit_level(TERNARY_PRECEDENCE)?;
                self.expect(TokenKind::Colon)?;
                self.emit_level(TERNARY_PRECEDENCE)?;
                self.emit(&[bytecode::BC_TERNARY])?;
            }
            return Ok(());
        }
        self.emit_level(precedence - 1)?;
        while let Some(op) = self.binary_at(precedence) {
            let token = self.cursor.advance();
            self.require_op_mode(op, token.span)?;
            self.emit_level(precedence - 1)?;
            self.emit_operator(op, token.span)?;
        }
        Ok(())
    }

    fn emit_term(&mut self) -> Result<()> {
        let token = self.cursor.advance();
        match &token.kind {
            TokenKind::ConInt => {
                self.require_mode(Mode::Int, token.span)?;
                self.emit_constant(token.value)
            }
            TokenKind::ConFloat => {
                self.require_mode(Mode::Float, token.span)?;
                self.emit_constant(token.value)
            }
            TokenKind::Local => self.emit_variable(VarKind::Local, token.value, bytecode::VAR_READ),
            TokenKind::Var => self.emit_variable(VarKind::Var, token.value, bytecode::VAR_READ),
            TokenKind::Ident(name) => Err(undefined_symbol(name, token.span)),
            TokenKind::Op(op) => {
                let Some(unary) = op.unary_form() else {
                    return Err(expected_term(&token.kind, token.span));
                };
                self.require_op_mode(unary, token.span)?;
                self.emit_level(unary.info().precedence.saturating_sub(1))?;
                self.emit_operator(unary, token.span)
            }
            TokenKind::LeftParen => {
                self.emit_level(TERNARY_PRECEDENCE)?;
                self.expect(TokenKind::RightParen).map(|_| ())
            }
            kind @ (TokenKind::Float | TokenKind::Round | TokenKind::Trunc) => {
                self.emit_conversion(kind, token.span)
            }
            TokenKind::Look(kind) => self.compile_lookup(*kind, token.span),
            other => Err(expected_term(other, token.span)),
        }
    }

    fn emit_conversion(&mut self, kind: &TokenKind, span: Span) -> Result<()> {
        let (argument_mode, result_mode) = conversion_modes(kind);
        self.expect(TokenKind::LeftParen)?;
        let outer = self.mode;
        self.mode = argument_mode;
        self.emit_level(TERNARY_PRECEDENCE)?;
        self.mode = outer;
        self.expect(TokenKind::RightParen)?;
        self.require_mode(result_mode, span)?;
        let code = match kind {
            TokenKind::Float => bytecode::HUB_FLOAT,
            TokenKind::Round => bytecode::HUB_ROUND,
            _ => bytecode::HUB_TRUNC,
        };
        self.emit(&[bytecode::BC_HUB_BYTECODE, code])
    }

    /// Operator bytecode for the current mode: the main-table code for integer work,
    /// a hub code for float work.
    fn emit_operator(&mut self, op: Operator, span: Span) -> Result<()> {
        let info = op.info();
        let wants_float = info.class == ModeClass::FloatOnly
            || (info.class == ModeClass::Dual && self.mode == Mode::Float);
        if wants_float {
            let Some(code) = info.float_code else {
                return Err(CompileError::new(
                    ErrorKind::Type,
                    "SPN-T005",
                    span,
                    format!("Operator '{}' has no floating-point form at run time", op.symbol()),
                ));
            };
            return self.emit(&[bytecode::BC_HUB_BYTECODE, code]);
        }
        match info.int_code {
            Some(code) => self.emit(&[code]),
            None => Err(CompileError::internal(
                "SPN-I004",
                span,
                format!("Operator '{}' has no integer bytecode", op.symbol()),
            )),
        }
    }

    pub(crate) fn emit_constant(&mut self, value: u32) -> Result<()> {
        self.emit(&bytecode::constant_bytes(value))
    }

    pub(crate) fn emit_variable(&mut self, kind: VarKind, offset: u32, op: u8) -> Result<()> {
        self.emit(&bytecode::variable_bytes(kind, offset, op))
    }
}

pub(super) fn undefined_symbol(name: &str, span: Span) -> CompileError {
    CompileError::syntax("SPN-S003", span, format!("Undefined symbol '{name}'"))
}
