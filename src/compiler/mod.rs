//! Expression folding, bytecode emission and block compilation over one token stream.

mod block;
pub mod con;
mod emit;
mod resolve;
mod stack;

use tracing::debug;

use crate::config::CompilerConfig;
use crate::cursor::Cursor;
use crate::image::{ImageError, ObjectImage};
use crate::ops::OpFault;
use crate::symbols::SymbolLookup;
use crate::token::{Span, Token, TokenKind};

use block::BlockState;
use stack::ValueStack;

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed source.
    Syntax,
    /// A configured or format limit was exceeded.
    Limit,
    /// Integer/float mode conflict, or an operation that cannot be done in its mode.
    Type,
    /// A value or displacement outside what its encoding can hold.
    Range,
    /// The compiler broke one of its own invariants.
    Internal,
}

/// First error of a compilation unit. Compilation stops at the first one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub span: Span,
    pub message: String,
}

impl CompileError {
    pub fn new(kind: ErrorKind, code: &'static str, span: Span, message: impl Into<String>) -> Self {
        CompileError { kind, code, span, message: message.into() }
    }

    pub(crate) fn syntax(code: &'static str, span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, code, span, message)
    }

    pub(crate) fn limit(code: &'static str, span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Limit, code, span, message)
    }

    pub(crate) fn internal(code: &'static str, span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, code, span, message)
    }

    pub(crate) fn from_fault(fault: OpFault, span: Span) -> Self {
        match fault {
            OpFault::DivideByZero => Self::new(ErrorKind::Type, "SPN-T003", span, "Divide by zero"),
            OpFault::FloatOverflow => {
                Self::new(ErrorKind::Type, "SPN-T004", span, "Floating-point overflow")
            }
            OpFault::WrongMode(_) => Self::internal("SPN-I004", span, fault.to_string()),
        }
    }

    pub(crate) fn from_image(err: ImageError, span: Span) -> Self {
        match err {
            ImageError::Overflow => Self::limit("SPN-K006", span, err.to_string()),
            ImageError::OutOfBounds(_) => Self::internal("SPN-I003", span, err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

// ── Evaluation mode ──────────────────────────────────────────────────

/// Integer/float mode of the expression being compiled. Starts undecided and locks on
/// the first literal, constant symbol or mode-specific operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Undecided,
    Int,
    Float,
}

/// A folded expression: its 32-bit pattern and whether that pattern is a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant {
    pub value: u32,
    pub float: bool,
}

// ── Compiler ─────────────────────────────────────────────────────────

pub struct Compiler<'a> {
    pub(crate) cursor: Cursor<'a>,
    pub(crate) stack: ValueStack,
    pub(crate) mode: Mode,
    pub(crate) image: ObjectImage,
    pub(crate) config: CompilerConfig,
    pub(crate) blocks: BlockState,
}

impl<'a> Compiler<'a> {
    pub fn new(tokens: &'a [Token], symbols: &'a dyn SymbolLookup, config: CompilerConfig) -> Self {
        Compiler {
            cursor: Cursor::new(tokens, symbols),
            stack: ValueStack::default(),
            mode: Mode::Undecided,
            image: ObjectImage::new(),
            config,
            blocks: BlockState::default(),
        }
    }

    /// Continue writing into an existing image.
    pub fn with_image(mut self, image: ObjectImage) -> Self {
        self.image = image;
        self
    }

    pub fn cursor(&mut self) -> &mut Cursor<'a> {
        &mut self.cursor
    }

    pub fn image(&self) -> &ObjectImage {
        &self.image
    }

    pub fn into_image(self) -> ObjectImage {
        self.image
    }

    /// Fold the expression at the cursor. On success the cursor sits after it; when the
    /// expression depends on runtime values the cursor is left where it was and `None`
    /// is returned.
    pub fn resolve_constant(&mut self) -> Result<Option<Constant>> {
        self.mode = Mode::Undecided;
        let folded = self.try_resolve(crate::ops::TERNARY_PRECEDENCE, false)?;
        Ok(folded.map(|value| Constant { value, float: self.mode == Mode::Float }))
    }

    /// Emit bytecode that leaves the value of the expression at the cursor on the
    /// interpreter stack.
    pub fn compile_expression(&mut self) -> Result<()> {
        self.relax(|c| c.emit_expression())
    }

    /// Compile statement lines from the cursor to the end of the token stream.
    pub fn compile_method_body(&mut self) -> Result<()> {
        self.relax(|c| c.compile_lines(None))?;
        debug!(size = self.image.offset(), "method body compiled");
        Ok(())
    }

    // ── Shared helpers ───────────────────────────────────────────────

    pub(crate) fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        let span = self.cursor.previous_span();
        self.image
            .append_bytes(bytes)
            .map_err(|e| CompileError::from_image(e, span))
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let token = self.cursor.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(CompileError::syntax(
                "SPN-S002",
                token.span,
                format!("Expected {}, found {}", kind.describe(), token.kind.describe()),
            ))
        }
    }

    /// Consume the end of the current line. `EndFile` satisfies this without being consumed.
    pub(crate) fn expect_end(&mut self) -> Result<()> {
        let token = self.cursor.peek();
        match token.kind {
            TokenKind::End => {
                self.cursor.advance();
                Ok(())
            }
            TokenKind::EndFile => Ok(()),
            other => Err(CompileError::syntax(
                "SPN-S004",
                token.span,
                format!("Expected end of line, found {}", other.describe()),
            )),
        }
    }

    /// Lock the evaluation mode, failing if it is already locked the other way.
    pub(crate) fn require_mode(&mut self, want: Mode, span: Span) -> Result<()> {
        match (self.mode, want) {
            (_, Mode::Undecided) => Ok(()),
            (Mode::Undecided, m) => {
                self.mode = m;
                Ok(())
            }
            (have, want) if have == want => Ok(()),
            (Mode::Int, _) => Err(CompileError::new(
                ErrorKind::Type,
                "SPN-T002",
                span,
                "Floating-point value or operator in an integer expression",
            )),
            (_, _) => Err(CompileError::new(
                ErrorKind::Type,
                "SPN-T001",
                span,
                "Integer value or operator in a floating-point expression",
            )),
        }
    }
}
