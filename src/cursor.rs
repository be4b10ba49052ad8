//! Positioned reader over a token sequence with symbol substitution and backtracking.

use crate::symbols::SymbolLookup;
use crate::token::{Span, Token, TokenKind};

/// Saved cursor position; see [`Cursor::mark`] and [`Cursor::reset`].
pub type Position = usize;

pub struct Cursor<'a> {
    tokens: &'a [Token],
    pos: Position,
    symbols: &'a dyn SymbolLookup,
    spelling: Option<String>,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Token], symbols: &'a dyn SymbolLookup) -> Self {
        Cursor { tokens, pos: 0, symbols, spelling: None }
    }

    /// Return the next token and move past it. Identifiers the symbol table knows are
    /// returned as the kind and value they stand for; their source spelling stays
    /// available through [`Cursor::last_spelling`]. Past the end, `EndFile` repeats.
    pub fn advance(&mut self) -> Token {
        let raw = self.raw(self.pos);
        self.pos += 1;
        self.spelling = match &raw.kind {
            TokenKind::Ident(name) => Some(name.clone()),
            _ => None,
        };
        self.substitute(raw)
    }

    /// The token [`Cursor::advance`] would return, without moving.
    pub fn peek(&self) -> Token {
        self.substitute(self.raw(self.pos))
    }

    pub fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    /// Step back one token.
    pub fn retreat(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    pub fn mark(&self) -> Position {
        self.pos
    }

    pub fn reset(&mut self, pos: Position) {
        self.pos = pos;
    }

    /// Source spelling of the most recently advanced identifier.
    pub fn last_spelling(&self) -> Option<&str> {
        self.spelling.as_deref()
    }

    /// Span of the token about to be read.
    pub fn span(&self) -> Span {
        self.raw(self.pos).span
    }

    /// Span of the token just read.
    pub fn previous_span(&self) -> Span {
        self.raw(self.pos.saturating_sub(1)).span
    }

    fn raw(&self, pos: Position) -> Token {
        match self.tokens.get(pos).or_else(|| self.tokens.last()) {
            Some(token) if pos < self.tokens.len() => token.clone(),
            Some(last) => Token::new(TokenKind::EndFile, last.span).at(last.line, 0),
            None => Token::new(TokenKind::EndFile, Span::UNKNOWN),
        }
    }

    fn substitute(&self, token: Token) -> Token {
        let TokenKind::Ident(name) = &token.kind else {
            return token;
        };
        match self.symbols.lookup(name) {
            Some(symbol) => Token { kind: symbol.token_kind(), value: symbol.value(), ..token },
            None => token,
        }
    }
}
