pub mod source_map;

use crate::ops::Operator;

// ---- Span infrastructure ----

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

// ---- Tokens ----

/// Which flavour of LOOKUP/LOOKDOWN expression a token introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookKind {
    Lookup,
    Lookupz,
    Lookdown,
    Lookdownz,
}

impl LookKind {
    /// Index base pushed before the index expression: 1 for the plain forms, 0 for the `Z` forms.
    pub fn base(self) -> u32 {
        match self {
            LookKind::Lookup | LookKind::Lookdown => 1,
            LookKind::Lookupz | LookKind::Lookdownz => 0,
        }
    }

    pub fn is_lookdown(self) -> bool {
        matches!(self, LookKind::Lookdown | LookKind::Lookdownz)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Integer constant; the bits are in `Token::value`.
    ConInt,
    /// Float constant; IEEE-754 single bits are in `Token::value`.
    ConFloat,
    /// An identifier no symbol table entry has claimed.
    Ident(String),
    /// Method-local long; `Token::value` is its byte offset.
    Local,
    /// Object variable long; `Token::value` is its byte offset.
    Var,
    Op(Operator),

    Float,
    Round,
    Trunc,
    Look(LookKind),

    If,
    IfNot,
    ElseIf,
    ElseIfNot,
    Else,
    Case,
    CaseFast,
    Other,
    Repeat,
    While,
    Until,
    From,
    To,
    Step,
    With,
    Next,
    Quit,
    Return,
    Abort,

    LeftParen,
    RightParen,
    Comma,
    Colon,
    Assign,
    Equal,
    DotDot,

    /// End of a source line that carried at least one token.
    End,
    EndFile,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::ConInt | TokenKind::ConFloat => "constant".into(),
            TokenKind::Ident(name) => format!("'{name}'"),
            TokenKind::Local => "local variable".into(),
            TokenKind::Var => "variable".into(),
            TokenKind::Op(op) => format!("'{}'", op.symbol()),
            TokenKind::End => "end of line".into(),
            TokenKind::EndFile => "end of file".into(),
            TokenKind::LeftParen => "'('".into(),
            TokenKind::RightParen => "')'".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::Colon => "':'".into(),
            TokenKind::Assign => "':='".into(),
            TokenKind::Equal => "'='".into(),
            TokenKind::DotDot => "'..'".into(),
            TokenKind::CaseFast => "CASE_FAST".into(),
            other => format!("{other:?}").to_uppercase(),
        }
    }
}

/// One lexical unit: its kind, an optional 32-bit payload, and where it sits in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: u32,
    pub span: Span,
    /// 1-based source line.
    pub line: usize,
    /// 0-based column with tabs expanded to multiples of eight.
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, value: 0, span, line: 0, column: 0 }
    }

    pub fn with_value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }

    pub fn at(mut self, line: usize, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn is_line_end(&self) -> bool {
        matches!(self.kind, TokenKind::End | TokenKind::EndFile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_spans() {
        let a = Span { start: 4, end: 9 };
        let b = Span { start: 1, end: 6 };
        assert_eq!(a.merge(b), Span { start: 1, end: 9 });
    }

    #[test]
    fn look_bases() {
        assert_eq!(LookKind::Lookup.base(), 1);
        assert_eq!(LookKind::Lookdownz.base(), 0);
        assert!(LookKind::Lookdownz.is_lookdown());
        assert!(!LookKind::Lookupz.is_lookdown());
    }

    #[test]
    fn describe_kinds() {
        assert_eq!(TokenKind::Ident("Foo".into()).describe(), "'Foo'");
        assert_eq!(TokenKind::CaseFast.describe(), "CASE_FAST");
        assert_eq!(TokenKind::ElseIfNot.describe(), "ELSEIFNOT");
        assert_eq!(TokenKind::Op(Operator::Add).describe(), "'+'");
    }
}
