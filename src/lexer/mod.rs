use logos::Logos;

use crate::ops::Operator;
use crate::token::source_map::SourceMap;
use crate::token::{LookKind, Span, Token, TokenKind};

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip(r"'[^\n]*", allow_greedy = true))]
#[logos(skip r"\{[^}]*\}")]
enum Lexeme {
    // Longest symbol wins, so `+//` beats `+/` beats `+`.
    #[token("!")]
    Bang,
    #[token("-")]
    Minus,
    #[token("-.")]
    MinusDot,
    #[token("+")]
    Plus,
    #[token("+.")]
    PlusDot,
    #[token("*")]
    Star,
    #[token("*.")]
    StarDot,
    #[token("/")]
    Slash,
    #[token("/.")]
    SlashDot,
    #[token("+/")]
    PlusSlash,
    #[token("//")]
    SlashSlash,
    #[token("+//")]
    PlusSlashSlash,
    #[token(">>")]
    ShiftRight,
    #[token("<<")]
    ShiftLeft,
    #[token("&")]
    Amp,
    #[token("^")]
    Caret,
    #[token("|")]
    Pipe,
    #[token("#>")]
    LimitMin,
    #[token("<#")]
    LimitMax,
    #[token("<")]
    Less,
    #[token("<.")]
    LessDot,
    #[token("+<")]
    PlusLess,
    #[token("<=")]
    LessEq,
    #[token("<=.")]
    LessEqDot,
    #[token("+<=")]
    PlusLessEq,
    #[token("==")]
    EqEq,
    #[token("==.")]
    EqEqDot,
    #[token("<>")]
    NotEq,
    #[token("<>.")]
    NotEqDot,
    #[token(">=")]
    GreaterEq,
    #[token(">=.")]
    GreaterEqDot,
    #[token("+>=")]
    PlusGreaterEq,
    #[token(">")]
    Greater,
    #[token(">.")]
    GreaterDot,
    #[token("+>")]
    PlusGreater,
    #[token("<=>")]
    Compare,
    #[token("!!")]
    BangBang,
    #[token("&&")]
    AmpAmp,
    #[token("^^")]
    CaretCaret,
    #[token("||")]
    PipePipe,
    #[token("?")]
    Question,

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(":=")]
    Assign,
    #[token("=")]
    Equal,
    #[token("..")]
    DotDot,

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+")]
    Float,
    #[regex(r"[0-9][0-9_]*")]
    Decimal,
    #[regex(r"\$[0-9a-fA-F][0-9a-fA-F_]*")]
    Hex,
    #[regex(r"%[01][01_]*")]
    Binary,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Word,

    #[token("\n")]
    Newline,
}

fn symbol_operator(lexeme: &Lexeme) -> Option<Operator> {
    use Operator::*;
    let op = match lexeme {
        Lexeme::Bang => BitNot,
        Lexeme::Minus => Sub,
        Lexeme::MinusDot => FSub,
        Lexeme::Plus => Add,
        Lexeme::PlusDot => FAdd,
        Lexeme::Star => Mul,
        Lexeme::StarDot => FMul,
        Lexeme::Slash => Div,
        Lexeme::SlashDot => FDiv,
        Lexeme::PlusSlash => DivU,
        Lexeme::SlashSlash => Rem,
        Lexeme::PlusSlashSlash => RemU,
        Lexeme::ShiftRight => Shr,
        Lexeme::ShiftLeft => Shl,
        Lexeme::Amp => BitAnd,
        Lexeme::Caret => BitXor,
        Lexeme::Pipe => BitOr,
        Lexeme::LimitMin => Fge,
        Lexeme::LimitMax => Fle,
        Lexeme::Less => Lt,
        Lexeme::LessDot => FLt,
        Lexeme::PlusLess => LtU,
        Lexeme::LessEq => Lte,
        Lexeme::LessEqDot => FLte,
        Lexeme::PlusLessEq => LteU,
        Lexeme::EqEq => Eq,
        Lexeme::EqEqDot => FEq,
        Lexeme::NotEq => Ne,
        Lexeme::NotEqDot => FNe,
        Lexeme::GreaterEq => Gte,
        Lexeme::GreaterEqDot => FGte,
        Lexeme::PlusGreaterEq => GteU,
        Lexeme::Greater => Gt,
        Lexeme::GreaterDot => FGt,
        Lexeme::PlusGreater => GtU,
        Lexeme::Compare => LteGt,
        Lexeme::BangBang => LogNot,
        Lexeme::AmpAmp => LogAnd,
        Lexeme::CaretCaret => LogXor,
        Lexeme::PipePipe => LogOr,
        Lexeme::Question => Ternary,
        _ => return None,
    };
    Some(op)
}

/// Reserved words, matched without regard to case.
fn keyword(word: &str) -> Option<TokenKind> {
    use Operator::*;
    let kind = match word.to_ascii_uppercase().as_str() {
        "IF" => TokenKind::If,
        "IFNOT" => TokenKind::IfNot,
        "ELSEIF" => TokenKind::ElseIf,
        "ELSEIFNOT" => TokenKind::ElseIfNot,
        "ELSE" => TokenKind::Else,
        "CASE" => TokenKind::Case,
        "CASE_FAST" => TokenKind::CaseFast,
        "OTHER" => TokenKind::Other,
        "REPEAT" => TokenKind::Repeat,
        "WHILE" => TokenKind::While,
        "UNTIL" => TokenKind::Until,
        "FROM" => TokenKind::From,
        "TO" => TokenKind::To,
        "STEP" => TokenKind::Step,
        "WITH" => TokenKind::With,
        "NEXT" => TokenKind::Next,
        "QUIT" => TokenKind::Quit,
        "RETURN" => TokenKind::Return,
        "ABORT" => TokenKind::Abort,
        "FLOAT" => TokenKind::Float,
        "ROUND" => TokenKind::Round,
        "TRUNC" => TokenKind::Trunc,
        "LOOKUP" => TokenKind::Look(LookKind::Lookup),
        "LOOKUPZ" => TokenKind::Look(LookKind::Lookupz),
        "LOOKDOWN" => TokenKind::Look(LookKind::Lookdown),
        "LOOKDOWNZ" => TokenKind::Look(LookKind::Lookdownz),

        "ABS" => TokenKind::Op(Abs),
        "FABS" => TokenKind::Op(FAbs),
        "ENCOD" => TokenKind::Op(Encod),
        "DECOD" => TokenKind::Op(Decod),
        "BMASK" => TokenKind::Op(Bmask),
        "ONES" => TokenKind::Op(Ones),
        "SQRT" => TokenKind::Op(Sqrt),
        "FSQRT" => TokenKind::Op(FSqrt),
        "QLOG" => TokenKind::Op(Qlog),
        "QEXP" => TokenKind::Op(Qexp),
        "LOG2" => TokenKind::Op(Log2),
        "LOG10" => TokenKind::Op(Log10),
        "LOG" => TokenKind::Op(Log),
        "EXP2" => TokenKind::Op(Exp2),
        "EXP10" => TokenKind::Op(Exp10),
        "EXP" => TokenKind::Op(Exp),
        "SAR" => TokenKind::Op(Sar),
        "ROR" => TokenKind::Op(Ror),
        "ROL" => TokenKind::Op(Rol),
        "REV" => TokenKind::Op(Rev),
        "ZEROX" => TokenKind::Op(Zerox),
        "SIGNX" => TokenKind::Op(Signx),
        "SCA" => TokenKind::Op(Sca),
        "SCAS" => TokenKind::Op(Scas),
        "FRAC" => TokenKind::Op(Frac),
        "POW" => TokenKind::Op(Pow),
        "ADDBITS" => TokenKind::Op(AddBits),
        "ADDPINS" => TokenKind::Op(AddPins),
        "NOT" => TokenKind::Op(LogNot),
        "AND" => TokenKind::Op(LogAnd),
        "XOR" => TokenKind::Op(LogXor),
        "OR" => TokenKind::Op(LogOr),
        _ => return None,
    };
    Some(kind)
}

/// Lex source text into tokens. Every line that produced a token is closed by an
/// `End`; the stream always finishes with `EndFile`.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let map = SourceMap::new(source);
    let mut lexer = Lexeme::lexer(source);
    let mut tokens: Vec<Token> = Vec::new();
    let mut line_open = false;

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span { start: range.start, end: range.end };
        let text = lexer.slice();
        let lexeme = match result {
            Ok(lexeme) => lexeme,
            Err(()) => return Err(LexError::unexpected(text, span)),
        };

        if lexeme == Lexeme::Newline {
            if line_open {
                tokens.push(Token::new(TokenKind::End, span).at(map.lookup(span.start).0, 0));
                line_open = false;
            }
            continue;
        }

        let (kind, value) = match lexeme {
            Lexeme::Decimal => (TokenKind::ConInt, parse_radix(text, 10, span)?),
            Lexeme::Hex => (TokenKind::ConInt, parse_radix(&text[1..], 16, span)?),
            Lexeme::Binary => (TokenKind::ConInt, parse_radix(&text[1..], 2, span)?),
            Lexeme::Float => (TokenKind::ConFloat, parse_float(text, span)?),
            Lexeme::Word => match keyword(text) {
                Some(kind) => (kind, 0),
                None => (TokenKind::Ident(text.to_string()), 0),
            },
            Lexeme::LeftParen => (TokenKind::LeftParen, 0),
            Lexeme::RightParen => (TokenKind::RightParen, 0),
            Lexeme::Comma => (TokenKind::Comma, 0),
            Lexeme::Colon => (TokenKind::Colon, 0),
            Lexeme::Assign => (TokenKind::Assign, 0),
            Lexeme::Equal => (TokenKind::Equal, 0),
            Lexeme::DotDot => (TokenKind::DotDot, 0),
            other => match symbol_operator(&other) {
                Some(op) => (TokenKind::Op(op), 0),
                None => return Err(LexError::unexpected(text, span)),
            },
        };

        let (line, _) = map.lookup(span.start);
        let column = map.expanded_column(source, span.start);
        tokens.push(Token::new(kind, span).with_value(value).at(line, column));
        line_open = true;
    }

    let end = Span { start: source.len(), end: source.len() };
    let (last_line, _) = map.lookup(source.len());
    if line_open {
        tokens.push(Token::new(TokenKind::End, end).at(last_line, 0));
    }
    tokens.push(Token::new(TokenKind::EndFile, end).at(last_line, 0));
    Ok(tokens)
}

fn parse_radix(digits: &str, radix: u32, span: Span) -> Result<u32, LexError> {
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    u32::from_str_radix(&cleaned, radix).map_err(|_| LexError {
        code: "SPN-L002",
        span,
        snippet: digits.to_string(),
        suggestion: "Integer constants must fit in 32 bits".into(),
    })
}

fn parse_float(text: &str, span: Span) -> Result<u32, LexError> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    let parsed = cleaned.parse::<f32>().ok().filter(|f| f.is_finite());
    parsed.map(f32::to_bits).ok_or_else(|| LexError {
        code: "SPN-L003",
        span,
        snippet: text.to_string(),
        suggestion: "Floating-point constants must fit in single precision".into(),
    })
}

#[derive(Debug, thiserror::Error)]
#[error("Lex error at position {}: '{snippet}'. {suggestion}", span.start)]
pub struct LexError {
    pub code: &'static str,
    pub span: Span,
    pub snippet: String,
    pub suggestion: String,
}

impl LexError {
    fn unexpected(text: &str, span: Span) -> Self {
        let suggestion = if text.starts_with('"') {
            "String literals are not expressions here".to_string()
        } else {
            format!("Unexpected character(s): '{text}'")
        };
        LexError { code: "SPN-L001", span, snippet: text.to_string(), suggestion }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_assignment_line() {
        assert_eq!(
            kinds("x := y + 3"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Assign,
                TokenKind::Ident("y".into()),
                TokenKind::Op(Operator::Add),
                TokenKind::ConInt,
                TokenKind::End,
                TokenKind::EndFile,
            ]
        );
    }

    #[test]
    fn keywords_ignore_case() {
        assert_eq!(kinds("Repeat")[0], TokenKind::Repeat);
        assert_eq!(kinds("case_fast")[0], TokenKind::CaseFast);
        assert_eq!(kinds("elseIfNot")[0], TokenKind::ElseIfNot);
        assert_eq!(kinds("and")[0], TokenKind::Op(Operator::LogAnd));
        assert_eq!(kinds("lookdownz")[0], TokenKind::Look(LookKind::Lookdownz));
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(
            kinds("a +// b +/ c <=. d <=> e")
                .into_iter()
                .filter_map(|k| match k {
                    TokenKind::Op(op) => Some(op),
                    _ => None,
                })
                .collect::<Vec<_>>(),
            vec![Operator::RemU, Operator::DivU, Operator::FLte, Operator::LteGt]
        );
    }

    #[test]
    fn numeric_literals() {
        let tokens = lex("$FF %1010 1_000 1.5 2e3").unwrap();
        let values: Vec<u32> = tokens.iter().take(5).map(|t| t.value).collect();
        assert_eq!(values, vec![255, 10, 1000, 1.5f32.to_bits(), 2000.0f32.to_bits()]);
        assert_eq!(tokens[3].kind, TokenKind::ConFloat);
    }

    #[test]
    fn range_is_not_a_float() {
        assert_eq!(
            kinds("1..5"),
            vec![
                TokenKind::ConInt,
                TokenKind::DotDot,
                TokenKind::ConInt,
                TokenKind::End,
                TokenKind::EndFile
            ]
        );
    }

    #[test]
    fn columns_expand_tabs_and_blank_lines_vanish() {
        let tokens = lex("if a\n\n\tb\n' note\n  {block}c").unwrap();
        let placed: Vec<(usize, u32)> = tokens
            .iter()
            .filter(|t| !t.is_line_end())
            .map(|t| (t.line, t.column))
            .collect();
        assert_eq!(placed, vec![(1, 0), (1, 3), (3, 8), (5, 9)]);
        let ends = tokens.iter().filter(|t| t.kind == TokenKind::End).count();
        assert_eq!(ends, 3);
    }

    #[test]
    fn oversized_integer_rejected() {
        let err = lex("4294967296").unwrap_err();
        assert_eq!(err.code, "SPN-L002");
        assert_eq!(lex("4294967295").unwrap()[0].value, u32::MAX);
    }

    #[test]
    fn unexpected_character() {
        let err = lex("x := @y").unwrap_err();
        assert_eq!(err.code, "SPN-L001");
        assert_eq!(err.span.start, 5);
    }
}
