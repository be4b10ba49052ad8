pub mod ansi;
pub mod json;
pub mod registry;

use crate::compiler::{CompileError, ErrorKind};
use crate::lexer::LexError;
use crate::token::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: true });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---- From impls for the compiler's error types ----

impl From<&LexError> for Diagnostic {
    fn from(e: &LexError) -> Self {
        let message = if e.code == "SPN-L001" {
            format!("unexpected token '{}'", e.snippet)
        } else {
            format!("invalid constant '{}'", e.snippet)
        };
        let mut d = Diagnostic::error(message)
            .with_code(e.code)
            .with_span(e.span, "here");
        if !e.suggestion.is_empty() {
            d = d.with_suggestion(e.suggestion.clone());
        }
        d
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(e: &CompileError) -> Self {
        let label = match e.kind {
            ErrorKind::Syntax => "here",
            ErrorKind::Limit => "limit reached here",
            ErrorKind::Type => "in this expression",
            ErrorKind::Range => "too far",
            ErrorKind::Internal => "while compiling this",
        };
        let d = Diagnostic::error(&e.message).with_code(e.code);
        let d = if e.span == Span::UNKNOWN { d } else { d.with_span(e.span, label) };
        if e.kind == ErrorKind::Internal {
            d.with_note("this is a compiler fault, not a problem with the source")
        } else {
            d
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_error_builder() {
        let d = Diagnostic::error("something went wrong");
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "something went wrong");
        assert!(d.code.is_none());
        assert!(d.labels.is_empty());
        assert!(d.suggestion.is_none());
    }

    #[test]
    fn from_lex_error() {
        let err = crate::lexer::lex("a := 1 ` 2").unwrap_err();
        let d = Diagnostic::from(&err);
        assert_eq!(d.code, Some("SPN-L001"));
        assert_eq!(d.labels[0].span.start, 7);
        assert!(d.suggestion.is_some());
    }

    #[test]
    fn from_compile_error() {
        let e = CompileError::new(ErrorKind::Range, "SPN-R001", Span { start: 10, end: 15 }, "Branch target out of range");
        let d = Diagnostic::from(&e);
        assert_eq!(d.code, Some("SPN-R001"));
        assert!(d.message.contains("out of range"));
        assert_eq!(d.labels[0].span, Span { start: 10, end: 15 });
        assert!(d.notes.is_empty());
    }

    #[test]
    fn internal_errors_carry_a_note() {
        let e = CompileError::new(ErrorKind::Internal, "SPN-I001", Span::UNKNOWN, "Branch relaxation did not converge");
        let d = Diagnostic::from(&e);
        assert!(d.labels.is_empty());
        assert_eq!(d.notes.len(), 1);
    }
}
