//! Resolution of a leading block of `NAME = expr` constant definitions.
//!
//! Definitions may refer to each other in any order, so they are folded in repeated
//! sweeps; each sweep resolves whatever its predecessors made resolvable.

use tracing::debug;

use crate::config::CompilerConfig;
use crate::cursor::Position;
use crate::symbols::{Layered, Symbol, SymbolLookup, SymbolTable};
use crate::token::{Span, Token, TokenKind};

use super::emit::undefined_symbol;
use super::{CompileError, Compiler, Result};

/// Resolved definitions, in resolution order, and where the statements after them begin.
#[derive(Debug, Clone, PartialEq)]
pub struct ConBlock {
    pub definitions: Vec<(String, Symbol)>,
    pub body_start: Position,
}

struct Definition {
    name: String,
    span: Span,
    expr: Position,
}

pub fn resolve_con_block(
    tokens: &[Token],
    symbols: &dyn SymbolLookup,
    config: &CompilerConfig,
) -> Result<ConBlock> {
    let (mut pending, body_start) = collect_definitions(tokens, symbols)?;
    let mut defined = SymbolTable::new();
    let mut definitions = Vec::new();
    let mut sweep = 0;

    while !pending.is_empty() {
        sweep += 1;
        let before = pending.len();
        let mut unresolved = Vec::new();
        for def in pending {
            let folded = {
                let layered = Layered { base: symbols, top: &defined };
                let mut compiler = Compiler::new(tokens, &layered, config.clone());
                compiler.cursor().reset(def.expr);
                let folded = compiler.resolve_constant()?;
                if folded.is_some() {
                    compiler.expect_end()?;
                }
                folded
            };
            match folded {
                Some(constant) => {
                    let symbol = if constant.float {
                        Symbol::ConFloat(constant.value)
                    } else {
                        Symbol::ConInt(constant.value)
                    };
                    defined.insert(&def.name, symbol);
                    definitions.push((def.name, symbol));
                }
                None => unresolved.push(def),
            }
        }
        debug!(sweep, resolved = before - unresolved.len(), left = unresolved.len(), "con sweep");
        if unresolved.len() == before {
            return Err(unresolved_error(tokens, symbols, &defined, config, &unresolved));
        }
        pending = unresolved;
    }

    Ok(ConBlock { definitions, body_start })
}

/// Leading `NAME = ...` lines. Stops at the first line of any other shape.
fn collect_definitions(tokens: &[Token], symbols: &dyn SymbolLookup) -> Result<(Vec<Definition>, Position)> {
    let mut defs: Vec<Definition> = Vec::new();
    let mut pos = 0;
    loop {
        while tokens.get(pos).is_some_and(|t| t.kind == TokenKind::End) {
            pos += 1;
        }
        let (Some(head), Some(next)) = (tokens.get(pos), tokens.get(pos + 1)) else { break };
        let TokenKind::Ident(name) = &head.kind else { break };
        if next.kind != TokenKind::Equal {
            break;
        }
        let upper = name.to_ascii_uppercase();
        if symbols.lookup(name).is_some() || defs.iter().any(|d| d.name.to_ascii_uppercase() == upper) {
            return Err(CompileError::syntax(
                "SPN-S012",
                head.span,
                format!("Symbol '{name}' is already defined"),
            ));
        }
        defs.push(Definition { name: name.clone(), span: head.span, expr: pos + 2 });
        pos += 2;
        while tokens.get(pos).is_some_and(|t| !t.is_line_end()) {
            pos += 1;
        }
    }
    Ok((defs, pos))
}

/// Explain why no pending definition folds: an identifier defined nowhere, then a
/// definition that leans on a runtime variable, and failing both a circular chain.
fn unresolved_error(
    tokens: &[Token],
    symbols: &dyn SymbolLookup,
    defined: &SymbolTable,
    config: &CompilerConfig,
    pending: &[Definition],
) -> CompileError {
    let layered = Layered { base: symbols, top: defined };
    let mut compiler = Compiler::new(tokens, &layered, config.clone());
    let is_pending = |name: &str| pending.iter().any(|d| d.name.eq_ignore_ascii_case(name));

    let mut references = Vec::with_capacity(pending.len());
    for def in pending {
        let cursor = compiler.cursor();
        cursor.reset(def.expr);
        let mut first_pending = None;
        loop {
            let token = cursor.advance();
            match token.kind {
                TokenKind::Ident(name) if !is_pending(&name) => return undefined_symbol(&name, token.span),
                TokenKind::Ident(name) => {
                    first_pending.get_or_insert(name);
                }
                TokenKind::End | TokenKind::EndFile => break,
                _ => {}
            }
        }
        references.push(first_pending);
    }

    if let Some(def) = pending.iter().zip(&references).find_map(|(d, r)| r.is_none().then_some(d)) {
        return CompileError::syntax(
            "SPN-S015",
            def.span,
            format!("Constant '{}' does not reduce to a compile-time value", def.name),
        );
    }
    let (def, through) = (&pending[0], references[0].as_deref().unwrap_or_default());
    CompileError::syntax(
        "SPN-S017",
        def.span,
        format!("Constant '{}' depends on itself through '{through}'", def.name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ErrorKind;
    use crate::lexer::lex;

    fn resolve(source: &str, symbols: &SymbolTable) -> Result<ConBlock> {
        let tokens = lex(source).unwrap();
        resolve_con_block(&tokens, symbols, &CompilerConfig::default())
    }

    #[test]
    fn definitions_resolve_in_any_order() {
        let block = resolve("A = B * 2\nB = C + 1\nC = 4\n", &SymbolTable::new()).unwrap();
        assert_eq!(
            block.definitions,
            vec![
                ("C".to_string(), Symbol::ConInt(4)),
                ("B".to_string(), Symbol::ConInt(5)),
                ("A".to_string(), Symbol::ConInt(10)),
            ]
        );
    }

    #[test]
    fn float_definitions_keep_their_mode() {
        let block = resolve("HALF = 0.5\nTWO = HALF *. 4.0\n", &SymbolTable::new()).unwrap();
        assert_eq!(block.definitions[1], ("TWO".to_string(), Symbol::ConFloat(2.0f32.to_bits())));
    }

    #[test]
    fn body_starts_after_the_definitions() {
        let source = "N = 3\nx := N\n";
        let tokens = lex(source).unwrap();
        let block = resolve_con_block(&tokens, &SymbolTable::new(), &CompilerConfig::default()).unwrap();
        assert_eq!(tokens[block.body_start].kind, TokenKind::Ident("x".into()));
    }

    #[test]
    fn outer_symbols_are_visible() {
        let mut table = SymbolTable::new();
        table.insert("BASE", Symbol::ConInt(100));
        let block = resolve("TOP = BASE + 28\n", &table).unwrap();
        assert_eq!(block.definitions, vec![("TOP".to_string(), Symbol::ConInt(128))]);
    }

    #[test]
    fn redefinition_is_rejected() {
        let err = resolve("A = 1\na = 2\n", &SymbolTable::new()).unwrap_err();
        assert_eq!((err.kind, err.code), (ErrorKind::Syntax, "SPN-S012"));
    }

    #[test]
    fn missing_symbol_outranks_a_cycle() {
        let err = resolve("A = B\nB = A + MISSING\n", &SymbolTable::new()).unwrap_err();
        assert_eq!(err.code, "SPN-S003");
        assert_eq!(err.message, "Undefined symbol 'MISSING'");
    }

    #[test]
    fn circular_definitions_are_reported_as_such() {
        let err = resolve("A = B + 1\nB = A * 2\nC = 3\n", &SymbolTable::new()).unwrap_err();
        assert_eq!((err.kind, err.code), (ErrorKind::Syntax, "SPN-S017"));
        assert_eq!(err.message, "Constant 'A' depends on itself through 'B'");
        assert_eq!(err.span.start, 0);
    }

    #[test]
    fn runtime_dependency_outranks_a_cycle() {
        let mut table = SymbolTable::new();
        table.insert("x", Symbol::Local(0));
        let err = resolve("B = A\nA = x\n", &table).unwrap_err();
        assert_eq!(err.code, "SPN-S015");
        assert!(err.message.contains("'A'"));
    }

    #[test]
    fn runtime_values_are_not_constants() {
        let mut table = SymbolTable::new();
        table.insert("x", Symbol::Local(0));
        let err = resolve("A = x + 1\n", &table).unwrap_err();
        assert_eq!(err.code, "SPN-S015");
    }

    #[test]
    fn trailing_tokens_after_the_value() {
        let err = resolve("A = 1 2\n", &SymbolTable::new()).unwrap_err();
        assert_eq!(err.code, "SPN-S004");
    }
}
