use std::collections::HashMap;

use serde::Deserialize;

use crate::token::TokenKind;

/// What an identifier stands for once the enclosing compiler has declared it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Symbol {
    ConInt(u32),
    /// IEEE-754 single bits.
    ConFloat(u32),
    /// Method-local long at a byte offset.
    Local(u32),
    /// Object variable long at a byte offset.
    Var(u32),
}

impl Symbol {
    pub fn token_kind(self) -> TokenKind {
        match self {
            Symbol::ConInt(_) => TokenKind::ConInt,
            Symbol::ConFloat(_) => TokenKind::ConFloat,
            Symbol::Local(_) => TokenKind::Local,
            Symbol::Var(_) => TokenKind::Var,
        }
    }

    pub fn value(self) -> u32 {
        match self {
            Symbol::ConInt(v) | Symbol::ConFloat(v) | Symbol::Local(v) | Symbol::Var(v) => v,
        }
    }
}

/// Read-only view of the caller's symbol storage.
pub trait SymbolLookup {
    fn lookup(&self, name: &str) -> Option<Symbol>;
}

/// Case-insensitive symbol table.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous meaning of `name`, if any.
    pub fn insert(&mut self, name: &str, symbol: Symbol) -> Option<Symbol> {
        self.entries.insert(name.to_ascii_uppercase(), symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a table from JSON of the form
    /// `{"constants": {"N": 5}, "floats": {"PI": 3.14}, "locals": {"x": 0}, "vars": {"y": 4}}`.
    /// Every section is optional.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let file: SymbolFile = serde_json::from_str(text)?;
        let mut table = SymbolTable::new();
        for (name, value) in file.constants {
            table.insert(&name, Symbol::ConInt(value as u32));
        }
        for (name, value) in file.floats {
            table.insert(&name, Symbol::ConFloat((value as f32).to_bits()));
        }
        for (name, offset) in file.locals {
            table.insert(&name, Symbol::Local(offset));
        }
        for (name, offset) in file.vars {
            table.insert(&name, Symbol::Var(offset));
        }
        Ok(table)
    }
}

impl SymbolLookup for SymbolTable {
    fn lookup(&self, name: &str) -> Option<Symbol> {
        self.entries.get(&name.to_ascii_uppercase()).copied()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SymbolFile {
    #[serde(default)]
    constants: HashMap<String, i64>,
    #[serde(default)]
    floats: HashMap<String, f64>,
    #[serde(default)]
    locals: HashMap<String, u32>,
    #[serde(default)]
    vars: HashMap<String, u32>,
}

/// A table layered over another; lookups fall through to `base`.
pub(crate) struct Layered<'a> {
    pub base: &'a dyn SymbolLookup,
    pub top: &'a SymbolTable,
}

impl SymbolLookup for Layered<'_> {
    fn lookup(&self, name: &str) -> Option<Symbol> {
        self.top.lookup(name).or_else(|| self.base.lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut table = SymbolTable::new();
        table.insert("Count", Symbol::Local(4));
        assert_eq!(table.lookup("COUNT"), Some(Symbol::Local(4)));
        assert_eq!(table.lookup("count"), Some(Symbol::Local(4)));
        assert_eq!(table.lookup("other"), None);
    }

    #[test]
    fn load_from_json() {
        let table = SymbolTable::from_json(
            r#"{"constants": {"N": -2}, "floats": {"half": 0.5}, "locals": {"i": 8}}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup("n"), Some(Symbol::ConInt(-2i32 as u32)));
        assert_eq!(table.lookup("HALF"), Some(Symbol::ConFloat(0.5f32.to_bits())));
        assert_eq!(table.lookup("I").map(Symbol::token_kind), Some(TokenKind::Local));
    }

    #[test]
    fn unknown_json_section_rejected() {
        assert!(SymbolTable::from_json(r#"{"globals": {}}"#).is_err());
    }

    #[test]
    fn layered_prefers_top() {
        let mut base = SymbolTable::new();
        base.insert("a", Symbol::ConInt(1));
        base.insert("b", Symbol::ConInt(2));
        let mut top = SymbolTable::new();
        top.insert("a", Symbol::ConInt(10));
        let layered = Layered { base: &base, top: &top };
        assert_eq!(layered.lookup("A"), Some(Symbol::ConInt(10)));
        assert_eq!(layered.lookup("b"), Some(Symbol::ConInt(2)));
    }
}
