//! Expression and control-flow core of a Spin2 bytecode compiler.
//!
//! Tokens come from [`lexer::lex`], identifiers are resolved through a
//! [`symbols::SymbolLookup`], and [`compiler::Compiler`] folds constants, emits
//! bytecode and relaxes branches into an [`image::ObjectImage`].

pub mod bytecode;
pub mod compiler;
pub mod config;
pub mod cursor;
pub mod diagnostic;
pub mod image;
pub mod lexer;
pub mod ops;
pub mod symbols;
pub mod token;
pub mod varint;
