//! `stackc`: an ahead-of-time compiler for a small, statically typed,
//! C-like imperative language, emitting textual assembly for two
//! stack-based virtual machines — a CLR-style intermediate language (SIL)
//! and a JVM-style bytecode listing (JBC).
//!
//! The pipeline is leaves-first: [`types`] and [`ident`]/[`scope`] are the
//! static-semantics core, [`ast`] is the tree the front end produces,
//! [`checker`] resolves and decorates it, and [`codegen`] holds the two
//! backends sharing a label/fixup base. [`pipeline`] wires parse → check →
//! emit into one `compile()` call; `stackc-cli` is the thin binary on top.

pub mod ast;
pub mod checker;
pub mod codegen;
pub mod error;
pub mod ident;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod pos;
pub mod scope;
pub mod types;
