// Copyright 2021. shaderpp contributors
// This source code is licensed under GPLv3 or any later version.
//! The core of a C-style preprocessor used as the front end of a
//! shader-bytecode tooling pipeline: a pull-driven tokenizer coupled to
//! an include stack, a conditional-compilation state machine, and a
//! caller-seeded macro table, plus a convenience entry point that
//! reformats the token stream into text with a diagnostic list.
//!
//! Function-like macro expansion, `#if`/`#elif` constant-expression
//! evaluation, in-source `#define`, `#pragma`, stringizing/token-pasting,
//! trigraph/digraph translation, and line-continuation are out of scope;
//! see [`preprocessor`] for what is handled.

pub mod conditional;
pub mod diagnostic;
pub mod frame;
pub mod include;
pub mod lexer;
pub mod macro_table;
pub mod preprocessor;
pub mod pretty;
pub mod token;

pub use diagnostic::{Diagnostic, Severity};
pub use frame::SourcePos;
pub use include::{FsIncludeResolver, IncludeKind, IncludeResolver};
pub use macro_table::Define;
pub use preprocessor::{Preprocessor, PulledToken, StartError};
pub use pretty::{preprocess, PreprocessResult};
pub use token::TokenKind;
