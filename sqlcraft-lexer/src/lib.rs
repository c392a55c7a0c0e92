//! # sqlcraft-lexer
//!
//! The generic open/close token scanner (§4.4) and the `#{...}` placeholder
//! micro-grammar, shared by `${...}` substitution and `#{...}` parameter
//! parsing.

#![deny(missing_docs)]
#![deny(unused_imports)]

/// The `#{...}` placeholder micro-grammar.
pub mod placeholder;
/// The generic open/close token scanner.
pub mod token_parser;

pub use placeholder::PlaceholderSpec;
pub use token_parser::{GenericTokenParser, PARAMETER_TOKEN_PARSER, VARIABLE_TOKEN_PARSER};
