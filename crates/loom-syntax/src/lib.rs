//! PHP unit parsing for the Loom load-time weaver.
//!
//! This crate is the weaver's parser boundary. It turns one raw source unit
//! into the two artefacts the weaving core consumes:
//!
//! - a typed declaration tree ([`SourceUnit`]) exposing namespaces,
//!   classes, traits, functions, and methods with their modifiers; and
//! - an index-stable [`TokenStream`] whose concatenation reproduces the
//!   input byte-for-byte and whose edit primitives never renumber existing
//!   token indices.
//!
//! # Example
//!
//! ```ignore
//! use loom_syntax::Parser;
//!
//! let mut parser = Parser::new()?;
//! let parsed = parser.parse("<?php final class Greeter {}")?;
//! let unit = parsed.declarations()?;
//! let mut stream = parsed.token_stream()?;
//!
//! for ns in unit.namespaces() {
//!     for class in &ns.classes {
//!         // class.span addresses tokens in `stream`
//!         let _ = stream.token(class.span.start);
//!     }
//! }
//! # Ok::<(), loom_syntax::SyntaxError>(())
//! ```

mod error;
mod parser;
mod tokens;
mod unit;

pub use error::SyntaxError;
pub use parser::{ParseResult, Parser, SyntaxErrorInfo};
pub use tokens::{Token, TokenKind, TokenStream};
pub use unit::{
    ClassDecl, ClassKind, FunctionDecl, MethodDecl, NamespaceDecl, SourceUnit, TokenSpan, UseAlias,
    Visibility, resolve_type_name,
};
