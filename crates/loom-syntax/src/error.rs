//! Error types for unit parsing and token stream manipulation.

use thiserror::Error;

/// Errors from parsing a source unit or editing its token stream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyntaxError {
    /// Failed to initialise the Tree-sitter parser with the PHP grammar.
    #[error("failed to initialise PHP parser: {message}")]
    ParserInitError {
        /// Description of the failure.
        message: String,
    },

    /// Failed to parse source code.
    #[error("failed to parse unit: {message}")]
    ParseError {
        /// Description of the failure.
        message: String,
    },

    /// A declaration node was malformed or missing an expected child.
    #[error("malformed declaration: {message}")]
    MalformedDeclaration {
        /// Description of the problem.
        message: String,
    },

    /// A token stream edit referenced an index outside the stream.
    #[error("token index {index} out of bounds (stream has {len} tokens)")]
    TokenOutOfBounds {
        /// The offending index.
        index: usize,
        /// Number of tokens in the stream.
        len: usize,
    },

    /// Internal error indicating a bug or system failure.
    #[error("internal error: {message}")]
    InternalError {
        /// Description of the internal error.
        message: String,
    },
}

impl SyntaxError {
    /// Creates a parser initialisation error.
    #[must_use]
    pub fn parser_init(message: impl Into<String>) -> Self {
        Self::ParserInitError {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Creates a malformed declaration error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDeclaration {
            message: message.into(),
        }
    }

    /// Creates an out-of-bounds token index error.
    #[must_use]
    pub const fn token_out_of_bounds(index: usize, len: usize) -> Self {
        Self::TokenOutOfBounds { index, len }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
