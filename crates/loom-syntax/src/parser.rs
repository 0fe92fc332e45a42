//! Tree-sitter parsing wrapper for PHP source units.
//!
//! Wraps the raw Tree-sitter parser and provides structured access to parse
//! results, syntax errors, and the two artefacts the weaving core consumes:
//! the declaration tree and the token stream.

use std::ops::Range;

use crate::error::SyntaxError;
use crate::tokens::TokenStream;
use crate::unit::SourceUnit;

/// Result of parsing one source unit.
///
/// Tree-sitter is error-tolerant, so a parse result may contain both a
/// valid tree and error nodes. Callers that need a well-formed unit should
/// check [`ParseResult::has_errors`] before building declarations.
#[derive(Debug)]
pub struct ParseResult {
    tree: tree_sitter::Tree,
    source: String,
}

impl ParseResult {
    /// Returns the parsed syntax tree.
    #[must_use]
    pub const fn tree(&self) -> &tree_sitter::Tree {
        &self.tree
    }

    /// Returns the source text that was parsed.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns whether the parse result contains any syntax errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        has_error_nodes(self.tree.root_node())
    }

    /// Collects all syntax errors found in the parse result.
    #[must_use]
    pub fn errors(&self) -> Vec<SyntaxErrorInfo> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &self.source, &mut errors);
        errors
    }

    /// Builds the declaration tree for this unit.
    ///
    /// # Errors
    ///
    /// Returns an error if a declaration node is missing an expected child,
    /// which indicates the unit did not parse cleanly.
    pub fn declarations(&self) -> Result<SourceUnit, SyntaxError> {
        SourceUnit::from_tree(self.tree.root_node(), &self.source)
    }

    /// Builds the editable token stream for this unit.
    ///
    /// # Errors
    ///
    /// Returns an error if a token range is not on a UTF-8 boundary.
    pub fn token_stream(&self) -> Result<TokenStream, SyntaxError> {
        TokenStream::from_tree(self.tree.root_node(), &self.source)
    }
}

/// Information about a syntax error found during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorInfo {
    /// Byte range of the error in the source.
    pub byte_range: Range<usize>,
    /// Line number (one-based) where the error starts.
    pub line: u32,
    /// Column number (one-based) where the error starts.
    pub column: u32,
    /// A snippet of the problematic source text.
    pub context: String,
    /// Human-readable description of the error.
    pub message: String,
}

impl SyntaxErrorInfo {
    fn from_node(node: tree_sitter::Node<'_>, source: &str) -> Self {
        let start = node.start_position();
        let byte_range = node.byte_range();

        let context = source
            .get(byte_range.clone())
            .map(|s| {
                if s.len() > 50 {
                    let truncated: String = s.chars().take(47).collect();
                    format!("{truncated}...")
                } else {
                    s.to_owned()
                }
            })
            .unwrap_or_default();

        let message = if node.is_missing() {
            format!("missing {}", node.kind())
        } else {
            "syntax error".to_owned()
        };

        Self {
            byte_range,
            line: u32::try_from(start.row).unwrap_or(u32::MAX).saturating_add(1),
            column: u32::try_from(start.column)
                .unwrap_or(u32::MAX)
                .saturating_add(1),
            context,
            message,
        }
    }
}

/// Tree-sitter parser wrapper configured with the PHP grammar.
pub struct Parser {
    inner: tree_sitter::Parser,
}

impl Parser {
    /// Creates a new PHP parser.
    ///
    /// # Errors
    ///
    /// Returns an error if the Tree-sitter parser cannot be initialised
    /// with the PHP grammar.
    pub fn new() -> Result<Self, SyntaxError> {
        let mut inner = tree_sitter::Parser::new();
        inner
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .map_err(|e| SyntaxError::parser_init(e.to_string()))?;

        Ok(Self { inner })
    }

    /// Parses one source unit and returns the result.
    ///
    /// Tree-sitter is error-tolerant, so this returns a parse result even
    /// when the source contains syntax errors. Use
    /// [`ParseResult::has_errors`] to check.
    ///
    /// # Errors
    ///
    /// Returns an error if the parser fails to produce a syntax tree. This
    /// is rare and typically indicates a parser configuration issue.
    pub fn parse(&mut self, source: &str) -> Result<ParseResult, SyntaxError> {
        let tree = self
            .inner
            .parse(source, None)
            .ok_or_else(|| SyntaxError::parse("parsing failed"))?;

        Ok(ParseResult {
            tree,
            source: source.to_owned(),
        })
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser").finish_non_exhaustive()
    }
}

/// Recursively checks if a node or any of its descendants is an ERROR node.
fn has_error_nodes(node: tree_sitter::Node<'_>) -> bool {
    if node.is_error() || node.is_missing() {
        return true;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if has_error_nodes(child) {
            return true;
        }
    }

    false
}

/// Recursively collects all ERROR nodes from a syntax tree.
fn collect_error_nodes(
    node: tree_sitter::Node<'_>,
    source: &str,
    errors: &mut Vec<SyntaxErrorInfo>,
) {
    if node.is_error() || node.is_missing() {
        errors.push(SyntaxErrorInfo::from_node(node, source));
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, source, errors);
    }
}
