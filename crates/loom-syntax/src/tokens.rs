//! Index-stable token stream over a parsed unit.
//!
//! The stream is the sole mutable artefact of a weaving pass. Tokens are
//! sliced from the original source so that concatenating every token in
//! index order reproduces the input byte-for-byte. Edits rewrite the text
//! held in a slot; they never insert or remove slots, so position references
//! resolved from the original parse stay valid across multiple edits.

use crate::error::SyntaxError;

/// Grammar nodes that are captured as single tokens even when the grammar
/// nests a keyword leaf inside them.
const ATOMIC_KINDS: &[&str] = &[
    "name",
    "final_modifier",
    "abstract_modifier",
    "static_modifier",
    "visibility_modifier",
    "readonly_modifier",
    "var_modifier",
    "reference_modifier",
    "php_tag",
    "comment",
];

/// Classification of a token, as needed by the weaving edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier token (grammar kind `name`).
    Name,
    /// The `final` modifier keyword.
    Final,
    /// Whitespace synthesised from the gap between two grammar leaves.
    Whitespace,
    /// A comment.
    Comment,
    /// Any other lexical token, kept verbatim.
    Verbatim,
}

/// A single lexical token with its original byte position.
#[derive(Debug, Clone)]
pub struct Token {
    kind: TokenKind,
    text: String,
    start: usize,
}

impl Token {
    /// Returns the token classification.
    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Returns the current text held in this slot.
    ///
    /// Edits may have changed it from the original source text; a cleared
    /// slot holds the empty string.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the byte offset this token started at in the original source.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }
}

/// An ordered, index-addressable token sequence for one source unit.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Builds a token stream from a parsed tree and its source text.
    ///
    /// Grammar leaves become tokens; the gaps between adjacent leaves are
    /// synthesised as whitespace tokens so no byte of the input is lost.
    ///
    /// # Errors
    ///
    /// Returns an error if a leaf's byte range does not fall on UTF-8
    /// boundaries of the source, which would indicate a parser bug.
    pub fn from_tree(root: tree_sitter::Node<'_>, source: &str) -> Result<Self, SyntaxError> {
        let mut leaves = Vec::new();
        collect_leaves(root, &mut leaves);

        let mut tokens = Vec::with_capacity(leaves.len().saturating_mul(2));
        let mut cursor = 0usize;
        for (kind, range) in leaves {
            if range.start > cursor {
                tokens.push(Token {
                    kind: TokenKind::Whitespace,
                    text: slice(source, cursor, range.start)?,
                    start: cursor,
                });
            }
            tokens.push(Token {
                kind,
                text: slice(source, range.start, range.end)?,
                start: range.start,
            });
            cursor = range.end;
        }
        if cursor < source.len() {
            tokens.push(Token {
                kind: TokenKind::Whitespace,
                text: slice(source, cursor, source.len())?,
                start: cursor,
            });
        }

        Ok(Self { tokens })
    }

    /// Returns the number of token slots in the stream.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns whether the stream holds no tokens.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the token at the given index, if any.
    #[must_use]
    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Returns the index of the token that starts exactly at `byte`.
    ///
    /// Declaration nodes start at a leaf boundary, so their start offsets
    /// always resolve to a token index.
    #[must_use]
    pub fn index_at(&self, byte: usize) -> Option<usize> {
        self.tokens
            .binary_search_by(|token| token.start.cmp(&byte))
            .ok()
    }

    /// Returns the index of the last token that starts before `end_byte`.
    ///
    /// This resolves a declaration's exclusive end offset to the index of
    /// its final token.
    #[must_use]
    pub fn last_index_before(&self, end_byte: usize) -> Option<usize> {
        let idx = self.tokens.partition_point(|token| token.start < end_byte);
        idx.checked_sub(1)
    }

    /// Replaces the text held at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is outside the stream.
    pub fn replace(&mut self, index: usize, text: impl Into<String>) -> Result<(), SyntaxError> {
        let len = self.tokens.len();
        let token = self
            .tokens
            .get_mut(index)
            .ok_or(SyntaxError::TokenOutOfBounds { index, len })?;
        token.text = text.into();
        Ok(())
    }

    /// Clears the slot at `index` without renumbering later tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is outside the stream.
    pub fn clear(&mut self, index: usize) -> Result<(), SyntaxError> {
        self.replace(index, String::new())
    }

    /// Appends `text` onto the end of the slot at `index`.
    ///
    /// Inserted content lives inside an existing slot, so every previously
    /// resolved index stays valid.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is outside the stream.
    pub fn append(&mut self, index: usize, text: &str) -> Result<(), SyntaxError> {
        let len = self.tokens.len();
        let token = self
            .tokens
            .get_mut(index)
            .ok_or(SyntaxError::TokenOutOfBounds { index, len })?;
        token.text.push_str(text);
        Ok(())
    }

    /// Serialises the stream back into source text in index order.
    #[must_use]
    pub fn render(&self) -> String {
        let capacity = self.tokens.iter().map(|t| t.text.len()).sum();
        let mut out = String::with_capacity(capacity);
        for token in &self.tokens {
            out.push_str(&token.text);
        }
        out
    }
}

/// Walks the tree collecting leaf tokens in source order.
///
/// Modifier nodes are treated as atomic even when the grammar nests the
/// keyword as an anonymous child.
fn collect_leaves(node: tree_sitter::Node<'_>, out: &mut Vec<(TokenKind, std::ops::Range<usize>)>) {
    let kind = node.kind();
    if node.child_count() == 0 || ATOMIC_KINDS.contains(&kind) {
        let range = node.byte_range();
        // Missing nodes are zero-width; they contribute no text.
        if range.start < range.end {
            out.push((classify(kind), range));
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_leaves(child, out);
    }
}

fn classify(kind: &str) -> TokenKind {
    match kind {
        "name" => TokenKind::Name,
        "final_modifier" => TokenKind::Final,
        "comment" => TokenKind::Comment,
        _ => TokenKind::Verbatim,
    }
}

fn slice(source: &str, start: usize, end: usize) -> Result<String, SyntaxError> {
    source
        .get(start..end)
        .map(str::to_owned)
        .ok_or_else(|| SyntaxError::internal_error("token range is not on a UTF-8 boundary"))
}
