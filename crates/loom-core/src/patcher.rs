//! Token-level edits applied to a woven declaration.
//!
//! All edits address tokens through the spans resolved at parse time, and
//! only ever rewrite slot contents. Rewriting the declaration keyword's
//! following name token, rather than every occurrence of the name, keeps
//! the rename exclusive: string literals, comments, and self-references in
//! bodies are untouched.

use loom_syntax::{SyntaxError, TokenKind, TokenSpan, TokenStream};

/// Outcome of renaming a class-like declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenameOutcome {
    /// Whether a `final` modifier was removed from the declaration header.
    pub was_final: bool,
}

/// Renames a class-like declaration in place and removes its `final`
/// modifier.
///
/// The declaration's own name is the first name token after the `class`
/// or `trait` keyword inside the span. A `final` modifier preceding the
/// keyword is cleared together with the whitespace slot that followed it,
/// so final-ness can be reasserted on the generated replacement without
/// ever producing two `final` markers for one name.
///
/// # Errors
///
/// Returns an error if the span holds no declaration keyword or no name
/// token follows it.
pub fn rename_declaration(
    stream: &mut TokenStream,
    span: TokenSpan,
    new_name: &str,
) -> Result<RenameOutcome, SyntaxError> {
    let keyword = (span.start..=span.end)
        .find(|&i| {
            stream.token(i).is_some_and(|t| {
                t.kind() == TokenKind::Verbatim && matches!(t.text(), "class" | "trait")
            })
        })
        .ok_or_else(|| SyntaxError::malformed("declaration span has no class or trait keyword"))?;

    let mut was_final = false;
    if let Some(final_idx) = (span.start..keyword)
        .find(|&i| stream.token(i).is_some_and(|t| t.kind() == TokenKind::Final))
    {
        clear_with_following_gap(stream, final_idx)?;
        was_final = true;
    }

    let name_idx = (keyword..=span.end)
        .find(|&i| stream.token(i).is_some_and(|t| t.kind() == TokenKind::Name))
        .ok_or_else(|| SyntaxError::malformed("declaration keyword has no following name"))?;
    stream.replace(name_idx, new_name)?;

    Ok(RenameOutcome { was_final })
}

/// Removes the `final` modifier from a method declaration span, if present.
///
/// Advised members of the renamed original must be overridable by the
/// generated replacement.
///
/// # Errors
///
/// Returns an error if the span addresses tokens outside the stream.
pub fn strip_member_final(
    stream: &mut TokenStream,
    span: TokenSpan,
) -> Result<bool, SyntaxError> {
    let Some(final_idx) = (span.start..=span.end)
        .find(|&i| stream.token(i).is_some_and(|t| t.kind() == TokenKind::Final))
    else {
        return Ok(false);
    };
    clear_with_following_gap(stream, final_idx)?;
    Ok(true)
}

/// Clears a slot and, when the next slot is whitespace, that gap as well,
/// so the removal leaves no doubled spacing behind.
fn clear_with_following_gap(stream: &mut TokenStream, index: usize) -> Result<(), SyntaxError> {
    stream.clear(index)?;
    let next = index.saturating_add(1);
    if stream
        .token(next)
        .is_some_and(|t| t.kind() == TokenKind::Whitespace)
    {
        stream.clear(next)?;
    }
    Ok(())
}
