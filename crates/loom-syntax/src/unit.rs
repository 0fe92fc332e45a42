//! Typed declaration tree for one parsed source unit.
//!
//! The weaving core never consumes raw text; it consumes this tree. Each
//! declaration carries the token span resolved against the unit's
//! [`TokenStream`](crate::TokenStream) so textual edits can be addressed by
//! stable token indices.

use std::collections::BTreeSet;

use crate::error::SyntaxError;
use crate::tokens::TokenStream;

/// Inclusive token index range of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    /// Index of the declaration's first token.
    pub start: usize,
    /// Index of the declaration's last token.
    pub end: usize,
}

/// One `use` clause from a namespace's alias table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseAlias {
    /// The imported fully qualified name, without a leading backslash.
    pub fqn: String,
    /// The explicit alias, when the clause carries an `as` part.
    pub alias: Option<String>,
    /// The import kind prefix (`function` or `const`), when present.
    pub kind: Option<String>,
}

impl UseAlias {
    /// Returns the name this clause binds inside the namespace.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.alias
            .as_deref()
            .unwrap_or_else(|| last_segment(&self.fqn))
    }
}

/// Kind of a class-like declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// A `class` declaration.
    Class,
    /// A `trait` declaration.
    Trait,
    /// An `interface` declaration.
    Interface,
}

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// `public`, the default when no modifier is written.
    #[default]
    Public,
    /// `protected`.
    Protected,
    /// `private`.
    Private,
}

/// A parsed method declaration.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    /// The method name.
    pub name: String,
    /// Declared visibility.
    pub visibility: Visibility,
    /// Whether the method is `static`.
    pub is_static: bool,
    /// Whether the method is `final`.
    pub is_final: bool,
    /// Whether the method is `abstract`.
    pub is_abstract: bool,
    /// Whether the method returns by reference.
    pub by_ref: bool,
    /// Whether the declaration carries a body.
    pub has_body: bool,
    /// The formal parameter list text, parentheses included.
    pub params_text: String,
    /// The return type suffix as written, e.g. `: string`, or empty.
    pub return_suffix: String,
    /// Token span of the whole declaration.
    pub span: TokenSpan,
}

/// A parsed class, trait, or interface declaration.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    /// Declaration kind.
    pub kind: ClassKind,
    /// The short (unqualified) name.
    pub short_name: String,
    /// The enclosing namespace name, if any.
    pub namespace: Option<String>,
    /// Whether the declaration is `final`.
    pub is_final: bool,
    /// Whether the declaration is `abstract`.
    pub is_abstract: bool,
    /// Implemented interface names, fully qualified.
    pub interfaces: Vec<String>,
    /// Declared methods, in source order.
    pub methods: Vec<MethodDecl>,
    /// Token span of the whole declaration.
    pub span: TokenSpan,
}

impl ClassDecl {
    /// Returns the fully qualified name of this declaration.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}\\{}", self.short_name),
            None => self.short_name.clone(),
        }
    }

    /// Looks up an own method by name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// A free function declared in a namespace.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    /// The function's short name.
    pub name: String,
    /// Token span of the declaration.
    pub span: TokenSpan,
}

/// One namespace region of a source unit.
///
/// Units without a `namespace` statement produce a single region with no
/// name; units with several unbraced namespaces produce one region each.
#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    /// The namespace name, or `None` for the global namespace.
    pub name: Option<String>,
    /// Whether the namespace uses the braced form.
    pub braced: bool,
    /// The doc comment immediately preceding the namespace statement.
    pub doc_comment: Option<String>,
    /// The alias (`use`) table, in source order.
    pub aliases: Vec<UseAlias>,
    /// Class-like declarations in this region.
    pub classes: Vec<ClassDecl>,
    /// Free functions declared in this region.
    pub functions: Vec<FunctionDecl>,
    /// Unqualified function names invoked anywhere in this region.
    pub called_functions: BTreeSet<String>,
    /// Token span of the whole region.
    pub span: TokenSpan,
}

impl NamespaceDecl {
    /// Qualifies a short name with this namespace's name.
    #[must_use]
    pub fn qualify(&self, short: &str) -> String {
        match &self.name {
            Some(ns) => format!("{ns}\\{short}"),
            None => short.to_owned(),
        }
    }

    /// Returns whether a function with the given short name is declared in
    /// this region.
    #[must_use]
    pub fn declares_function(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name)
    }
}

/// The declaration tree of one parsed unit.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    namespaces: Vec<NamespaceDecl>,
}

impl SourceUnit {
    /// Builds the declaration tree from a parsed syntax tree.
    ///
    /// # Errors
    ///
    /// Returns an error if a declaration node is missing an expected child
    /// or a declaration's position cannot be resolved to a token index.
    pub fn from_tree(root: tree_sitter::Node<'_>, source: &str) -> Result<Self, SyntaxError> {
        // Token spans must agree with the stream the weaver will edit, so
        // resolve them against an identically constructed stream.
        let stream = TokenStream::from_tree(root, source)?;
        let builder = UnitBuilder {
            source,
            stream: &stream,
        };
        builder.build(root)
    }

    /// Returns the namespace regions of this unit, in source order.
    #[must_use]
    pub fn namespaces(&self) -> &[NamespaceDecl] {
        &self.namespaces
    }
}

struct UnitBuilder<'a> {
    source: &'a str,
    stream: &'a TokenStream,
}

impl UnitBuilder<'_> {
    fn build(&self, root: tree_sitter::Node<'_>) -> Result<SourceUnit, SyntaxError> {
        let children: Vec<tree_sitter::Node<'_>> = {
            let mut cursor = root.walk();
            root.children(&mut cursor).collect()
        };

        let ns_positions: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind() == "namespace_definition")
            .map(|(i, _)| i)
            .collect();

        let mut namespaces = Vec::new();
        if ns_positions.is_empty() {
            let span = self.full_span();
            namespaces.push(self.build_namespace(None, false, None, &children, span)?);
            return Ok(SourceUnit { namespaces });
        }

        for (seq, &pos) in ns_positions.iter().enumerate() {
            let Some(ns_node) = children.get(pos).copied() else {
                continue;
            };
            let name = ns_node
                .child_by_field_name("name")
                .map(|n| self.node_text(&n))
                .transpose()?;
            let doc = self.leading_doc_comment(&children, pos)?;

            if let Some(body) = braced_body(ns_node) {
                let body_children: Vec<tree_sitter::Node<'_>> = {
                    let mut cursor = body.walk();
                    body.children(&mut cursor).collect()
                };
                let span = self.span_for(ns_node.start_byte(), ns_node.end_byte())?;
                namespaces.push(self.build_namespace(name, true, doc, &body_children, span)?);
            } else {
                // An unbraced namespace extends to the next namespace
                // statement or to the end of the unit.
                let next_start = ns_positions
                    .get(seq.saturating_add(1))
                    .and_then(|&next| children.get(next))
                    .map_or(self.source.len(), tree_sitter::Node::start_byte);
                let region: Vec<tree_sitter::Node<'_>> = children
                    .get(pos.saturating_add(1)..)
                    .unwrap_or_default()
                    .iter()
                    .take_while(|n| n.start_byte() < next_start)
                    .copied()
                    .collect();
                let mut span = self.span_for(ns_node.start_byte(), next_start)?;
                if seq.saturating_add(1) == ns_positions.len() {
                    // The last region owns any trailing whitespace token.
                    span.end = self.stream.len().saturating_sub(1);
                }
                namespaces.push(self.build_namespace(name, false, doc, &region, span)?);
            }
        }

        Ok(SourceUnit { namespaces })
    }

    fn build_namespace(
        &self,
        name: Option<String>,
        braced: bool,
        doc_comment: Option<String>,
        nodes: &[tree_sitter::Node<'_>],
        span: TokenSpan,
    ) -> Result<NamespaceDecl, SyntaxError> {
        let mut aliases = Vec::new();
        for node in nodes {
            if node.kind() == "namespace_use_declaration" {
                self.collect_aliases(*node, &mut aliases)?;
            }
        }

        let mut classes = Vec::new();
        let mut functions = Vec::new();
        let mut called_functions = BTreeSet::new();
        for node in nodes {
            match node.kind() {
                "class_declaration" | "trait_declaration" | "interface_declaration" => {
                    classes.push(self.build_class(*node, name.as_deref(), &aliases)?);
                }
                "function_definition" => {
                    if let Some(name_node) = node.child_by_field_name("name") {
                        functions.push(FunctionDecl {
                            name: self.node_text(&name_node)?,
                            span: self.span_for(node.start_byte(), node.end_byte())?,
                        });
                    }
                }
                _ => {}
            }
            self.collect_call_sites(*node, &mut called_functions)?;
        }

        Ok(NamespaceDecl {
            name,
            braced,
            doc_comment,
            aliases,
            classes,
            functions,
            called_functions,
            span,
        })
    }

    fn collect_aliases(
        &self,
        node: tree_sitter::Node<'_>,
        out: &mut Vec<UseAlias>,
    ) -> Result<(), SyntaxError> {
        let mut kind = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "function" | "const" => kind = Some(child.kind().to_owned()),
                "namespace_use_clause" => {
                    let alias = match child.child_by_field_name("alias") {
                        Some(alias_node) => Some(self.node_text(&alias_node)?),
                        None => None,
                    };
                    // The imported name is the first name child; an alias
                    // is also a `name` node, so stop at the first match.
                    let mut fqn = None;
                    let mut inner = child.walk();
                    for part in child.children(&mut inner) {
                        if matches!(part.kind(), "name" | "qualified_name") {
                            let text = self.node_text(&part)?;
                            fqn = Some(text.trim_start_matches('\\').to_owned());
                            break;
                        }
                    }
                    if let Some(fqn) = fqn {
                        out.push(UseAlias {
                            fqn,
                            alias,
                            kind: kind.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn build_class(
        &self,
        node: tree_sitter::Node<'_>,
        namespace: Option<&str>,
        aliases: &[UseAlias],
    ) -> Result<ClassDecl, SyntaxError> {
        let kind = match node.kind() {
            "trait_declaration" => ClassKind::Trait,
            "interface_declaration" => ClassKind::Interface,
            _ => ClassKind::Class,
        };
        let name_node = node
            .child_by_field_name("name")
            .ok_or_else(|| SyntaxError::malformed("class declaration without a name"))?;
        let short_name = self.node_text(&name_node)?;

        let mut interfaces = Vec::new();
        let mut methods = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "class_interface_clause" => {
                    let mut inner = child.walk();
                    for part in child.children(&mut inner) {
                        if matches!(part.kind(), "name" | "qualified_name") {
                            let text = self.node_text(&part)?;
                            interfaces.push(resolve_type_name(&text, namespace, aliases));
                        }
                    }
                }
                "declaration_list" => {
                    let mut inner = child.walk();
                    for member in child.children(&mut inner) {
                        if member.kind() == "method_declaration" {
                            methods.push(self.build_method(member)?);
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(ClassDecl {
            kind,
            short_name,
            namespace: namespace.map(str::to_owned),
            is_final: has_child_kind(node, "final_modifier"),
            is_abstract: has_child_kind(node, "abstract_modifier"),
            interfaces,
            methods,
            span: self.span_for(node.start_byte(), node.end_byte())?,
        })
    }

    fn build_method(&self, node: tree_sitter::Node<'_>) -> Result<MethodDecl, SyntaxError> {
        let name_node = node
            .child_by_field_name("name")
            .ok_or_else(|| SyntaxError::malformed("method declaration without a name"))?;
        let params_node = node
            .child_by_field_name("parameters")
            .ok_or_else(|| SyntaxError::malformed("method declaration without parameters"))?;

        let mut visibility = Visibility::default();
        let mut body_start = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "visibility_modifier" => {
                    visibility = match self.node_text(&child)?.as_str() {
                        "protected" => Visibility::Protected,
                        "private" => Visibility::Private,
                        _ => Visibility::Public,
                    };
                }
                "compound_statement" => body_start = Some(child.start_byte()),
                _ => {}
            }
        }

        let header_end = body_start.unwrap_or(node.end_byte());
        let return_suffix = self
            .source
            .get(params_node.end_byte()..header_end)
            .unwrap_or_default()
            .trim()
            .trim_end_matches(';')
            .trim_end()
            .to_owned();

        Ok(MethodDecl {
            name: self.node_text(&name_node)?,
            visibility,
            is_static: has_child_kind(node, "static_modifier"),
            is_final: has_child_kind(node, "final_modifier"),
            is_abstract: has_child_kind(node, "abstract_modifier"),
            by_ref: has_child_kind(node, "reference_modifier"),
            has_body: body_start.is_some(),
            params_text: self.node_text(&params_node)?,
            return_suffix,
            span: self.span_for(node.start_byte(), node.end_byte())?,
        })
    }

    /// Collects unqualified function call names under `node`.
    fn collect_call_sites(
        &self,
        node: tree_sitter::Node<'_>,
        out: &mut BTreeSet<String>,
    ) -> Result<(), SyntaxError> {
        if node.kind() == "function_call_expression" {
            if let Some(callee) = node.child_by_field_name("function") {
                if callee.kind() == "name" {
                    out.insert(self.node_text(&callee)?);
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_call_sites(child, out)?;
        }
        Ok(())
    }

    fn leading_doc_comment(
        &self,
        children: &[tree_sitter::Node<'_>],
        pos: usize,
    ) -> Result<Option<String>, SyntaxError> {
        let Some(prev) = pos.checked_sub(1).and_then(|i| children.get(i)) else {
            return Ok(None);
        };
        if prev.kind() != "comment" {
            return Ok(None);
        }
        let text = self.node_text(prev)?;
        Ok(text.starts_with("/**").then_some(text))
    }

    fn node_text(&self, node: &tree_sitter::Node<'_>) -> Result<String, SyntaxError> {
        node.utf8_text(self.source.as_bytes())
            .map(str::to_owned)
            .map_err(|e| SyntaxError::internal_error(format!("node text: {e}")))
    }

    fn span_for(&self, start_byte: usize, end_byte: usize) -> Result<TokenSpan, SyntaxError> {
        let start = self.stream.index_at(start_byte).ok_or_else(|| {
            SyntaxError::internal_error(format!("no token starts at byte {start_byte}"))
        })?;
        let end = self.stream.last_index_before(end_byte).ok_or_else(|| {
            SyntaxError::internal_error(format!("no token ends before byte {end_byte}"))
        })?;
        Ok(TokenSpan { start, end })
    }

    fn full_span(&self) -> TokenSpan {
        TokenSpan {
            start: 0,
            end: self.stream.len().saturating_sub(1),
        }
    }
}

fn braced_body(node: tree_sitter::Node<'_>) -> Option<tree_sitter::Node<'_>> {
    node.child_by_field_name("body").or_else(|| {
        let mut cursor = node.walk();
        let found = node
            .children(&mut cursor)
            .find(|c| c.kind() == "compound_statement");
        found
    })
}

fn has_child_kind(node: tree_sitter::Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == kind)
}

fn last_segment(fqn: &str) -> &str {
    fqn.rsplit('\\').next().unwrap_or(fqn)
}

/// Resolves a type name as written to its fully qualified form using the
/// namespace context and alias table of the declaring region.
#[must_use]
pub fn resolve_type_name(text: &str, namespace: Option<&str>, aliases: &[UseAlias]) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix('\\') {
        return rest.to_owned();
    }

    let (first, rest) = match trimmed.split_once('\\') {
        Some((first, rest)) => (first, Some(rest)),
        None => (trimmed, None),
    };

    for alias in aliases {
        if alias.kind.is_some() {
            continue;
        }
        if alias.local_name() == first {
            return match rest {
                Some(rest) => format!("{}\\{rest}", alias.fqn),
                None => alias.fqn.clone(),
            };
        }
    }

    match namespace {
        Some(ns) => format!("{ns}\\{trimmed}"),
        None => trimmed.to_owned(),
    }
}
