//! Generates proxy source for declarations that carry matched advice.
//!
//! A woven class is split into two artefacts: the original declaration,
//! renamed with the reserved [`PROXIED_SUFFIX`], and a generated child that
//! takes over the original name and threads every intercepted member
//! through its advisor chain. The chains themselves are resolved at run
//! time by the `\Loom\Runtime` dispatcher; the generated code only fixes
//! their identifiers and order.

use crate::advice::{AdviceSet, JoinPointKind};
use loom_syntax::{ClassDecl, ClassKind, MethodDecl, NamespaceDecl, Visibility};

/// Reserved suffix appended to the renamed original declaration.
///
/// The suffix doubles as the textual marker an external bootstrap step
/// searches for to decide whether a compiled unit is a woven proxy, so it
/// must never collide with a user-defined type name.
pub const PROXIED_SUFFIX: &str = "__AopProxied";

/// Generated replacement source for one declaration.
///
/// Ephemeral: serialised into the token stream and never retained beyond
/// the weaving of its unit.
#[derive(Debug, Clone)]
pub struct ProxyArtifact {
    code: String,
}

impl ProxyArtifact {
    /// Returns the generated source text.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Consumes the artefact, returning the generated source text.
    #[must_use]
    pub fn into_code(self) -> String {
        self.code
    }
}

/// Generates the child proxy for a class or trait declaration.
///
/// The child extends (or, for traits, re-uses) the renamed original under
/// its fully qualified new name, re-declares every advised member as an
/// override that delegates to the member's advisor chain, and ends with an
/// injection call that fixes the sorted advisor identifiers in the
/// artefact text. Advised members that no longer exist on the declaration
/// (stale advisors) are skipped, not fatal.
#[must_use]
pub fn class_proxy(class: &ClassDecl, advice: &AdviceSet) -> ProxyArtifact {
    let short = class.short_name.as_str();
    let parent = format!("\\{}{PROXIED_SUFFIX}", class.qualified_name());

    let mut members = Vec::new();
    let mut join_points: Vec<(String, Vec<String>)> = Vec::new();
    let mut aliased_methods = Vec::new();

    if let Some(advisors) = advice.for_member(JoinPointKind::Constructor, "__construct") {
        let key = format!("init:{short}");
        members.push(constructor_override(class, &key));
        join_points.push((key, advisor_ids(advisors)));
    }

    for (name, advisors) in advice.members(JoinPointKind::Method) {
        let Some(method) = interceptable_method(class, name) else {
            continue;
        };
        let key = format!("method:{name}");
        members.push(method_override(method, &key, false));
        join_points.push((key, advisor_ids(advisors)));
        aliased_methods.push(name.to_owned());
    }

    for (name, advisors) in advice.members(JoinPointKind::StaticMethod) {
        let Some(method) = interceptable_method(class, name) else {
            continue;
        };
        let key = format!("static:{name}");
        members.push(method_override(method, &key, true));
        join_points.push((key, advisor_ids(advisors)));
        aliased_methods.push(name.to_owned());
    }

    let mut code = String::new();
    match class.kind {
        ClassKind::Trait => {
            code.push_str(&format!("trait {short}\n{{\n"));
            code.push_str(&trait_use_block(&parent, &aliased_methods));
        }
        _ => {
            // Final-ness moves from the renamed original onto the child,
            // preserving "cannot be further subclassed" for callers.
            let final_prefix = if class.is_final { "final " } else { "" };
            code.push_str(&format!("{final_prefix}class {short} extends {parent}\n{{\n"));
        }
    }

    code.push_str("    /**\n     * Advisor chains for each intercepted join point\n     */\n");
    code.push_str("    private static array $__joinPoints = [];\n");
    for member in &members {
        code.push('\n');
        code.push_str(member);
    }
    code.push_str("}\n");

    code.push_str(&injection_call(
        &format!("\\{}::class", class.qualified_name()),
        "injectJoinPoints",
        &join_points,
    ));

    ProxyArtifact { code }
}

/// Generates the function proxy block for one namespace.
///
/// The block re-opens the namespace (braced or unbraced, matching the
/// original region), re-emits the namespace's doc comment and its exact
/// alias table, and declares one shadowing function per advised name that
/// delegates to the advisor chain around the global original.
#[must_use]
pub fn function_proxy(namespace: &NamespaceDecl, advice: &AdviceSet) -> ProxyArtifact {
    let ns_name = namespace.name.clone().unwrap_or_default();

    let mut code = String::new();
    if let Some(doc) = &namespace.doc_comment {
        code.push_str(doc);
        code.push('\n');
    }
    if namespace.braced {
        code.push_str(&format!("namespace {ns_name} {{\n"));
    } else {
        code.push_str(&format!("namespace {ns_name};\n"));
    }

    for alias in &namespace.aliases {
        let kind = alias
            .kind
            .as_deref()
            .map(|k| format!("{k} "))
            .unwrap_or_default();
        match &alias.alias {
            Some(local) => code.push_str(&format!("use {kind}{} as {local};\n", alias.fqn)),
            None => code.push_str(&format!("use {kind}{};\n", alias.fqn)),
        }
    }

    let mut join_points = Vec::new();
    for (name, advisors) in advice.members(JoinPointKind::Function) {
        code.push('\n');
        code.push_str(&format!(
            "function {name}()\n{{\n    return \\Loom\\Runtime\\FunctionJoinPoint::of(__NAMESPACE__, '{name}')->__invoke(\\func_get_args());\n}}\n"
        ));
        join_points.push((format!("func:{name}"), advisor_ids(advisors)));
    }

    code.push_str(&injection_call(
        &format!("'{}'", escape_single_quoted(&ns_name)),
        "injectFunctionJoinPoints",
        &join_points,
    ));

    if namespace.braced {
        code.push_str("}\n");
    }

    ProxyArtifact { code }
}

/// Looks up an advised member, skipping names that no longer resolve to an
/// interceptable method (stale advisors).
fn interceptable_method<'a>(class: &'a ClassDecl, name: &str) -> Option<&'a MethodDecl> {
    class
        .method(name)
        .filter(|m| m.has_body && !m.is_abstract && m.name != "__construct")
}

fn constructor_override(class: &ClassDecl, key: &str) -> String {
    let original = class.method("__construct");
    let signature = original.map_or_else(
        || "public function __construct()".to_owned(),
        |ctor| {
            format!(
                "{} function __construct{}",
                visibility_text(ctor.visibility),
                ctor.params_text
            )
        },
    );

    let mut body = format!(
        "        self::$__joinPoints['{key}']->__invoke($this, \\func_get_args());\n"
    );
    if original.is_some() {
        body.push_str("        parent::__construct(...\\func_get_args());\n");
    }

    format!("    {signature}\n    {{\n{body}    }}\n")
}

fn method_override(method: &MethodDecl, key: &str, is_static: bool) -> String {
    let visibility = visibility_text(method.visibility);
    let static_text = if is_static { " static" } else { "" };
    let amp = if method.by_ref { "&" } else { "" };
    let subject = if is_static { "static::class" } else { "$this" };
    let return_keyword = if returns_value(&method.return_suffix) {
        "return "
    } else {
        ""
    };

    format!(
        "    {visibility}{static_text} function {amp}{name}{params}{ret}\n    {{\n        {return_keyword}self::$__joinPoints['{key}']->__invoke({subject}, \\func_get_args());\n    }}\n",
        name = method.name,
        params = method.params_text,
        ret = method.return_suffix,
    )
}

fn trait_use_block(parent: &str, aliased: &[String]) -> String {
    if aliased.is_empty() {
        return format!("    use {parent};\n\n");
    }
    let mut block = format!("    use {parent} {{\n");
    for name in aliased {
        block.push_str(&format!(
            "        {parent}::{name} as protected {name}{PROXIED_SUFFIX};\n"
        ));
    }
    block.push_str("    }\n\n");
    block
}

fn injection_call(subject: &str, method: &str, join_points: &[(String, Vec<String>)]) -> String {
    let mut call = format!("\n\\Loom\\Runtime\\JoinPointRegistry::{method}({subject}, array (\n");
    for (key, ids) in join_points {
        call.push_str(&format!("    '{}' => array (\n", escape_single_quoted(key)));
        for (index, id) in ids.iter().enumerate() {
            call.push_str(&format!(
                "        {index} => '{}',\n",
                escape_single_quoted(id)
            ));
        }
        call.push_str("    ),\n");
    }
    call.push_str("));\n");
    call
}

fn advisor_ids(advisors: &[crate::advice::MatchedAdvisor]) -> Vec<String> {
    advisors.iter().map(|a| a.id.clone()).collect()
}

const fn visibility_text(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Protected => "protected",
        // Private members are never matched; default to public.
        Visibility::Public | Visibility::Private => "public",
    }
}

/// Returns whether a return type suffix permits returning a value.
fn returns_value(return_suffix: &str) -> bool {
    let lowered = return_suffix.to_ascii_lowercase();
    !(lowered.ends_with("void") || lowered.ends_with("never"))
}

fn escape_single_quoted(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}
