//! The per-unit weaving pipeline.
//!
//! [`Weaver::weave`] takes one source unit from text to woven text:
//! materialise pending aspects, parse, match advice, and apply the token
//! edits. A unit with no matched advice abstains, and an abstaining unit's
//! output is the input string itself, never a re-render, so untouched
//! units are byte-identical by construction.

use tracing::debug;

use crate::advice::JoinPointKind;
use crate::aspect::AspectRegistry;
use crate::error::WeaveError;
use crate::matcher::AdviceMatcher;
use crate::patcher;
use crate::proxy::{self, PROXIED_SUFFIX};
use loom_syntax::{Parser, SyntaxError};

/// The result of weaving one source unit.
#[derive(Debug, Clone)]
pub struct WovenUnit {
    path: String,
    code: String,
    transformed: bool,
}

impl WovenUnit {
    /// Returns the path the unit was woven under.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the output source text.
    ///
    /// For an abstaining unit this is the input text, byte for byte.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Consumes the unit, returning the output source text.
    #[must_use]
    pub fn into_code(self) -> String {
        self.code
    }

    /// Returns whether any advice matched and edits were applied.
    #[must_use]
    pub const fn was_transformed(&self) -> bool {
        self.transformed
    }
}

/// Weaves source units against a registry of aspects.
pub struct Weaver {
    registry: AspectRegistry,
    matcher: AdviceMatcher,
    parser: Parser,
}

impl Weaver {
    /// Creates a weaver over the given registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying parser cannot be initialised.
    pub fn new(registry: AspectRegistry) -> Result<Self, SyntaxError> {
        let matcher = AdviceMatcher::new(registry.marker_interface());
        Ok(Self {
            registry,
            matcher,
            parser: Parser::new()?,
        })
    }

    /// Returns the aspect registry.
    #[must_use]
    pub const fn registry(&self) -> &AspectRegistry {
        &self.registry
    }

    /// Returns the aspect registry for registration.
    pub const fn registry_mut(&mut self) -> &mut AspectRegistry {
        &mut self.registry
    }

    /// Weaves one source unit.
    ///
    /// Pending aspects are materialised first, so the cost of loading an
    /// aspect is paid by the first unit that actually weaves, not at
    /// registration time.
    ///
    /// # Errors
    ///
    /// Returns an error when aspect materialisation fails, when the unit
    /// does not parse cleanly, or when a token edit cannot be applied.
    /// A failure aborts this unit only.
    pub fn weave(&mut self, path: &str, source: &str) -> Result<WovenUnit, WeaveError> {
        if self.registry.has_unloaded() {
            let loaded = self
                .registry
                .materialize()
                .map_err(|e| WeaveError::aspect(path, e))?;
            debug!(path, aspects = loaded, "materialised pending aspects");
        }

        if self.registry.advisors().is_empty() {
            debug!(path, "no advisors registered; unit passes through");
            return Ok(WovenUnit {
                path: path.to_owned(),
                code: source.to_owned(),
                transformed: false,
            });
        }

        let parsed = self
            .parser
            .parse(source)
            .map_err(|e| WeaveError::unit(path, e))?;
        if parsed.has_errors() {
            let message = parsed.errors().first().map_or_else(
                || "syntax error".to_owned(),
                |e| format!("{} at line {}, column {}", e.message, e.line, e.column),
            );
            return Err(WeaveError::parse(path, message));
        }
        let unit = parsed.declarations().map_err(|e| WeaveError::unit(path, e))?;

        let advisors = self.registry.advisors();
        let mut class_jobs = Vec::new();
        let mut function_jobs = Vec::new();
        for namespace in unit.namespaces() {
            for class in &namespace.classes {
                let advice = self.matcher.advices_for_class(class, advisors);
                if !advice.is_empty() {
                    class_jobs.push((class, advice));
                }
            }
            let advice = self.matcher.advices_for_functions(namespace, advisors);
            if !advice.is_empty() {
                function_jobs.push((namespace, advice));
            }
        }

        if class_jobs.is_empty() && function_jobs.is_empty() {
            debug!(path, "unit abstains from weaving");
            return Ok(WovenUnit {
                path: path.to_owned(),
                code: source.to_owned(),
                transformed: false,
            });
        }

        let mut stream = parsed
            .token_stream()
            .map_err(|e| WeaveError::unit(path, e))?;

        for (class, advice) in &class_jobs {
            let renamed = format!("{}{PROXIED_SUFFIX}", class.short_name);
            patcher::rename_declaration(&mut stream, class.span, &renamed)
                .map_err(|e| WeaveError::unit(path, e))?;

            // Advised members of the renamed original must stay
            // overridable by the generated replacement.
            for kind in [JoinPointKind::Method, JoinPointKind::StaticMethod] {
                for (member, _) in advice.members(kind) {
                    if let Some(method) = class.method(member).filter(|m| m.is_final) {
                        patcher::strip_member_final(&mut stream, method.span)
                            .map_err(|e| WeaveError::unit(path, e))?;
                    }
                }
            }

            let artifact = proxy::class_proxy(class, advice);
            stream
                .append(class.span.end, &format!("\n\n{}", artifact.code()))
                .map_err(|e| WeaveError::unit(path, e))?;
            debug!(path, class = %class.qualified_name(), "generated class proxy");
        }

        for (namespace, advice) in &function_jobs {
            let artifact = proxy::function_proxy(namespace, advice);
            stream
                .append(namespace.span.end, &format!("\n{}", artifact.code()))
                .map_err(|e| WeaveError::unit(path, e))?;
            debug!(
                path,
                namespace = namespace.name.as_deref().unwrap_or_default(),
                "generated function proxies"
            );
        }

        Ok(WovenUnit {
            path: path.to_owned(),
            code: stream.render(),
            transformed: true,
        })
    }
}

impl std::fmt::Debug for Weaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Weaver")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::AdvicePhase;
    use crate::aspect::{AdvisorSpec, Aspect, AspectError};

    struct FixedAspect {
        name: String,
        expressions: Vec<String>,
    }

    impl Aspect for FixedAspect {
        fn name(&self) -> &str {
            &self.name
        }

        fn advisors(&self) -> Result<Vec<AdvisorSpec>, AspectError> {
            self.expressions
                .iter()
                .map(|e| {
                    Ok(AdvisorSpec {
                        pointcut: e
                            .parse()
                            .map_err(|err| AspectError::new(&self.name, format!("{err}")))?,
                        phase: AdvicePhase::Around,
                        priority: 1,
                    })
                })
                .collect()
        }
    }

    fn weaver_with(expressions: &[&str]) -> Weaver {
        let mut registry = AspectRegistry::new();
        registry.register(Box::new(FixedAspect {
            name: "Logging".to_owned(),
            expressions: expressions.iter().map(|e| (*e).to_owned()).collect(),
        }));
        Weaver::new(registry).expect("weaver")
    }

    #[test]
    fn first_weave_materialises_pending_aspects() {
        let mut weaver = weaver_with(&["execution(Demo\\*->*)"]);
        assert!(weaver.registry().has_unloaded());

        weaver
            .weave("greeter.php", "<?php\nnamespace Demo;\nclass Greeter { public function hello() { return 1; } }\n")
            .expect("weave");

        assert!(!weaver.registry().has_unloaded());
        assert!(weaver.registry().is_loaded("Logging"));
    }

    #[test]
    fn abstaining_unit_is_returned_verbatim() {
        let mut weaver = weaver_with(&["execution(Other\\*->*)"]);
        let source = "<?php\nnamespace Demo;\n\n\nclass   Greeter { public function hello() { return 1; } }   \n\n";

        let woven = weaver.weave("greeter.php", source).expect("weave");
        assert!(!woven.was_transformed());
        assert_eq!(woven.code(), source);
    }

    #[test]
    fn empty_registry_passes_units_through() {
        let mut weaver = Weaver::new(AspectRegistry::new()).expect("weaver");
        // Not even parsed, so a syntactically broken unit passes through.
        let source = "<?php class Broken {";
        let woven = weaver.weave("broken.php", source).expect("weave");
        assert!(!woven.was_transformed());
        assert_eq!(woven.code(), source);
    }

    #[test]
    fn syntax_errors_abort_the_unit() {
        let mut weaver = weaver_with(&["execution(Demo\\*->*)"]);
        let result = weaver.weave("broken.php", "<?php class Broken {");
        assert!(matches!(result, Err(WeaveError::Parse { .. })));
    }

    #[test]
    fn broken_aspect_aborts_with_an_aspect_error() {
        let mut weaver = weaver_with(&["not a pointcut"]);
        let result = weaver.weave(
            "greeter.php",
            "<?php\nnamespace Demo;\nclass Greeter {}\n",
        );
        assert!(matches!(result, Err(WeaveError::Aspect { .. })));
    }

    #[test]
    fn matched_unit_is_transformed() {
        let mut weaver = weaver_with(&["execution(Demo\\*->*)"]);
        let woven = weaver
            .weave("greeter.php", "<?php\nnamespace Demo;\nclass Greeter { public function hello() { return 1; } }\n")
            .expect("weave");

        assert!(woven.was_transformed());
        assert!(woven.code().contains("Greeter__AopProxied"));
    }
}
