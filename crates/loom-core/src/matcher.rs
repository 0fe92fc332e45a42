//! Matches registered advisors against parsed declarations.
//!
//! The matcher computes the applicable advice set for one declaration at a
//! time, partitioned by join point kind and member name. An empty result
//! means the declaration abstains, which lets the weaver take the
//! whole-file abstain fast path.

use std::collections::BTreeSet;

use crate::advice::{AdviceSet, JoinPointKind, MatchedAdvisor};
use crate::aspect::RegisteredAdvisor;
use crate::pointcut::Pointcut;
use loom_syntax::{ClassDecl, ClassKind, MethodDecl, NamespaceDecl, Visibility};

/// Computes applicable advice per declaration.
#[derive(Debug, Clone)]
pub struct AdviceMatcher {
    marker_interface: String,
}

impl AdviceMatcher {
    /// Creates a matcher that skips declarations implementing the given
    /// aspect marker interface.
    #[must_use]
    pub fn new(marker_interface: impl Into<String>) -> Self {
        Self {
            marker_interface: marker_interface.into(),
        }
    }

    /// Returns whether a declaration is eligible for weaving at all.
    ///
    /// Interfaces and aspects are never woven.
    #[must_use]
    pub fn is_weavable(&self, class: &ClassDecl) -> bool {
        class.kind != ClassKind::Interface
            && !class
                .interfaces
                .iter()
                .any(|name| name == &self.marker_interface)
    }

    /// Computes the advice set for a class or trait declaration.
    ///
    /// The returned set is flattened and sorted, so its advisor sequences
    /// are in final invocation order.
    #[must_use]
    pub fn advices_for_class(
        &self,
        class: &ClassDecl,
        advisors: &[RegisteredAdvisor],
    ) -> AdviceSet {
        let mut set = AdviceSet::new();
        if !self.is_weavable(class) {
            return set;
        }

        let qualified = class.qualified_name();
        for advisor in advisors {
            match advisor.pointcut() {
                Pointcut::MethodExecution {
                    class: class_pattern,
                    method,
                    visibility,
                } => {
                    if !class_pattern.matches(&qualified) {
                        continue;
                    }
                    for member in &class.methods {
                        if member.is_static || !is_interceptable(member, *visibility) {
                            continue;
                        }
                        if method.matches(&member.name) {
                            set.add(JoinPointKind::Method, &member.name, matched(advisor));
                        }
                    }
                }
                Pointcut::StaticExecution {
                    class: class_pattern,
                    method,
                    visibility,
                } => {
                    if !class_pattern.matches(&qualified) {
                        continue;
                    }
                    for member in &class.methods {
                        if !member.is_static || !is_interceptable(member, *visibility) {
                            continue;
                        }
                        if method.matches(&member.name) {
                            set.add(JoinPointKind::StaticMethod, &member.name, matched(advisor));
                        }
                    }
                }
                Pointcut::Initialization {
                    class: class_pattern,
                } => {
                    if class.kind == ClassKind::Class
                        && !class.is_abstract
                        && class_pattern.matches(&qualified)
                    {
                        set.add(JoinPointKind::Constructor, "__construct", matched(advisor));
                    }
                }
                Pointcut::FunctionExecution { .. } => {}
            }
        }

        set.flatten_and_sort();
        set
    }

    /// Computes the advice set for the free functions of a namespace.
    ///
    /// Functions cannot be intercepted via subclassing, so a distinct
    /// function-proxy join point is used: the candidates are the
    /// unqualified call sites of the namespace that do not resolve to a
    /// function declared in it (those resolve to the enclosing global
    /// scope, which a namespaced proxy function can shadow). The global
    /// namespace itself is never function-woven.
    #[must_use]
    pub fn advices_for_functions(
        &self,
        namespace: &NamespaceDecl,
        advisors: &[RegisteredAdvisor],
    ) -> AdviceSet {
        let mut set = AdviceSet::new();
        let Some(ns_name) = namespace.name.as_deref() else {
            return set;
        };

        let candidates: BTreeSet<&str> = namespace
            .called_functions
            .iter()
            .map(String::as_str)
            .filter(|name| !namespace.declares_function(name))
            .collect();
        if candidates.is_empty() {
            return set;
        }

        for advisor in advisors {
            let Pointcut::FunctionExecution {
                namespace: ns_pattern,
                function,
            } = advisor.pointcut()
            else {
                continue;
            };
            if !ns_pattern.matches(ns_name) {
                continue;
            }
            for candidate in &candidates {
                if function.matches(candidate) {
                    set.add(JoinPointKind::Function, candidate, matched(advisor));
                }
            }
        }

        set.flatten_and_sort();
        set
    }
}

/// Returns whether a member can be intercepted by an override in a
/// generated child.
fn is_interceptable(member: &MethodDecl, visibility: Option<Visibility>) -> bool {
    if member.is_abstract || !member.has_body {
        return false;
    }
    match visibility {
        Some(required) => member.visibility == required,
        // Private members cannot be overridden, so they never match.
        None => member.visibility != Visibility::Private,
    }
}

fn matched(advisor: &RegisteredAdvisor) -> MatchedAdvisor {
    MatchedAdvisor {
        id: advisor.id().to_owned(),
        phase: advisor.phase(),
        priority: advisor.priority(),
        order: advisor.order(),
    }
}
