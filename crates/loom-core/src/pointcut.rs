//! Pointcut predicates and their textual expression grammar.
//!
//! A pointcut selects which declarations and members a piece of advice
//! applies to. The expression grammar is deliberately small:
//!
//! - `execution(Class->method)` — dynamic method execution
//! - `execution(Class::method)` — static method execution
//! - `initialization(Class)` — object construction
//! - `function(ns\name)` — a free function resolved from a namespace
//!
//! `execution` accepts an optional `public` or `protected` prefix. Name
//! positions accept `*` (matches within one namespace segment) and `**`
//! (matches across segments). A trailing `()` or `(*)` argument suffix is
//! tolerated and ignored.

use std::str::FromStr;

use thiserror::Error;

use loom_syntax::Visibility;

/// A wildcard name pattern.
///
/// `*` matches any run of characters except the namespace separator; `**`
/// also crosses separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    raw: String,
}

impl NamePattern {
    /// Creates a pattern from its textual form.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            raw: pattern.into(),
        }
    }

    /// Returns the textual form of this pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns whether the candidate name matches this pattern.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        wild_match(self.raw.as_bytes(), candidate.as_bytes())
    }
}

impl std::fmt::Display for NamePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn wild_match(pattern: &[u8], input: &[u8]) -> bool {
    let Some((&first, rest)) = pattern.split_first() else {
        return input.is_empty();
    };

    if first == b'*' {
        let (tail, crosses) = if rest.first() == Some(&b'*') {
            (rest.get(1..).unwrap_or_default(), true)
        } else {
            (rest, false)
        };
        let mut offset = 0usize;
        loop {
            if wild_match(tail, input.get(offset..).unwrap_or_default()) {
                return true;
            }
            match input.get(offset) {
                Some(&c) if crosses || c != b'\\' => offset = offset.saturating_add(1),
                _ => return false,
            }
        }
    }

    input.first() == Some(&first)
        && wild_match(
            rest,
            input.get(1..).unwrap_or_default(),
        )
}

/// A predicate selecting the declarations and members advice applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pointcut {
    /// Dynamic method execution on matching classes and traits.
    MethodExecution {
        /// Pattern over the declaring type's fully qualified name.
        class: NamePattern,
        /// Pattern over the member name.
        method: NamePattern,
        /// Restrict to one visibility; `None` matches public and protected.
        visibility: Option<Visibility>,
    },
    /// Static method execution on matching classes.
    StaticExecution {
        /// Pattern over the declaring type's fully qualified name.
        class: NamePattern,
        /// Pattern over the member name.
        method: NamePattern,
        /// Restrict to one visibility; `None` matches public and protected.
        visibility: Option<Visibility>,
    },
    /// Construction of matching classes.
    Initialization {
        /// Pattern over the class's fully qualified name.
        class: NamePattern,
    },
    /// Calls to a free function resolved from matching namespaces.
    FunctionExecution {
        /// Pattern over the calling namespace's name.
        namespace: NamePattern,
        /// Pattern over the function's short name.
        function: NamePattern,
    },
}

impl std::fmt::Display for Pointcut {
    /// Writes the canonical expression form, parseable back into the same
    /// pointcut.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let visibility_prefix = |v: &Option<Visibility>| match v {
            Some(Visibility::Public) => "public ",
            Some(Visibility::Protected) => "protected ",
            Some(Visibility::Private) | None => "",
        };
        match self {
            Self::MethodExecution {
                class,
                method,
                visibility,
            } => write!(
                f,
                "execution({}{class}->{method})",
                visibility_prefix(visibility)
            ),
            Self::StaticExecution {
                class,
                method,
                visibility,
            } => write!(
                f,
                "execution({}{class}::{method})",
                visibility_prefix(visibility)
            ),
            Self::Initialization { class } => write!(f, "initialization({class})"),
            Self::FunctionExecution {
                namespace,
                function,
            } => write!(f, "function({namespace}\\{function})"),
        }
    }
}

/// Error raised when a pointcut expression fails to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid pointcut expression '{expression}': {message}")]
pub struct PointcutParseError {
    /// The offending expression.
    pub expression: String,
    /// Description of the problem.
    pub message: String,
}

impl PointcutParseError {
    fn new(expression: &str, message: impl Into<String>) -> Self {
        Self {
            expression: expression.to_owned(),
            message: message.into(),
        }
    }
}

impl FromStr for Pointcut {
    type Err = PointcutParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let (designator, body) = split_designator(trimmed)
            .ok_or_else(|| PointcutParseError::new(input, "expected designator(...)"))?;

        match designator {
            "execution" => parse_execution(input, body),
            "initialization" => Ok(Self::Initialization {
                class: NamePattern::new(body.trim()),
            }),
            "function" => parse_function(input, body),
            other => Err(PointcutParseError::new(
                input,
                format!("unknown designator '{other}'"),
            )),
        }
    }
}

fn split_designator(input: &str) -> Option<(&str, &str)> {
    let open = input.find('(')?;
    let designator = input.get(..open)?.trim();
    let rest = input.get(open.saturating_add(1)..)?;
    let body = rest.strip_suffix(')')?;
    Some((designator, body))
}

fn parse_execution(expression: &str, body: &str) -> Result<Pointcut, PointcutParseError> {
    let mut target = body.trim();
    let mut visibility = None;
    if let Some(rest) = target.strip_prefix("public ") {
        visibility = Some(Visibility::Public);
        target = rest.trim_start();
    } else if let Some(rest) = target.strip_prefix("protected ") {
        visibility = Some(Visibility::Protected);
        target = rest.trim_start();
    }

    if let Some((class, method)) = target.split_once("->") {
        return Ok(Pointcut::MethodExecution {
            class: NamePattern::new(class.trim()),
            method: NamePattern::new(strip_arg_suffix(method)),
            visibility,
        });
    }
    if let Some((class, method)) = target.split_once("::") {
        return Ok(Pointcut::StaticExecution {
            class: NamePattern::new(class.trim()),
            method: NamePattern::new(strip_arg_suffix(method)),
            visibility,
        });
    }

    Err(PointcutParseError::new(
        expression,
        "expected 'Class->method' or 'Class::method'",
    ))
}

fn parse_function(expression: &str, body: &str) -> Result<Pointcut, PointcutParseError> {
    let target = strip_arg_suffix(body);
    let (namespace, function) = target.rsplit_once('\\').ok_or_else(|| {
        PointcutParseError::new(expression, "expected 'namespace\\function'")
    })?;

    Ok(Pointcut::FunctionExecution {
        namespace: NamePattern::new(namespace.trim()),
        function: NamePattern::new(function.trim()),
    })
}

/// Drops a tolerated trailing argument suffix such as `()` or `(*)`.
fn strip_arg_suffix(member: &str) -> &str {
    let trimmed = member.trim();
    trimmed
        .strip_suffix("(*)")
        .or_else(|| trimmed.strip_suffix("()"))
        .map_or(trimmed, str::trim_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Demo\\Greeter", "Demo\\Greeter", true)]
    #[case("Demo\\*", "Demo\\Greeter", true)]
    #[case("Demo\\*", "Demo\\Sub\\Greeter", false)]
    #[case("Demo\\**", "Demo\\Sub\\Greeter", true)]
    #[case("**", "Any\\Thing\\At\\All", true)]
    #[case("*", "NoSeparator", true)]
    #[case("*", "Has\\Separator", false)]
    #[case("do*", "doWork", true)]
    #[case("do*", "redo", false)]
    #[case("exact", "exact", true)]
    #[case("exact", "exactly", false)]
    fn name_pattern_matching(#[case] pattern: &str, #[case] candidate: &str, #[case] hit: bool) {
        assert_eq!(NamePattern::new(pattern).matches(candidate), hit);
    }

    #[test]
    fn parses_dynamic_execution() {
        let pointcut: Pointcut = "execution(Demo\\Greeter->hello)".parse().expect("parse");
        let Pointcut::MethodExecution {
            class,
            method,
            visibility,
        } = pointcut
        else {
            panic!("expected method execution");
        };
        assert_eq!(class.as_str(), "Demo\\Greeter");
        assert_eq!(method.as_str(), "hello");
        assert!(visibility.is_none());
    }

    #[test]
    fn parses_static_execution_with_visibility() {
        let pointcut: Pointcut = "execution(public Demo\\Greeter::create(*))"
            .parse()
            .expect("parse");
        let Pointcut::StaticExecution {
            class,
            method,
            visibility,
        } = pointcut
        else {
            panic!("expected static execution");
        };
        assert_eq!(class.as_str(), "Demo\\Greeter");
        assert_eq!(method.as_str(), "create");
        assert_eq!(visibility, Some(Visibility::Public));
    }

    #[test]
    fn parses_initialization() {
        let pointcut: Pointcut = "initialization(Demo\\**)".parse().expect("parse");
        assert!(matches!(pointcut, Pointcut::Initialization { .. }));
    }

    #[test]
    fn parses_function_pointcut() {
        let pointcut: Pointcut = "function(Demo\\*\\compute(*))".parse().expect("parse");
        let Pointcut::FunctionExecution {
            namespace,
            function,
        } = pointcut
        else {
            panic!("expected function execution");
        };
        assert_eq!(namespace.as_str(), "Demo\\*");
        assert_eq!(function.as_str(), "compute");
    }

    #[rstest]
    #[case("execution(Demo\\Greeter->hello)")]
    #[case("execution(public Demo\\Greeter::create)")]
    #[case("initialization(Demo\\**)")]
    #[case("function(Demo\\*\\compute)")]
    fn display_round_trips_through_parsing(#[case] expression: &str) {
        let pointcut: Pointcut = expression.parse().expect("parse");
        assert_eq!(pointcut.to_string(), expression);
        let reparsed: Pointcut = pointcut.to_string().parse().expect("reparse");
        assert_eq!(reparsed, pointcut);
    }

    #[rstest]
    #[case("execution(Demo\\Greeter)")]
    #[case("gibberish")]
    #[case("unknown(Demo)")]
    fn rejects_malformed_expressions(#[case] expression: &str) {
        let result: Result<Pointcut, _> = expression.parse();
        assert!(result.is_err());
    }
}
