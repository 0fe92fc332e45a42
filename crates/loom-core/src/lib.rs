//! Load-time aspect weaving for PHP source units.
//!
//! The core pipeline takes one unit from source text to woven text:
//!
//! 1. register [`Aspect`]s with an [`AspectRegistry`]; advisors are
//!    materialised lazily by the first weaving pass that needs them;
//! 2. [`Weaver::weave`] parses the unit, matches every registered
//!    advisor's [`Pointcut`] against its declarations, and abstains with
//!    byte-identical output when nothing matches;
//! 3. matched declarations are renamed in place and a generated proxy
//!    takes over the original name, threading intercepted members through
//!    their advisor chains.
//!
//! Weaving is deterministic: repeated runs over identical input and
//! registrations produce identical output, because advisor identifiers and
//! their order are fixed before any code is generated.

mod advice;
mod aspect;
mod error;
mod matcher;
mod patcher;
mod pointcut;
mod proxy;
mod weaver;

pub use advice::{AdvicePhase, AdviceSet, JoinPointKind, MatchedAdvisor};
pub use aspect::{
    ASPECT_MARKER_INTERFACE, AdvisorSpec, Aspect, AspectError, AspectRegistry, RegisteredAdvisor,
};
pub use error::WeaveError;
pub use matcher::AdviceMatcher;
pub use patcher::{RenameOutcome, rename_declaration, strip_member_final};
pub use pointcut::{NamePattern, Pointcut, PointcutParseError};
pub use proxy::{PROXIED_SUFFIX, ProxyArtifact, class_proxy, function_proxy};
pub use weaver::{Weaver, WovenUnit};
