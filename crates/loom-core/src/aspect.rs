//! Aspect identity, lazy materialisation, and the process-wide registry.
//!
//! Aspects are registered at configuration time in the unloaded state. The
//! first weaving pass that needs the advisor list materialises every
//! pending aspect into concrete advisors, which are then owned by the
//! registry for the process lifetime. Materialisation is all-or-nothing
//! per aspect: a failing aspect contributes no advisors and stays
//! unloaded, while aspects loaded earlier remain usable.

use thiserror::Error;

use crate::advice::AdvicePhase;
use crate::pointcut::Pointcut;

/// The marker interface implemented by aspect classes on the woven side.
///
/// Declarations implementing it are never woven, so aspects cannot weave
/// themselves.
pub const ASPECT_MARKER_INTERFACE: &str = "Loom\\Aspect";

/// One (pointcut, advice phase, priority) triple contributed by an aspect.
#[derive(Debug, Clone)]
pub struct AdvisorSpec {
    /// The predicate selecting join points.
    pub pointcut: Pointcut,
    /// The advice phase to run at matched join points.
    pub phase: AdvicePhase,
    /// Ordering priority; lower runs earlier.
    pub priority: i32,
}

/// Error raised when materialising an aspect into advisors fails.
#[derive(Debug, Error, Clone)]
#[error("failed to materialise aspect '{aspect}': {message}")]
pub struct AspectError {
    /// The aspect that failed to load.
    pub aspect: String,
    /// Description of the failure.
    pub message: String,
}

impl AspectError {
    /// Creates a materialisation error for the named aspect.
    #[must_use]
    pub fn new(aspect: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            aspect: aspect.into(),
            message: message.into(),
        }
    }
}

/// A user-supplied bundle of pointcut and advice declarations.
pub trait Aspect {
    /// Returns the aspect's identity.
    fn name(&self) -> &str;

    /// Materialises this aspect into concrete advisor specifications.
    ///
    /// Called at most once per registry; the result is cached for the
    /// process lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error when the aspect's declarations cannot be compiled
    /// into advisors. The failure is fatal for the unit that triggered the
    /// lazy load.
    fn advisors(&self) -> Result<Vec<AdvisorSpec>, AspectError>;
}

/// A materialised advisor owned by the registry.
///
/// Immutable once created; looked up by the `advisor` tag during matching.
#[derive(Debug, Clone)]
pub struct RegisteredAdvisor {
    id: String,
    pointcut: Pointcut,
    phase: AdvicePhase,
    priority: i32,
    order: usize,
}

impl RegisteredAdvisor {
    /// Returns the advisor's stable identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the advisor's pointcut predicate.
    #[must_use]
    pub const fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }

    /// Returns the advice phase.
    #[must_use]
    pub const fn phase(&self) -> AdvicePhase {
        self.phase
    }

    /// Returns the ordering priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the registration order, the priority tie-breaker.
    #[must_use]
    pub const fn order(&self) -> usize {
        self.order
    }
}

struct AspectEntry {
    aspect: Box<dyn Aspect>,
    loaded: bool,
}

/// The process-wide aspect and advisor registry.
///
/// Shared-read, exclusive-write: materialisation must complete before any
/// matcher read proceeds, which a `&mut` borrow enforces structurally in a
/// single-threaded host.
pub struct AspectRegistry {
    aspects: Vec<AspectEntry>,
    advisors: Vec<RegisteredAdvisor>,
    marker_interface: String,
}

impl AspectRegistry {
    /// Creates an empty registry with the default aspect marker interface.
    #[must_use]
    pub fn new() -> Self {
        Self::with_marker_interface(ASPECT_MARKER_INTERFACE)
    }

    /// Creates an empty registry with a custom aspect marker interface.
    #[must_use]
    pub fn with_marker_interface(marker: impl Into<String>) -> Self {
        Self {
            aspects: Vec::new(),
            advisors: Vec::new(),
            marker_interface: marker.into(),
        }
    }

    /// Registers an aspect in the unloaded state.
    pub fn register(&mut self, aspect: Box<dyn Aspect>) {
        self.aspects.push(AspectEntry {
            aspect,
            loaded: false,
        });
    }

    /// Returns whether any registered aspect has not been materialised.
    #[must_use]
    pub fn has_unloaded(&self) -> bool {
        self.aspects.iter().any(|entry| !entry.loaded)
    }

    /// Returns whether the named aspect has been materialised.
    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.aspects
            .iter()
            .any(|entry| entry.loaded && entry.aspect.name() == name)
    }

    /// Materialises every unloaded aspect into registered advisors.
    ///
    /// Returns the number of aspects loaded by this call.
    ///
    /// # Errors
    ///
    /// Returns the first materialisation failure. The failing aspect stays
    /// unloaded and contributes no advisors; aspects loaded before the
    /// failure remain registered.
    pub fn materialize(&mut self) -> Result<usize, AspectError> {
        let mut loaded = 0usize;
        for entry in &mut self.aspects {
            if entry.loaded {
                continue;
            }
            let specs = entry.aspect.advisors()?;
            let name = entry.aspect.name().to_owned();
            for (index, spec) in specs.into_iter().enumerate() {
                let order = self.advisors.len();
                self.advisors.push(RegisteredAdvisor {
                    id: format!("advisor.{name}->{index}"),
                    pointcut: spec.pointcut,
                    phase: spec.phase,
                    priority: spec.priority,
                    order,
                });
            }
            entry.loaded = true;
            loaded = loaded.saturating_add(1);
        }
        Ok(loaded)
    }

    /// Returns the materialised advisors in registration order.
    #[must_use]
    pub fn advisors(&self) -> &[RegisteredAdvisor] {
        &self.advisors
    }

    /// Returns the aspect marker interface name declarations are checked
    /// against.
    #[must_use]
    pub fn marker_interface(&self) -> &str {
        &self.marker_interface
    }
}

impl Default for AspectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AspectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectRegistry")
            .field("aspects", &self.aspects.len())
            .field("advisors", &self.advisors.len())
            .finish_non_exhaustive()
    }
}
