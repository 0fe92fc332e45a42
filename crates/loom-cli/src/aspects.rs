//! Aspect manifests declared in configuration.
//!
//! A manifest is the declarative form of an aspect: a name plus a list of
//! advisor entries. Manifests register like any other aspect and
//! materialise lazily, so a malformed pointcut only surfaces when the
//! first unit weaves.

use serde::Deserialize;

use loom_core::{AdvicePhase, AdvisorSpec, Aspect, AspectError, AspectRegistry};

const fn default_priority() -> i32 {
    0
}

/// One advisor entry of an aspect manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdvisorManifest {
    /// The pointcut expression, parsed at materialisation time.
    pub pointcut: String,
    /// The advice phase.
    pub phase: AdvicePhase,
    /// Ordering priority; lower runs earlier. Defaults to 0.
    #[serde(default = "default_priority")]
    pub priority: i32,
}

/// A declaratively configured aspect.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AspectManifest {
    /// The aspect's identity, used in advisor identifiers.
    pub name: String,
    /// The advisors this aspect contributes.
    pub advisors: Vec<AdvisorManifest>,
}

impl Aspect for AspectManifest {
    fn name(&self) -> &str {
        &self.name
    }

    fn advisors(&self) -> Result<Vec<AdvisorSpec>, AspectError> {
        self.advisors
            .iter()
            .map(|advisor| {
                Ok(AdvisorSpec {
                    pointcut: advisor
                        .pointcut
                        .parse()
                        .map_err(|e| AspectError::new(&self.name, format!("{e}")))?,
                    phase: advisor.phase,
                    priority: advisor.priority,
                })
            })
            .collect()
    }
}

/// Builds a registry holding every configured manifest, still unloaded.
#[must_use]
pub fn build_registry(manifests: &[AspectManifest]) -> AspectRegistry {
    let mut registry = AspectRegistry::new();
    for manifest in manifests {
        registry.register(Box::new(manifest.clone()));
    }
    registry
}
