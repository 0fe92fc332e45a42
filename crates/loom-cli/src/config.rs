//! Weaver configuration loaded from a JSON file.
//!
//! Paths in the file may be relative; they are resolved against the
//! application root before use. Include paths must resolve to locations
//! under the application root, because the cache layout mirrors
//! application-relative paths. Path containment is checked lexically, so
//! configurations should not rely on `..` segments or symlinks.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

use crate::aspects::AspectManifest;

/// Default tracing filter applied when the file sets none.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Read {
        /// The configuration file path.
        path: Utf8PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the expected shape.
    #[error("failed to parse configuration '{path}': {source}")]
    Parse {
        /// The configuration file path.
        path: Utf8PathBuf,
        /// The underlying deserialisation failure.
        #[source]
        source: serde_json::Error,
    },

    /// An include path escapes the application root.
    #[error("include path '{path}' is outside the application root '{app_root}'")]
    IncludeOutsideRoot {
        /// The offending include path, resolved.
        path: Utf8PathBuf,
        /// The configured application root.
        app_root: Utf8PathBuf,
    },
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    app_root: Utf8PathBuf,
    #[serde(default)]
    cache_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    include_paths: Vec<Utf8PathBuf>,
    #[serde(default)]
    exclude_paths: Vec<Utf8PathBuf>,
    #[serde(default = "default_log_filter")]
    log_filter: String,
    #[serde(default)]
    aspects: Vec<AspectManifest>,
}

/// Validated weaver configuration.
#[derive(Debug, Clone)]
pub struct Config {
    app_root: Utf8PathBuf,
    cache_dir: Option<Utf8PathBuf>,
    include_paths: Vec<Utf8PathBuf>,
    exclude_paths: Vec<Utf8PathBuf>,
    log_filter: String,
    aspects: Vec<AspectManifest>,
}

impl Config {
    /// Loads and validates configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, or when an
    /// include path is outside the application root.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let raw: RawConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let app_root = raw.app_root;
        let cache_dir = raw.cache_dir.map(|dir| resolve(&app_root, dir));

        let mut include_paths = Vec::with_capacity(raw.include_paths.len().max(1));
        if raw.include_paths.is_empty() {
            include_paths.push(app_root.clone());
        }
        for path in raw.include_paths {
            let resolved = resolve(&app_root, path);
            if !resolved.starts_with(&app_root) {
                return Err(ConfigError::IncludeOutsideRoot {
                    path: resolved,
                    app_root,
                });
            }
            include_paths.push(resolved);
        }

        let exclude_paths = raw
            .exclude_paths
            .into_iter()
            .map(|path| resolve(&app_root, path))
            .collect();

        Ok(Self {
            app_root,
            cache_dir,
            include_paths,
            exclude_paths,
            log_filter: raw.log_filter,
            aspects: raw.aspects,
        })
    }

    /// Returns the application root.
    #[must_use]
    pub fn app_root(&self) -> &Utf8Path {
        &self.app_root
    }

    /// Returns the cache directory woven units are written under.
    ///
    /// `None` selects memory-only mode: units are woven and reported but
    /// nothing is persisted.
    #[must_use]
    pub fn cache_dir(&self) -> Option<&Utf8Path> {
        self.cache_dir.as_deref()
    }

    /// Replaces the cache directory, resolving it against the root.
    pub fn set_cache_dir(&mut self, cache_dir: Utf8PathBuf) {
        self.cache_dir = Some(resolve(&self.app_root, cache_dir));
    }

    /// Returns the directories enumerated for source units.
    #[must_use]
    pub fn include_paths(&self) -> &[Utf8PathBuf] {
        &self.include_paths
    }

    /// Returns the path prefixes excluded from enumeration.
    #[must_use]
    pub fn exclude_paths(&self) -> &[Utf8PathBuf] {
        &self.exclude_paths
    }

    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the configured aspect manifests.
    #[must_use]
    pub fn aspects(&self) -> &[AspectManifest] {
        &self.aspects
    }
}

fn resolve(app_root: &Utf8Path, path: Utf8PathBuf) -> Utf8PathBuf {
    if path.is_absolute() {
        path
    } else {
        app_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_json(json: &str) -> Result<Config, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json).expect("raw config");
        Config::from_raw(raw)
    }

    #[test]
    fn relative_paths_resolve_against_the_app_root() {
        let config = load_json(
            r#"{
                "app_root": "/app",
                "cache_dir": "var/cache",
                "include_paths": ["src"],
                "exclude_paths": ["src/vendor"]
            }"#,
        )
        .expect("config");

        assert_eq!(config.cache_dir(), Some(Utf8Path::new("/app/var/cache")));
        assert_eq!(config.include_paths(), ["/app/src"]);
        assert_eq!(config.exclude_paths(), ["/app/src/vendor"]);
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn missing_include_paths_default_to_the_app_root() {
        let config = load_json(r#"{"app_root": "/app", "cache_dir": "/tmp/cache"}"#)
            .expect("config");
        assert_eq!(config.include_paths(), ["/app"]);
    }

    #[test]
    fn include_path_outside_the_root_is_fatal() {
        let result = load_json(
            r#"{
                "app_root": "/app",
                "cache_dir": "/tmp/cache",
                "include_paths": ["/elsewhere/src"]
            }"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::IncludeOutsideRoot { .. })
        ));
    }

    #[test]
    fn cache_dir_override_resolves_relatives() {
        let mut config = load_json(r#"{"app_root": "/app", "cache_dir": "/tmp/cache"}"#)
            .expect("config");
        config.set_cache_dir(Utf8PathBuf::from("woven"));
        assert_eq!(config.cache_dir(), Some(Utf8Path::new("/app/woven")));
    }

    #[test]
    fn omitted_cache_dir_selects_memory_only_mode() {
        let config = load_json(r#"{"app_root": "/app"}"#).expect("config");
        assert!(config.cache_dir().is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw: Result<RawConfig, _> = serde_json::from_str(
            r#"{"app_root": "/app", "cache_dir": "/c", "surprise": true}"#,
        );
        assert!(raw.is_err());
    }
}
