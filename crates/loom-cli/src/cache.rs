//! Woven output cache, keyed by application-relative path.
//!
//! Each source unit maps to exactly one cache entry at
//! `<cache_dir>/<path relative to the application root>`. The loader on
//! the consuming side resolves the same relative path, so the mapping must
//! stay bijective.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Errors raised while writing cache entries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// The source path does not live under the application root.
    #[error("source '{path}' is outside the application root '{app_root}'")]
    OutsideRoot {
        /// The offending source path.
        path: Utf8PathBuf,
        /// The configured application root.
        app_root: Utf8PathBuf,
    },

    /// Weaving produced an empty unit.
    ///
    /// An empty cache entry would be served to the loader in place of the
    /// original source, so it is never written.
    #[error("refusing to cache an empty unit for '{path}'")]
    EmptyUnit {
        /// The source path whose output was empty.
        path: Utf8PathBuf,
    },

    /// Creating or writing the cache entry failed.
    #[error("failed to write cache entry '{path}': {source}")]
    Write {
        /// The cache entry path.
        path: Utf8PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Resolves the cache entry path for one source unit.
///
/// # Errors
///
/// Returns an error when the source path is not under the application
/// root.
pub fn target_path(
    cache_dir: &Utf8Path,
    app_root: &Utf8Path,
    source: &Utf8Path,
) -> Result<Utf8PathBuf, CacheError> {
    let relative = source
        .strip_prefix(app_root)
        .map_err(|_| CacheError::OutsideRoot {
            path: source.to_owned(),
            app_root: app_root.to_owned(),
        })?;
    Ok(cache_dir.join(relative))
}

/// Writes one woven unit into the cache, creating parent directories.
///
/// Returns the cache entry path written.
///
/// # Errors
///
/// Returns an error when the source path is outside the application root,
/// when the unit text is empty, or when the filesystem write fails.
pub fn write_unit(
    cache_dir: &Utf8Path,
    app_root: &Utf8Path,
    source: &Utf8Path,
    code: &str,
) -> Result<Utf8PathBuf, CacheError> {
    if code.is_empty() {
        return Err(CacheError::EmptyUnit {
            path: source.to_owned(),
        });
    }

    let target = target_path(cache_dir, app_root, source)?;
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|io| CacheError::Write {
            path: target.clone(),
            source: io,
        })?;
    }
    std::fs::write(&target, code).map_err(|io| CacheError::Write {
        path: target.clone(),
        source: io,
    })?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn utf8_root(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir")
    }

    #[test]
    fn entries_mirror_application_relative_paths() {
        let target = target_path(
            Utf8Path::new("/cache"),
            Utf8Path::new("/app"),
            Utf8Path::new("/app/src/Greeter.php"),
        )
        .expect("target");
        assert_eq!(target, "/cache/src/Greeter.php");
    }

    #[test]
    fn sources_outside_the_root_are_rejected() {
        let result = target_path(
            Utf8Path::new("/cache"),
            Utf8Path::new("/app"),
            Utf8Path::new("/elsewhere/Greeter.php"),
        );
        assert!(matches!(result, Err(CacheError::OutsideRoot { .. })));
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = TempDir::new().expect("tempdir");
        let root = utf8_root(&dir);
        let cache_dir = root.join("cache");
        let source = root.join("src/deep/Greeter.php");

        let written = write_unit(&cache_dir, &root, &source, "<?php class Greeter {}\n")
            .expect("write");
        assert_eq!(written, cache_dir.join("src/deep/Greeter.php"));
        let on_disk = std::fs::read_to_string(&written).expect("read back");
        assert_eq!(on_disk, "<?php class Greeter {}\n");
    }

    #[test]
    fn empty_units_are_never_written() {
        let dir = TempDir::new().expect("tempdir");
        let root = utf8_root(&dir);
        let cache_dir = root.join("cache");
        let source = root.join("src/Greeter.php");

        let result = write_unit(&cache_dir, &root, &source, "");
        assert!(matches!(result, Err(CacheError::EmptyUnit { .. })));
        assert!(!cache_dir.join("src/Greeter.php").as_std_path().exists());
    }
}
