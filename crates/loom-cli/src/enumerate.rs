//! Source unit enumeration under the configured include paths.

use camino::Utf8PathBuf;
use ignore::WalkBuilder;
use tracing::warn;

use crate::config::Config;

/// Enumerates the PHP source units selected by the configuration.
///
/// Walks every include path, keeps regular `.php` files, and drops paths
/// under an exclude prefix. The configured rules are the only filter:
/// hidden entries and ignore files carry no weight, since a unit the host
/// runtime would load must be woven whether or not it is tracked. The
/// result is sorted and deduplicated so a weaving run visits units in a
/// stable order regardless of directory iteration order.
#[must_use]
pub fn php_sources(config: &Config) -> Vec<Utf8PathBuf> {
    let mut sources = Vec::new();
    for root in config.include_paths() {
        let walker = WalkBuilder::new(root.as_std_path())
            .standard_filters(false)
            .follow_links(false)
            .build();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(%error, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
                warn!("skipping non-UTF-8 path");
                continue;
            };
            if path.extension() != Some("php") {
                continue;
            }
            if config
                .exclude_paths()
                .iter()
                .any(|prefix| path.starts_with(prefix))
            {
                continue;
            }
            sources.push(path);
        }
    }
    sources.sort();
    sources.dedup();
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn config_for(root: &TempDir) -> Config {
        let root = Utf8PathBuf::from_path_buf(root.path().to_path_buf()).expect("utf-8 tempdir");
        let config_path = root.join("loom.json");
        fs::write(
            &config_path,
            format!(r#"{{"app_root": "{root}", "include_paths": ["src"], "exclude_paths": ["src/vendor"]}}"#),
        )
        .expect("write config");
        Config::load(&config_path).expect("config")
    }

    #[test]
    fn hidden_and_ignored_units_are_still_enumerated() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("src/.generated")).expect("create dirs");
        fs::write(dir.path().join("src/Plain.php"), "<?php\n").expect("write");
        fs::write(dir.path().join("src/.gitignore"), "*.php\n").expect("write");
        fs::write(dir.path().join("src/.generated/Unit.php"), "<?php\n").expect("write");

        let sources = php_sources(&config_for(&dir));
        let names: Vec<&str> = sources
            .iter()
            .filter_map(|path| path.strip_prefix(dir.path()).ok())
            .map(camino::Utf8Path::as_str)
            .collect();
        assert_eq!(names, ["src/.generated/Unit.php", "src/Plain.php"]);
    }

    #[test]
    fn excluded_prefixes_and_other_extensions_are_dropped() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("src/vendor")).expect("create dirs");
        fs::write(dir.path().join("src/Kept.php"), "<?php\n").expect("write");
        fs::write(dir.path().join("src/notes.txt"), "notes").expect("write");
        fs::write(dir.path().join("src/vendor/Lib.php"), "<?php\n").expect("write");

        let sources = php_sources(&config_for(&dir));
        let names: Vec<&str> = sources
            .iter()
            .filter_map(|path| path.strip_prefix(dir.path()).ok())
            .map(camino::Utf8Path::as_str)
            .collect();
        assert_eq!(names, ["src/Kept.php"]);
    }
}
