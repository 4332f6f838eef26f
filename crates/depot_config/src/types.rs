//! Configuration types deserialized from `depot.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// The top-level configuration parsed from `depot.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct DepotConfig {
    /// Where the dependency store lives.
    #[serde(default)]
    pub store: StoreConfig,
    /// Where compiled classes are found when no paths are given.
    #[serde(default)]
    pub classpath: ClasspathConfig,
    /// Logging defaults.
    #[serde(default)]
    pub log: LogConfig,
}

impl DepotConfig {
    /// The store directory, resolved against `project_dir` when relative.
    pub fn store_path(&self, project_dir: &Path) -> PathBuf {
        resolve(project_dir, &self.store.dir)
    }

    /// The class-file roots, resolved against `project_dir` when relative.
    pub fn class_roots(&self, project_dir: &Path) -> Vec<PathBuf> {
        self.classpath
            .roots
            .iter()
            .map(|root| resolve(project_dir, root))
            .collect()
    }
}

fn resolve(project_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}

/// Store location settings.
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the index files, the record pool and the symbol table.
    #[serde(default = "default_store_dir")]
    pub dir: String,
    /// Subdirectory of `dir` used as the staging store by `depot make`.
    #[serde(default = "default_staging_dir")]
    pub staging: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            staging: default_staging_dir(),
        }
    }
}

fn default_store_dir() -> String {
    ".depot".to_string()
}

fn default_staging_dir() -> String {
    "staging".to_string()
}

/// Class-file roots.
#[derive(Debug, Default, Deserialize)]
pub struct ClasspathConfig {
    /// Directories or class files imported when a command is given no paths.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub roots: Vec<String>,
}

/// Logging settings.
#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Default `tracing` filter directives, e.g. `"warn"` or
    /// `["warn", "depot_cache=debug"]`. `RUST_LOG` takes precedence.
    #[serde(
        default = "default_log_filter",
        deserialize_with = "deserialize_string_or_vec"
    )]
    pub filter: Vec<String>,
}

impl LogConfig {
    /// The directives joined into a single filter string.
    pub fn directives(&self) -> String {
        self.filter.join(",")
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> Vec<String> {
    vec!["warn".to_string()]
}

/// Deserializes a field that can be either a single string or a list of strings.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DepotConfig::default();
        assert_eq!(config.store.dir, ".depot");
        assert_eq!(config.store.staging, "staging");
        assert!(config.classpath.roots.is_empty());
        assert_eq!(config.log.directives(), "warn");
    }

    #[test]
    fn relative_store_resolves_against_project() {
        let config = DepotConfig::default();
        assert_eq!(
            config.store_path(Path::new("/work/app")),
            PathBuf::from("/work/app/.depot")
        );
    }

    #[test]
    fn absolute_store_is_kept() {
        let mut config = DepotConfig::default();
        config.store.dir = "/var/cache/depot".to_string();
        assert_eq!(
            config.store_path(Path::new("/work/app")),
            PathBuf::from("/var/cache/depot")
        );
    }

    #[test]
    fn class_roots_resolve() {
        let mut config = DepotConfig::default();
        config.classpath.roots = vec!["out/classes".to_string(), "/opt/lib".to_string()];
        assert_eq!(
            config.class_roots(Path::new("/p")),
            vec![PathBuf::from("/p/out/classes"), PathBuf::from("/opt/lib")]
        );
    }
}
