use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::xml::ParseOptions;

/// Configuration for loading and saving ReqIF documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// How many times a file operation is attempted when it fails with a
    /// transient error, such as another process holding a lock on the file.
    max_io_attempts: u32,

    /// Delay before the first retry. Doubles on each further retry.
    retry_backoff_ms: u64,

    /// Local names of elements whose content is kept exactly as written,
    /// whitespace included.
    ///
    /// XHTML content and elements marked `xml:space="preserve"` are always
    /// kept.
    preserve_whitespace_in: Vec<String>,

    /// Whether files in a `.reqifz` archive that nothing in the document
    /// refers to are dropped on save.
    pub prune_unreferenced_attachments: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_io_attempts: default_max_io_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            preserve_whitespace_in: default_preserve_whitespace_in(),
            prune_unreferenced_attachments: false,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The number of attempts for a file operation. Always at least one.
    #[must_use]
    pub fn max_io_attempts(&self) -> u32 {
        self.max_io_attempts.max(1)
    }

    /// The delay before the first retry.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Sets the retry policy.
    pub fn set_retry(&mut self, max_io_attempts: u32, backoff: Duration) {
        self.max_io_attempts = max_io_attempts;
        self.retry_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
    }

    /// Element names whose content is kept verbatim.
    #[must_use]
    pub fn preserve_whitespace_in(&self) -> &[String] {
        &self.preserve_whitespace_in
    }

    /// Adds an element name whose content is kept verbatim.
    ///
    /// Returns `true` if the name was added, `false` if it was already
    /// present.
    pub fn add_preserved_element(&mut self, name: String) -> bool {
        if self.preserve_whitespace_in.contains(&name) {
            false
        } else {
            self.preserve_whitespace_in.push(name);
            true
        }
    }

    /// The XML parser options this configuration implies.
    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            preserve_whitespace_in: self.preserve_whitespace_in.clone(),
        }
    }
}

const fn default_max_io_attempts() -> u32 {
    3
}

const fn default_retry_backoff_ms() -> u64 {
    50
}

fn default_preserve_whitespace_in() -> Vec<String> {
    ParseOptions::default().preserve_whitespace_in
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_max_io_attempts")]
        max_io_attempts: u32,

        #[serde(default = "default_retry_backoff_ms")]
        retry_backoff_ms: u64,

        #[serde(default = "default_preserve_whitespace_in")]
        preserve_whitespace_in: Vec<String>,

        #[serde(default)]
        prune_unreferenced_attachments: bool,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                max_io_attempts,
                retry_backoff_ms,
                preserve_whitespace_in,
                prune_unreferenced_attachments,
            } => Self {
                max_io_attempts,
                retry_backoff_ms,
                preserve_whitespace_in,
                prune_unreferenced_attachments,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            max_io_attempts: config.max_io_attempts,
            retry_backoff_ms: config.retry_backoff_ms,
            preserve_whitespace_in: config.preserve_whitespace_in,
            prune_unreferenced_attachments: config.prune_unreferenced_attachments,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\nmax_io_attempts = 5\nretry_backoff_ms = 10\npreserve_whitespace_in = [\"THE-VALUE\", \"NOTES\"]\nprune_unreferenced_attachments = true\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.max_io_attempts(), 5);
        assert_eq!(config.retry_backoff(), Duration::from_millis(10));
        assert_eq!(
            config.preserve_whitespace_in(),
            &["THE-VALUE".to_string(), "NOTES".to_string()]
        );
        assert!(config.prune_unreferenced_attachments);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nmax_io_attempts = \"three\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        // Tests that deserialising an empty file returns the default configuration.
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reqif.toml");
        let mut config = Config::default();
        config.set_retry(0, Duration::from_millis(5));
        assert!(config.add_preserved_element("NOTES".into()));
        assert!(!config.add_preserved_element("NOTES".into()));

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.max_io_attempts(), 1);
    }

    #[test]
    fn oversized_backoff_saturates() {
        let mut config = Config::default();
        config.set_retry(3, Duration::MAX);
        assert_eq!(config.retry_backoff(), Duration::from_millis(u64::MAX));
    }
}
