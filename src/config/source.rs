//! Section-keyed key/value sources.
//!
//! # Responsibilities
//! - Resolve `"section::key"` lookups against an operator-supplied source
//! - Provide typed accessors that fall back to a per-call default
//!
//! # Design Decisions
//! - The file format is owned by the `config` crate; this module only adapts it
//! - A value that does not parse as the requested type yields the default

use std::collections::HashMap;
use std::path::Path;

use ::config::{Config, File, FileFormat};

/// Separator between the section and key in a lookup (`proxy::name`).
pub const SECTION_SEPARATOR: &str = "::";

/// A read-only source of untyped configuration values.
pub trait KeyValueSource {
    /// Raw string value for a `"section::key"` lookup, if present.
    fn raw(&self, key: &str) -> Option<String>;

    /// String value, or `default` when the key is absent.
    fn string(&self, key: &str, default: &str) -> String {
        self.raw(key).unwrap_or_else(|| default.to_string())
    }

    /// Integer value, or `default` when absent or not an integer.
    fn int(&self, key: &str, default: i64) -> i64 {
        match self.raw(key) {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                tracing::debug!(key, value = %value, default, "Not an integer, using default");
                default
            }),
            None => default,
        }
    }

    /// Boolean value, or `default` when absent or not a boolean.
    fn boolean(&self, key: &str, default: bool) -> bool {
        self.raw(key)
            .and_then(|value| parse_bool(&value))
            .unwrap_or(default)
    }
}

/// Parse the boolean spellings accepted in config files.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "n" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// INI file source backed by the `config` crate.
#[derive(Debug)]
pub struct IniSource {
    inner: Config,
}

impl IniSource {
    /// Open and parse an INI file. The file must exist.
    pub fn open(path: &Path) -> Result<Self, ::config::ConfigError> {
        let inner = Config::builder()
            .add_source(File::from(path).format(FileFormat::Ini).required(true))
            .build()?;
        Ok(Self { inner })
    }
}

impl KeyValueSource for IniSource {
    fn raw(&self, key: &str) -> Option<String> {
        self.inner.get_string(&key.replace(SECTION_SEPARATOR, ".")).ok()
    }
}

/// In-memory source, keyed exactly as looked up (`"section::key"`).
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    values: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from `(key, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl KeyValueSource for MemorySource {
    fn raw(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
