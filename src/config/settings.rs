//! TOML-based configuration for cubeprop.
//!
//! Example configuration (`cubeprop.toml`); every key is optional:
//! ```toml
//! [transpile]
//! reference_fields = ["sql", "drillMembers", "columns"]
//! short_reference_suffixes = ["measures", "dimensions"]
//! extends_field = "extends"
//!
//! [symbols]
//! current_cube = ["CUBE", "TABLE"]
//! context = ["SECURITY_CONTEXT", "FILTER_PARAMS"]
//! globals = ["COMPILE_CONTEXT"]
//!
//! [symbols.cubes]
//! Orders = ["status", "count", "amount"]
//! Users = ["id", "city"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::symbols::{CONTEXT_SYMBOLS, CURRENT_CUBE_TOKENS};

/// Fields of cube, view and context bodies whose values reference members.
pub const DEFAULT_REFERENCE_FIELDS: &[&str] = &[
    "sql",
    "measureReferences",
    "dimensionReferences",
    "segmentReferences",
    "timeDimensionReference",
    "rollupReferences",
    "drillMembers",
    "drillMemberReferences",
    "contextMembers",
    "columns",
];

/// Name endings of dashboard template fields that reference members.
pub const DEFAULT_SHORT_REFERENCE_SUFFIXES: &[&str] = &[
    "measures",
    "dimensions",
    "segments",
    "measure",
    "dimension",
    "segment",
    "member",
];

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Which fields get rewritten.
    pub transpile: TranspileSettings,

    /// Symbol table used when no external resolver is supplied.
    pub symbols: SymbolSettings,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Look for `cubeprop.toml` in `dir`, falling back to defaults.
    pub fn discover(dir: &Path) -> Result<Self, SettingsError> {
        let path = dir.join("cubeprop.toml");
        if path.exists() {
            debug!(path = %path.display(), "loading settings");
            Self::from_file(&path)
        } else {
            debug!(dir = %dir.display(), "no cubeprop.toml, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.transpile.validate()
    }
}

/// Field selection for the transpiler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranspileSettings {
    /// Exact field names rewritten inside `cube`, `view` and `context`.
    pub reference_fields: Vec<String>,

    /// Field name endings rewritten inside `dashboardTemplate`.
    pub short_reference_suffixes: Vec<String>,

    /// Field naming the parent cube of a `cube` or `view`.
    pub extends_field: String,
}

impl Default for TranspileSettings {
    fn default() -> Self {
        Self {
            reference_fields: to_strings(DEFAULT_REFERENCE_FIELDS),
            short_reference_suffixes: to_strings(DEFAULT_SHORT_REFERENCE_SUFFIXES),
            extends_field: "extends".to_string(),
        }
    }
}

impl TranspileSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.reference_fields.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "transpile.reference_fields must not be empty".to_string(),
            ));
        }
        if self.reference_fields.iter().any(|f| f.is_empty()) {
            return Err(SettingsError::InvalidConfig(
                "transpile.reference_fields must not contain empty names".to_string(),
            ));
        }
        if self.short_reference_suffixes.iter().any(|s| s.is_empty()) {
            return Err(SettingsError::InvalidConfig(
                "transpile.short_reference_suffixes must not contain empty names".to_string(),
            ));
        }
        if self.extends_field.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "transpile.extends_field must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// True when these are exactly the built-in field lists.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Symbol table contents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SymbolSettings {
    /// Self-reference tokens for the cube being defined.
    pub current_cube: Vec<String>,

    /// Helpers visible in every definition.
    pub context: Vec<String>,

    /// Additional globally visible symbols.
    pub globals: Vec<String>,

    /// Registered cubes and the members each declares.
    pub cubes: BTreeMap<String, Vec<String>>,
}

impl Default for SymbolSettings {
    fn default() -> Self {
        Self {
            current_cube: to_strings(CURRENT_CUBE_TOKENS),
            context: to_strings(CONTEXT_SYMBOLS),
            globals: Vec::new(),
            cubes: BTreeMap::new(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
