//! In-memory symbol table built from configuration or by hand.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::{CubeDictionary, CubeSymbols, ResolveError};
use crate::config::SymbolSettings;

/// Tokens that refer to the cube currently being defined.
pub const CURRENT_CUBE_TOKENS: &[&str] = &["CUBE", "TABLE"];

/// Helpers available in every definition regardless of cube scope.
pub const CONTEXT_SYMBOLS: &[&str] = &[
    "SECURITY_CONTEXT",
    "security_context",
    "FILTER_PARAMS",
    "FILTER_GROUP",
    "SQL_UTILS",
];

/// Symbol retired in favour of `SECURITY_CONTEXT`; looking it up is an error.
const REMOVED_USER_CONTEXT: &str = "USER_CONTEXT";

/// Registered cubes, their members, and global helpers.
///
/// Ordered collections keep the serialized form stable, which matters for
/// cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaSymbols {
    cubes: BTreeMap<String, BTreeSet<String>>,
    context: BTreeSet<String>,
    globals: BTreeSet<String>,
    current_cube: BTreeSet<String>,
}

impl Default for SchemaSymbols {
    fn default() -> Self {
        Self {
            cubes: BTreeMap::new(),
            context: CONTEXT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            globals: BTreeSet::new(),
            current_cube: CURRENT_CUBE_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SchemaSymbols {
    /// Default context helpers and current-cube tokens, no cubes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from the `[symbols]` section of the settings.
    pub fn from_settings(settings: &SymbolSettings) -> Self {
        Self {
            cubes: settings
                .cubes
                .iter()
                .map(|(cube, members)| (cube.clone(), members.iter().cloned().collect()))
                .collect(),
            context: settings.context.iter().cloned().collect(),
            globals: settings.globals.iter().cloned().collect(),
            current_cube: settings.current_cube.iter().cloned().collect(),
        }
    }

    /// Register a cube with its members (measures, dimensions, segments...).
    pub fn with_cube<I, S>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cubes
            .entry(name.into())
            .or_default()
            .extend(members.into_iter().map(Into::into));
        self
    }

    /// Register a symbol visible from every cube and context.
    pub fn with_global(mut self, name: impl Into<String>) -> Self {
        self.globals.insert(name.into());
        self
    }

    pub fn has_cube(&self, name: &str) -> bool {
        self.cubes.contains_key(name)
    }

    pub fn cube_names(&self) -> impl Iterator<Item = &str> {
        self.cubes.keys().map(String::as_str)
    }

    fn is_member(&self, cube_name: &str, name: &str) -> bool {
        self.cubes
            .get(cube_name)
            .is_some_and(|members| members.contains(name))
    }
}

impl CubeSymbols for SchemaSymbols {
    fn resolve_symbol(&self, cube_name: Option<&str>, name: &str) -> Result<bool, ResolveError> {
        if name == REMOVED_USER_CONTEXT {
            return Err(ResolveError::Removed {
                name: REMOVED_USER_CONTEXT.to_string(),
                replacement: "SECURITY_CONTEXT".to_string(),
            });
        }
        if self.context.contains(name) || self.globals.contains(name) {
            return Ok(true);
        }
        if self.current_cube.contains(name) {
            return Ok(cube_name.is_some_and(|cube| self.has_cube(cube)));
        }
        if self.has_cube(name) {
            return Ok(true);
        }
        Ok(cube_name.is_some_and(|cube| self.is_member(cube, name)))
    }

    fn is_current_cube(&self, name: &str) -> Result<bool, ResolveError> {
        Ok(self.current_cube.contains(name))
    }
}

impl CubeDictionary for SchemaSymbols {
    fn resolve_cube(&self, name: &str) -> Result<bool, ResolveError> {
        Ok(self.has_cube(name))
    }
}
