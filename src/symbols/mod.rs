//! Symbol lookups consumed by the transpilers.
//!
//! The transpilers never decide on their own whether a name is a schema
//! symbol. They ask two collaborators:
//!
//! - [`CubeSymbols`] knows members declared on cubes, context helpers and the
//!   current-cube self-reference tokens.
//! - [`CubeDictionary`] knows which cubes are registered, for `extends`.
//!
//! Both return strict booleans; a lookup that cannot be answered is a
//! [`ResolveError`] and is propagated to the caller untouched.
//! [`SchemaSymbols`] is an in-memory implementation of both.

mod schema;

pub use schema::{SchemaSymbols, CONTEXT_SYMBOLS, CURRENT_CUBE_TOKENS};

/// Errors raised by symbol lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Support for {name} was removed, please migrate to {replacement}")]
    Removed { name: String, replacement: String },

    #[error("Failed to resolve '{name}': {message}")]
    Lookup { name: String, message: String },
}

/// Lookup of schema symbols, optionally scoped to a cube.
pub trait CubeSymbols {
    /// True if `name` is a declared symbol, either globally or on `cube_name`.
    fn resolve_symbol(&self, cube_name: Option<&str>, name: &str) -> Result<bool, ResolveError>;

    /// True if `name` is a self-reference to the cube being defined.
    fn is_current_cube(&self, name: &str) -> Result<bool, ResolveError>;
}

/// Lookup of registered cubes.
pub trait CubeDictionary {
    /// True if `name` names a registered cube.
    fn resolve_cube(&self, name: &str) -> Result<bool, ResolveError>;
}

impl<T: CubeSymbols + ?Sized> CubeSymbols for &T {
    fn resolve_symbol(&self, cube_name: Option<&str>, name: &str) -> Result<bool, ResolveError> {
        (**self).resolve_symbol(cube_name, name)
    }

    fn is_current_cube(&self, name: &str) -> Result<bool, ResolveError> {
        (**self).is_current_cube(name)
    }
}

impl<T: CubeDictionary + ?Sized> CubeDictionary for &T {
    fn resolve_cube(&self, name: &str) -> Result<bool, ResolveError> {
        (**self).resolve_cube(name)
    }
}
