//! Configuration module for cubeprop.
//!
//! Handles the field lists the transpiler rewrites and the symbol table the
//! command line tool resolves against.

mod settings;

pub use settings::{
    Settings, SettingsError, SymbolSettings, TranspileSettings, DEFAULT_REFERENCE_FIELDS,
    DEFAULT_SHORT_REFERENCE_SUFFIXES,
};
