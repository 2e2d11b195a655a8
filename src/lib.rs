//! # cubeprop
//!
//! Rewrites member-referencing fields of data-modeling schema files into
//! closures over the symbols they use, so a later stage can evaluate them
//! with those symbols bound.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Schema source                         │
//! │   (cube, view, context, dashboardTemplate definitions)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [dsl: lexer + parser]
//! ┌─────────────────────────────────────────────────────────┐
//! │                     AST                                  │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [lowering]
//! ┌─────────────────────────────────────────────────────────┐
//! │              Tree (arena with parent links)              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [transpile] ◀── [symbols]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Tree with fields wrapped in closures            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [tree::printer]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Transpiled source                       │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod compile;
pub mod config;
pub mod dsl;
pub mod lowering;
pub mod symbols;
pub mod transpile;
pub mod tree;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compile::{compile_source, CompileOptions, CompiledSchema, SchemaCompiler};
    pub use crate::config::Settings;
    pub use crate::symbols::{CubeDictionary, CubeSymbols, ResolveError, SchemaSymbols};
    pub use crate::transpile::{
        CallSiteKind, CubePropContextTranspiler, TranspileError, TranspileReport, Transpiler,
    };
    pub use crate::tree::{NodeId, NodeKind, Tree};
}

pub use compile::{compile_source, CompileError, CompileOptions};
pub use transpile::{CubePropContextTranspiler, Transpiler};
pub use tree::Tree;
