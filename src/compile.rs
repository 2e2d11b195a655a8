//! End-to-end compilation of schema source.
//!
//! ```text
//! Source → Parse → AST → Lower → Tree → Transpile → Tree' → Print
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cubeprop::compile::{compile_source, CompileOptions};
//! use cubeprop::symbols::SchemaSymbols;
//!
//! let symbols = SchemaSymbols::new().with_cube("Orders", ["status"]);
//! let source = r#"
//!     cube(`Orders`, {
//!         sql: `SELECT * FROM orders`,
//!         dimensions: {
//!             status: { sql: `${CUBE}.status`, type: `string` },
//!         },
//!     });
//! "#;
//!
//! let compiled = compile_source(source, &symbols, &CompileOptions::default())?;
//! println!("{}", compiled.code);
//! ```

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::cache::{compute_hash, CacheKey, CacheStats, MemoryCache};
use crate::config::{Settings, TranspileSettings};
use crate::dsl::{self, Diagnostic};
use crate::lowering;
use crate::symbols::{CubeDictionary, CubeSymbols, SchemaSymbols};
use crate::transpile::{CubePropContextTranspiler, TranspileError, TranspileReport, Transpiler};
use crate::tree::{printer, Tree};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during compilation.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Parse error: {}", summarize(.0))]
    ParseError(Vec<Diagnostic>),

    #[error("Transpile error: {0}")]
    TranspileError(#[from] TranspileError),

    #[error("Failed to hash compile inputs: {0}")]
    HashError(#[from] serde_json::Error),

    #[error("Failed to read schema file: {0}")]
    ReadError(#[from] std::io::Error),
}

pub type CompileResult<T> = Result<T, CompileError>;

fn summarize(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "unknown error".to_string(),
        [only] => only.message.clone(),
        [first, rest @ ..] => format!("{} (and {} more)", first.message, rest.len()),
    }
}

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileOptions {
    /// Which fields are rewritten.
    pub transpile: TranspileSettings,
}

impl CompileOptions {
    /// Use the given field selection.
    pub fn with_transpile_settings(mut self, transpile: TranspileSettings) -> Self {
        self.transpile = transpile;
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// A transpiled schema.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    /// The rewritten tree.
    pub tree: Tree,

    /// The rewritten tree printed as source.
    pub code: String,

    /// Call sites and fields that were rewritten.
    pub report: TranspileReport,

    /// Content hash of the inputs. From [`SchemaCompiler`] this covers the
    /// source, options and symbol table; from [`compile_source`], whose
    /// resolver is opaque, only the source and options.
    pub hash: String,
}

// ============================================================================
// Compilation
// ============================================================================

/// Parse, lower, transpile and print `source`.
pub fn compile_source<R>(source: &str, symbols: &R, options: &CompileOptions) -> CompileResult<CompiledSchema>
where
    R: CubeSymbols + CubeDictionary,
{
    let hash = compute_hash(&(source, options))?;
    compile_with_hash(source, symbols, options, hash)
}

fn compile_with_hash<R>(
    source: &str,
    symbols: &R,
    options: &CompileOptions,
    hash: String,
) -> CompileResult<CompiledSchema>
where
    R: CubeSymbols + CubeDictionary,
{
    let parsed = dsl::parse(source);
    if parsed.has_errors() {
        return Err(CompileError::ParseError(parsed.diagnostics));
    }
    let Some(program) = parsed.program else {
        return Err(CompileError::ParseError(parsed.diagnostics));
    };

    let mut tree = lowering::lower_program(&program);
    let transpiler = CubePropContextTranspiler::from_settings(symbols, symbols, &options.transpile)?;
    let report = transpiler.transpile(&mut tree)?;
    debug!(
        call_sites = report.call_sites.len(),
        rewritten = report.rewritten_count(),
        "transpiled schema"
    );
    let code = printer::print(&tree);

    Ok(CompiledSchema {
        tree,
        code,
        report,
        hash,
    })
}

/// Compiles schemas against a fixed symbol table, caching results.
///
/// Identical source compiled twice with the same options and symbols is
/// transpiled once.
#[derive(Debug)]
pub struct SchemaCompiler {
    symbols: SchemaSymbols,
    options: CompileOptions,
    cache: MemoryCache<CompiledSchema>,
}

impl SchemaCompiler {
    pub fn new(symbols: SchemaSymbols, options: CompileOptions) -> Self {
        Self {
            symbols,
            options,
            cache: MemoryCache::new(),
        }
    }

    /// Compiler using the symbol table and field lists from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            SchemaSymbols::from_settings(&settings.symbols),
            CompileOptions::default().with_transpile_settings(settings.transpile.clone()),
        )
    }

    pub fn symbols(&self) -> &SchemaSymbols {
        &self.symbols
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile `source`, reusing an earlier result for identical inputs.
    pub fn compile(&mut self, source: &str) -> CompileResult<&CompiledSchema> {
        let hash = compute_hash(&(source, &self.options, &self.symbols))?;
        let key = CacheKey::compiled(&hash);
        debug!(key = %key, cached = self.cache.contains(&key), "compiling schema");
        let symbols = &self.symbols;
        let options = &self.options;
        self.cache
            .get_or_try_insert_with(&key, || compile_with_hash(source, symbols, options, hash))
    }

    /// Read and compile a schema file.
    pub fn compile_file(&mut self, path: &Path) -> CompileResult<&CompiledSchema> {
        let source = std::fs::read_to_string(path)?;
        self.compile(&source)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}
