//! cubeprop CLI - Rewrite schema member references into closures
//!
//! Usage:
//!   cubeprop transpile <schema.js> [--config <cubeprop.toml>] [--format js|json] [--verbose]
//!   cubeprop inspect <schema.js> [--config <cubeprop.toml>]
//!
//! Examples:
//!   cubeprop transpile model/orders.js
//!   cubeprop transpile model/orders.js --format json
//!   cubeprop inspect model/orders.js --config cubeprop.toml

use ariadne::{Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand, ValueEnum};
use cubeprop::compile::{CompileError, CompiledSchema, SchemaCompiler};
use cubeprop::config::Settings;
use cubeprop::dsl::{Diagnostic, Severity};
use cubeprop::transpile::TranspileReport;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cubeprop")]
#[command(about = "cubeprop - Rewrite schema member references into closures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transpile a schema file and print the result
    Transpile {
        /// Path to the schema file
        file: PathBuf,

        /// Configuration file (defaults to cubeprop.toml next to the schema)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "js")]
        format: OutputFormat,

        /// Report rewritten fields on stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// List matched call sites and rewritten fields
    Inspect {
        /// Path to the schema file
        file: PathBuf,

        /// Configuration file (defaults to cubeprop.toml next to the schema)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Transpiled source
    Js,
    /// The rewritten tree as JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = match &cli.command {
        Commands::Transpile { verbose: true, .. } => "cubeprop=debug",
        _ => "cubeprop=warn",
    };
    // stdout carries the transpiled output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Transpile {
            file,
            config,
            format,
            verbose,
        } => cmd_transpile(file, config, format, verbose),
        Commands::Inspect { file, config } => cmd_inspect(file, config),
    }
}

fn cmd_transpile(
    file: PathBuf,
    config: Option<PathBuf>,
    format: OutputFormat,
    verbose: bool,
) -> ExitCode {
    let Some((source, mut compiler)) = load(&file, config.as_deref()) else {
        return ExitCode::FAILURE;
    };

    let compiled = match compiler.compile(&source) {
        Ok(compiled) => compiled,
        Err(e) => {
            report_error(&file, &source, e);
            return ExitCode::FAILURE;
        }
    };

    match format {
        OutputFormat::Js => print!("{}", compiled.code),
        OutputFormat::Json => match serde_json::to_string_pretty(&compiled.tree) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize tree: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    if verbose {
        debug!(source = %file.display(), hash = %compiled.hash, "transpiled");
        for line in report_lines(&compiled.report) {
            eprintln!("-- {}", line);
        }
    }

    ExitCode::SUCCESS
}

fn cmd_inspect(file: PathBuf, config: Option<PathBuf>) -> ExitCode {
    let Some((source, mut compiler)) = load(&file, config.as_deref()) else {
        return ExitCode::FAILURE;
    };

    let compiled: &CompiledSchema = match compiler.compile(&source) {
        Ok(compiled) => compiled,
        Err(e) => {
            report_error(&file, &source, e);
            return ExitCode::FAILURE;
        }
    };

    println!("File: {}", file.display());
    println!();

    if compiled.report.is_empty() {
        println!("No call sites found.");
        return ExitCode::SUCCESS;
    }

    for line in report_lines(&compiled.report) {
        println!("{}", line);
    }
    println!();
    println!(
        "{} call site(s), {} field(s) rewritten",
        compiled.report.call_sites.len(),
        compiled.report.rewritten_count()
    );

    ExitCode::SUCCESS
}

/// Read the schema and build a compiler from the applicable settings.
fn load(file: &Path, config: Option<&Path>) -> Option<(String, SchemaCompiler)> {
    let source = match fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            return None;
        }
    };

    let settings = match config {
        Some(path) => Settings::from_file(path),
        None => Settings::discover(file.parent().unwrap_or(Path::new("."))),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {}", e);
            return None;
        }
    };

    Some((source, SchemaCompiler::from_settings(&settings)))
}

/// One line per call site, then one indented line per rewritten field.
fn report_lines(report: &TranspileReport) -> Vec<String> {
    let mut lines = Vec::new();
    for site in &report.call_sites {
        match &site.cube_name {
            Some(name) => lines.push(format!("{} \"{}\"", site.kind, name)),
            None => lines.push(site.kind.to_string()),
        }
        for field in &site.fields {
            lines.push(format!("  {}: ({}) => ...", field.field, field.params.join(", ")));
        }
    }
    lines
}

fn report_error(file: &Path, source: &str, error: CompileError) {
    match error {
        CompileError::ParseError(diagnostics) => {
            let name = file.display().to_string();
            for diagnostic in &diagnostics {
                render_diagnostic(&name, source, diagnostic);
            }
        }
        other => error!("Compilation error: {}", other),
    }
}

fn render_diagnostic(name: &str, source: &str, diagnostic: &Diagnostic) {
    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };
    let span = diagnostic.span.clone();
    let printed = Report::build(kind, (name, span.clone()))
        .with_message(&diagnostic.message)
        .with_label(Label::new((name, span)).with_message(&diagnostic.message))
        .finish()
        .eprint((name, Source::from(source)));
    if printed.is_err() {
        eprintln!("  {}", diagnostic);
    }
}
