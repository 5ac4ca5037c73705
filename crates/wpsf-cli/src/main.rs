// crates/wpsf-cli/src/main.rs
// ============================================================================
// Module: WPSF CLI Entry Point
// Description: Command dispatcher for settings schema and data workflows.
// Purpose: Operate one settings group from the command line.
// Dependencies: clap, wpsf-config, wpsf-core, wpsf-store-sqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The `wpsf` CLI loads `wpsf.toml`, builds the settings engine it describes,
//! and runs one operation: validate the schema, render the form, show, save,
//! export, import, or delete settings. Every mutating command goes through
//! the same authorization, token, validation, and audit path a host would
//! use. Security posture: input files are untrusted and read with hard size
//! limits.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde_json::Value;
use thiserror::Error;
use wpsf_config::StorageBackend;
use wpsf_config::WpsfConfig;
use wpsf_core::ExportRequest;
use wpsf_core::FieldRegistry;
use wpsf_core::FileAuditSink;
use wpsf_core::ImportRequest;
use wpsf_core::InMemoryOptionStore;
use wpsf_core::InMemoryTokenService;
use wpsf_core::NoopAuditSink;
use wpsf_core::OptionStore;
use wpsf_core::Schema;
use wpsf_core::SettingsAuditSink;
use wpsf_core::SettingsEngine;
use wpsf_core::SettingsMap;
use wpsf_core::StderrAuditSink;
use wpsf_core::TokenAction;
use wpsf_core::core::values::settings_from_value;
use wpsf_core::core::values::settings_to_value;
use wpsf_core::runtime::transfer::MAX_IMPORT_BYTES;
use wpsf_store_sqlite::SqliteOptionStore;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a `save --input` file.
const MAX_SAVE_INPUT_BYTES: usize = MAX_IMPORT_BYTES;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "wpsf", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (defaults to `WPSF_CONFIG`, then ./wpsf.toml).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Schema utilities.
    Schema {
        /// Selected schema subcommand.
        #[command(subcommand)]
        command: SchemaCommand,
    },
    /// Render the settings form as HTML.
    Render(RenderCommand),
    /// Print effective settings as JSON.
    Show(ShowCommand),
    /// Validate and persist submitted settings.
    Save(SaveCommand),
    /// Export persisted settings as a JSON document.
    Export(ExportCommand),
    /// Replace persisted settings from a JSON document.
    Import(ImportCommand),
    /// Delete all persisted settings for the group.
    Delete,
}

/// Schema subcommands.
#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// Load and build the configured schema, then print a summary.
    Validate,
}

/// Arguments for the `render` command.
#[derive(Args, Debug)]
struct RenderCommand {
    /// Write the HTML to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

/// Arguments for the `show` command.
#[derive(Args, Debug)]
struct ShowCommand {
    /// Key values by bare field id instead of derived key.
    #[arg(long, action = ArgAction::SetTrue)]
    unprefixed: bool,
}

/// Arguments for the `save` command.
#[derive(Args, Debug)]
struct SaveCommand {
    /// JSON object of settings, or a JSON array of `[name, value]` form pairs.
    #[arg(long, value_name = "FILE")]
    input: PathBuf,
}

/// Arguments for the `export` command.
#[derive(Args, Debug)]
struct ExportCommand {
    /// Write the document to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

/// Arguments for the `import` command.
#[derive(Args, Debug)]
struct ImportCommand {
    /// Settings document previously produced by `export`.
    #[arg(long, value_name = "FILE")]
    file: PathBuf,
}

/// Engine type driven by the CLI.
type CliEngine = SettingsEngine<Box<dyn OptionStore>>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run(cli: Cli) -> CliResult<ExitCode> {
    let config = WpsfConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(err.to_string()))?;
    match cli.command {
        Commands::Schema {
            command: SchemaCommand::Validate,
        } => command_schema_validate(&config),
        Commands::Render(command) => command_render(&config, &command),
        Commands::Show(command) => command_show(&config, &command),
        Commands::Save(command) => command_save(&config, &command),
        Commands::Export(command) => command_export(&config, &command),
        Commands::Import(command) => command_import(&config, &command),
        Commands::Delete => command_delete(&config),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes `schema validate`.
fn command_schema_validate(config: &WpsfConfig) -> CliResult<ExitCode> {
    let schema = load_schema(config)?;
    write_stdout_line(&schema_summary(&schema))?;
    for warning in unregistered_types(&schema, &FieldRegistry::with_builtins()) {
        write_stderr_line(&warning).map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `render`.
fn command_render(config: &WpsfConfig, command: &RenderCommand) -> CliResult<ExitCode> {
    let engine = build_engine(config)?;
    let html = engine.render_page().map_err(|err| CliError::new(format!("render failed: {err}")))?;
    write_output(command.out.as_deref(), html.as_bytes())?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `show`.
fn command_show(config: &WpsfConfig, command: &ShowCommand) -> CliResult<ExitCode> {
    let engine = build_engine(config)?;
    let settings = engine
        .read(command.unprefixed)
        .map_err(|err| CliError::new(format!("read failed: {err}")))?;
    write_output(None, &canonical_settings(&settings)?)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `save`.
fn command_save(config: &WpsfConfig, command: &SaveCommand) -> CliResult<ExitCode> {
    let bytes = read_input(&command.input, MAX_SAVE_INPUT_BYTES)?;
    let input = parse_save_input(&bytes)?;
    let mut engine = build_engine(config)?;
    warn_if_ephemeral(config)?;
    let saved = match input {
        SaveInput::Settings(settings) => engine.save(settings),
        SaveInput::Form(pairs) => engine.save_form(pairs),
    }
    .map_err(|err| CliError::new(format!("save failed: {err}")))?;
    write_stdout_line(&format!("saved {} keys for {}", saved.len(), engine.group_id()))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `export`.
fn command_export(config: &WpsfConfig, command: &ExportCommand) -> CliResult<ExitCode> {
    let engine = build_engine(config)?;
    let token = engine
        .issue_token(TokenAction::Export)
        .map_err(|err| CliError::new(format!("export failed: {err}")))?;
    let request = ExportRequest {
        token: Some(token),
        group_id: engine.group_id().clone(),
    };
    let document =
        engine.export(&request).map_err(|err| CliError::new(format!("export failed: {err}")))?;
    let mut body = document.body;
    body.push(b'\n');
    write_output(command.out.as_deref(), &body)?;
    if command.out.is_some() {
        write_stdout_line(&format!("exported {} keys as {}", document.key_count, document.filename))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `import`.
fn command_import(config: &WpsfConfig, command: &ImportCommand) -> CliResult<ExitCode> {
    let bytes = read_input(&command.file, MAX_IMPORT_BYTES)?;
    let settings = String::from_utf8(bytes)
        .map_err(|_| CliError::new("import file must be utf-8".to_string()))?;
    let mut engine = build_engine(config)?;
    warn_if_ephemeral(config)?;
    let token = engine
        .issue_token(TokenAction::Import)
        .map_err(|err| CliError::new(format!("import failed: {err}")))?;
    let request = ImportRequest {
        token: Some(token),
        group_id: engine.group_id().clone(),
        settings,
    };
    let count =
        engine.import(&request).map_err(|err| CliError::new(format!("import failed: {err}")))?;
    write_stdout_line(&format!("imported {count} keys for {}", engine.group_id()))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `delete`.
fn command_delete(config: &WpsfConfig) -> CliResult<ExitCode> {
    let mut engine = build_engine(config)?;
    engine.delete_all().map_err(|err| CliError::new(format!("delete failed: {err}")))?;
    write_stdout_line(&format!("deleted settings for {}", engine.group_id()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Engine Assembly
// ============================================================================

/// Loads the configured schema.
fn load_schema(config: &WpsfConfig) -> CliResult<Schema> {
    config.load_schema().map_err(|err| CliError::new(err.to_string()))
}

/// Builds the engine described by `config`.
fn build_engine(config: &WpsfConfig) -> CliResult<CliEngine> {
    let schema = Arc::new(load_schema(config)?);
    let options: Box<dyn OptionStore> = match config.sqlite_store_config() {
        Some(sqlite) => Box::new(
            SqliteOptionStore::new(sqlite)
                .map_err(|err| CliError::new(format!("option store: {err}")))?,
        ),
        None => Box::new(InMemoryOptionStore::new()),
    };
    Ok(SettingsEngine::new(schema, options)
        .with_tokens(InMemoryTokenService::new(config.tokens.ttl()))
        .with_boxed_audit_sink(build_audit_sink(config)?)
        .with_render_options(config.render.render_options())
        .with_ajax_url(config.render.ajax_url.trim()))
}

/// Selects the audit sink described by `config`.
fn build_audit_sink(config: &WpsfConfig) -> CliResult<Box<dyn SettingsAuditSink>> {
    if !config.audit.enabled {
        return Ok(Box::new(NoopAuditSink));
    }
    match config.audit_path() {
        Some(path) => {
            let sink = FileAuditSink::new(&path).map_err(|err| {
                CliError::new(format!("audit log {}: {err}", path.display()))
            })?;
            Ok(Box::new(sink))
        }
        None => Ok(Box::new(StderrAuditSink)),
    }
}

/// Warns that a mutating command runs against a process-local store.
fn warn_if_ephemeral(config: &WpsfConfig) -> CliResult<()> {
    if config.storage.backend == StorageBackend::Memory {
        write_stderr_line("warning: storage backend is memory; changes are discarded on exit")
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Input Parsing
// ============================================================================

/// Parsed `save --input` payload.
#[derive(Debug, PartialEq)]
enum SaveInput {
    /// Settings mapping keyed by derived key.
    Settings(SettingsMap),
    /// Posted form pairs to decode.
    Form(Vec<(String, String)>),
}

/// Parses a `save --input` file.
fn parse_save_input(bytes: &[u8]) -> CliResult<SaveInput> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|err| CliError::new(format!("save input is not valid json: {err}")))?;
    match value {
        Value::Array(items) => {
            let mut pairs = Vec::with_capacity(items.len());
            for item in items {
                pairs.push(parse_form_pair(&item)?);
            }
            Ok(SaveInput::Form(pairs))
        }
        other => settings_from_value(other).map(SaveInput::Settings).ok_or_else(|| {
            CliError::new("save input must be a json object or an array of pairs".to_string())
        }),
    }
}

/// Parses one `[name, value]` form pair.
fn parse_form_pair(item: &Value) -> CliResult<(String, String)> {
    match item.as_array().map(Vec::as_slice) {
        Some([Value::String(name), Value::String(value)]) => Ok((name.clone(), value.clone())),
        _ => Err(CliError::new("form pairs must be [name, value] string arrays".to_string())),
    }
}

/// Failure modes for bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let read_limit = limit.saturating_add(1);
    let mut limited = file.take(read_limit);
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads an input file, mapping failures to CLI errors.
fn read_input(path: &Path, max_bytes: usize) -> CliResult<Vec<u8>> {
    read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(err) => CliError::new(format!("failed to read {}: {err}", path.display())),
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{} exceeds size limit ({size} bytes > {limit} bytes)",
            path.display()
        )),
    })
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Formats the `schema validate` summary line.
fn schema_summary(schema: &Schema) -> String {
    let mode = if schema.has_tabs() { "tabbed" } else { "flat" };
    format!(
        "schema ok: group {} ({mode}), {} tabs, {} sections, {} fields",
        schema.group_id(),
        schema.tabs().len(),
        schema.sections().len(),
        schema.field_entries().count()
    )
}

/// Lists fields whose type has no registered strategy; they render nothing.
fn unregistered_types(schema: &Schema, registry: &FieldRegistry) -> Vec<String> {
    schema
        .field_entries()
        .filter(|entry| !registry.contains(&entry.field.field_type))
        .map(|entry| {
            format!("warning: field {} has unregistered type {}", entry.key, entry.field.field_type)
        })
        .collect()
}

/// Serializes settings as compact JSON with sorted keys and a trailing newline.
fn canonical_settings(settings: &SettingsMap) -> CliResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec(&settings_to_value(settings))
        .map_err(|err| CliError::new(format!("failed to serialize settings: {err}")))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes bytes to `out`, or to stdout when no path is given.
fn write_output(out: Option<&Path>, bytes: &[u8]) -> CliResult<()> {
    match out {
        Some(path) => fs::write(path, bytes)
            .map_err(|err| CliError::new(format!("failed to write {}: {err}", path.display()))),
        None => write_stdout_bytes(bytes).map_err(|err| CliError::new(output_error("stdout", &err))),
    }
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
