// crates/hookgate-cli/src/main.rs
// ============================================================================
// Module: Hookgate CLI Entry Point
// Description: Command dispatcher for the webhook service and signing tools.
// Purpose: Run the server, validate config files, and sign or verify payloads.
// Dependencies: clap, hookgate-config, hookgate-core, hookgate-server, thiserror, tokio.
// ============================================================================

//! ## Overview
//! `hookgate serve` runs the HTTP service until ctrl-c. `hookgate config
//! validate` loads and validates a config file. `hookgate signature sign` and
//! `hookgate signature verify` compute and check `sha256=` signatures the
//! same way the deploy webhook does. Inputs are bounded before they are read.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use hookgate_config::HookgateConfig;
use hookgate_config::env_lookup;
use hookgate_core::SigningSecret;
use hookgate_core::sign;
use hookgate_core::verify;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a payload file passed to the signature commands.
const MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "hookgate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook delivery server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// HMAC signature utilities.
    Signature {
        /// Selected signature subcommand.
        #[command(subcommand)]
        command: SignatureCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to hookgate.toml or `HOOKGATE_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to hookgate.toml or `HOOKGATE_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Signature subcommands.
#[derive(Subcommand, Debug)]
enum SignatureCommand {
    /// Print the `sha256=` signature for a payload file.
    Sign(SignCommand),
    /// Check a presented signature against a payload file.
    Verify(VerifyCommand),
}

/// Source of the shared signing secret.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SecretArgs {
    /// Secret value given inline.
    #[arg(long, value_name = "SECRET")]
    secret: Option<String>,
    /// Environment variable holding the secret.
    #[arg(long, value_name = "VAR")]
    secret_env: Option<String>,
}

/// Arguments for `signature sign`.
#[derive(Args, Debug)]
struct SignCommand {
    /// Signing secret source.
    #[command(flatten)]
    secret: SecretArgs,
    /// Payload file to sign.
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
}

/// Arguments for `signature verify`.
#[derive(Args, Debug)]
struct VerifyCommand {
    /// Signing secret source.
    #[command(flatten)]
    secret: SecretArgs,
    /// Payload file to verify.
    #[arg(long, value_name = "PATH")]
    file: PathBuf,
    /// Presented signature header value (`sha256=<hex>`).
    #[arg(long, value_name = "SIGNATURE")]
    header: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors returned by bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// File I/O failure.
    #[error("{0}")]
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        write_stdout_line(&format!("hookgate {}", env!("CARGO_PKG_VERSION")))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };
    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command: ConfigCommand::Validate(command),
        } => command_config_validate(&command),
        Commands::Signature {
            command,
        } => command_signature(command),
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| output_error("stdout", &err))?;
    write_stdout_line("")
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = HookgateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let bind = config.server.bind_addr().map_err(|err| CliError::new(err.to_string()))?;
    write_stderr_line(&format!("hookgate listening on {bind}"))?;
    hookgate_server::run(&config)
        .await
        .map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `config validate` command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = HookgateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line(&format!(
        "config ok: {} destination(s), failover {}, automation {}",
        config.destinations.len(),
        enabled(config.failover.is_some()),
        enabled(config.automation.is_some()),
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Dispatches signature subcommands.
fn command_signature(command: SignatureCommand) -> CliResult<ExitCode> {
    match command {
        SignatureCommand::Sign(command) => {
            let secret = resolve_secret(&command.secret, &env_lookup)?;
            let payload = read_payload(&command.file)?;
            let signature = sign(&payload, &secret).map_err(|err| CliError::new(err.to_string()))?;
            write_stdout_line(&signature)?;
            Ok(ExitCode::SUCCESS)
        }
        SignatureCommand::Verify(command) => {
            let secret = resolve_secret(&command.secret, &env_lookup)?;
            let payload = read_payload(&command.file)?;
            if verify(&payload, Some(&command.header), Some(&secret)) {
                write_stdout_line("signature valid")?;
                Ok(ExitCode::SUCCESS)
            } else {
                write_stdout_line("signature invalid")?;
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Resolves the signing secret from the inline value or the named variable.
fn resolve_secret(
    args: &SecretArgs,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> CliResult<SigningSecret> {
    let value = match (&args.secret, &args.secret_env) {
        (Some(value), _) => value.clone(),
        (None, Some(name)) => lookup(name)
            .ok_or_else(|| CliError::new(format!("{name} is not set in the environment")))?,
        (None, None) => return Err(CliError::new("a signing secret is required".to_string())),
    };
    SigningSecret::new(value.into_bytes()).map_err(|err| CliError::new(err.to_string()))
}

/// Reads a payload file within [`MAX_PAYLOAD_BYTES`].
fn read_payload(path: &Path) -> CliResult<Vec<u8>> {
    read_bytes_with_limit(path, MAX_PAYLOAD_BYTES).map_err(|err| {
        CliError::new(format!("failed to read payload {}: {err}", path.display()))
    })
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Renders a feature flag for summaries.
const fn enabled(flag: bool) -> &'static str {
    if flag { "enabled" } else { "disabled" }
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| output_error("stdout", &err))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|err| output_error("stderr", &err))
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> CliError {
    CliError::new(format!("failed to write to {stream}: {error}"))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
