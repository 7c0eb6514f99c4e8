//! Cloister CLI — operator tooling for the vault engine.
//!
//! Usage:
//!   cloister init      <vault-file> <password>
//!   cloister exec      <vault-file> <password> <opcode> [args...]
//!   cloister open      <vault-file> <password>
//!   cloister seal      <vault-file> <password> <plaintext-history-file>
//!   cloister merge     <local-file> <remote-file> <password> <output-file>
//!   cloister optimise  <vault-file> <password>

use std::ffi::OsStr;
use std::path::Path;
use std::process::ExitCode;

use cloister_core::command::Opcode;
use cloister_core::datasource::FileBackend;
use cloister_core::engine::FormatEngine;
use cloister_core::{facade, merge};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match args[1].as_str() {
        "init" => runtime.block_on(cmd_init(&args[2..])),
        "exec" => runtime.block_on(cmd_exec(&args[2..])),
        "open" => runtime.block_on(cmd_open(&args[2..])),
        "seal" => runtime.block_on(cmd_seal(&args[2..])),
        "merge" => runtime.block_on(cmd_merge(&args[2..])),
        "optimise" | "optimize" => runtime.block_on(cmd_optimise(&args[2..])),
        "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" => {
            println!("cloister {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        cmd => {
            eprintln!("error: unknown command '{cmd}'");
            print_usage();
            Err("unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!(
        r#"Cloister CLI — vault data engine operator tool

USAGE:
    cloister <COMMAND> [ARGS...]

COMMANDS:
    init      <vault-file> <password>
    exec      <vault-file> <password> <opcode> [args...]
    open      <vault-file> <password>
    seal      <vault-file> <password> <plaintext-history-file>
    merge     <local-file> <remote-file> <password> <output-file>
    optimise  <vault-file> <password>

OPTIONS:
    -h, --help       Print help
    -V, --version    Print version
"#
    );
}

fn backend_for(path: &str) -> Result<(FileBackend, String), Box<dyn std::error::Error>> {
    let path = Path::new(path);
    let root = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().and_then(OsStr::to_str).ok_or("vault path has no file name")?;
    Ok((FileBackend::new(root)?, file_name.to_string()))
}

async fn cmd_init(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let vault_path = args.first().ok_or("usage: cloister init <vault-file> <password>")?;
    let password = args.get(1).ok_or("usage: cloister init <vault-file> <password>")?;

    let (backend, rel_path) = backend_for(vault_path)?;
    let mut engine = FormatEngine::default();
    engine.initialise()?;
    engine.save(&backend, &rel_path, password).await?;

    eprintln!("Initialised vault {} at {vault_path}", engine.tree().id.as_deref().unwrap_or("?"));
    Ok(())
}

async fn cmd_exec(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let vault_path = args.first().ok_or("usage: cloister exec <vault-file> <password> <opcode> [args...]")?;
    let password = args.get(1).ok_or("usage: cloister exec <vault-file> <password> <opcode> [args...]")?;
    let opcode_token = args.get(2).ok_or("missing opcode")?;
    let opcode = Opcode::from_token(opcode_token).ok_or_else(|| format!("unknown opcode: {opcode_token}"))?;
    let op_args: Vec<String> = args[3..].to_vec();

    let (backend, rel_path) = backend_for(vault_path)?;
    let mut engine = FormatEngine::default();
    engine.load(&backend, &rel_path, password).await?;
    engine.execute(opcode, op_args)?;
    engine.save(&backend, &rel_path, password).await?;

    eprintln!("Executed {opcode_token}, history now {} lines", engine.history().len());
    Ok(())
}

async fn cmd_open(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let vault_path = args.first().ok_or("usage: cloister open <vault-file> <password>")?;
    let password = args.get(1).ok_or("usage: cloister open <vault-file> <password>")?;

    let (backend, rel_path) = backend_for(vault_path)?;
    let mut engine = FormatEngine::default();
    engine.load(&backend, &rel_path, password).await?;

    let snapshot = facade::snapshot(engine.tree());
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn cmd_seal(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let vault_path = args.first().ok_or("usage: cloister seal <vault-file> <password> <plaintext-history-file>")?;
    let password = args.get(1).ok_or("usage: cloister seal <vault-file> <password> <plaintext-history-file>")?;
    let history_path = args.get(2).ok_or("missing plaintext history file")?;

    let text = std::fs::read_to_string(history_path)?;
    let lines: Vec<String> = text.lines().map(str::to_string).collect();

    let (backend, rel_path) = backend_for(vault_path)?;
    let mut engine = FormatEngine::default();
    engine.replay_history(lines)?;
    engine.save(&backend, &rel_path, password).await?;

    eprintln!("Sealed {} lines to {vault_path}", engine.history().len());
    Ok(())
}

async fn cmd_merge(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let local_path = args.first().ok_or("usage: cloister merge <local-file> <remote-file> <password> <output-file>")?;
    let remote_path = args.get(1).ok_or("missing remote file")?;
    let password = args.get(2).ok_or("missing password")?;
    let output_path = args.get(3).ok_or("missing output file")?;

    let (local_backend, local_rel) = backend_for(local_path)?;
    let (remote_backend, remote_rel) = backend_for(remote_path)?;

    let mut local_engine = FormatEngine::default();
    local_engine.load(&local_backend, &local_rel, password).await?;
    let mut remote_engine = FormatEngine::default();
    remote_engine.load(&remote_backend, &remote_rel, password).await?;

    let merged_history = merge::merge(local_engine.history(), remote_engine.history())?;

    let (output_backend, output_rel) = backend_for(output_path)?;
    let mut merged_engine = FormatEngine::default();
    merged_engine.replay_history(merged_history)?;
    merged_engine.save(&output_backend, &output_rel, password).await?;

    eprintln!("Merged into {output_path}, {} lines", merged_engine.history().len());
    Ok(())
}

async fn cmd_optimise(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let vault_path = args.first().ok_or("usage: cloister optimise <vault-file> <password>")?;
    let password = args.get(1).ok_or("usage: cloister optimise <vault-file> <password>")?;

    let (backend, rel_path) = backend_for(vault_path)?;
    let mut engine = FormatEngine::default();
    engine.load(&backend, &rel_path, password).await?;
    let before = engine.history().len();
    let flattened = engine.optimise();
    engine.save(&backend, &rel_path, password).await?;

    if flattened {
        eprintln!("Optimised: {before} -> {} lines", engine.history().len());
    } else {
        eprintln!("Not due for optimisation ({before} lines, no destructive commands)");
    }
    Ok(())
}
