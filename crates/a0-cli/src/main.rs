//! `a0`: a small host harness around the `a0-*` crates. Argument parsing,
//! file I/O, and process exit codes live here; none of it is part of the
//! language's specified core.

use a0_policy::Policy;
use a0_runtime::{default_tool_registry, run_source, JsonlSink, RunOutcome, Tracer};
use clap::{Parser, Subcommand};
use std::fs;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "a0", about = "Run and format A0 programs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an A0 program.
    Run {
        file: PathBuf,
        /// JSON policy document; omit to deny every capability.
        #[arg(long)]
        policy: Option<PathBuf>,
        /// Grant every capability a program declares, bypassing `--policy`.
        #[arg(long)]
        dev_unsafe: bool,
        /// Write the trace event stream to this file as JSONL.
        #[arg(long)]
        trace: Option<PathBuf>,
        /// Render diagnostics and the result as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Print the canonical formatting of an A0 program.
    Fmt { file: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            file,
            policy,
            dev_unsafe,
            trace,
            json,
        } => run_command(file, policy, dev_unsafe, trace, json),
        Command::Fmt { file } => fmt_command(file),
    }
}

fn run_command(file: PathBuf, policy_path: Option<PathBuf>, dev_unsafe: bool, trace: Option<PathBuf>, json: bool) -> ExitCode {
    let source = match fs::read_to_string(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {e}", file.display());
            return ExitCode::from(4);
        }
    };

    let program_for_caps = a0_syntax::parse_source(&file.to_string_lossy(), &source).ok();
    let policy = if dev_unsafe {
        let caps: Vec<&str> = program_for_caps
            .as_ref()
            .map(|p| {
                p.headers
                    .iter()
                    .flat_map(|h| match h {
                        a0_syntax::Header::CapDecl { keys, .. } => keys.iter().map(String::as_str).collect(),
                        _ => Vec::new(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Policy::allow_all(&caps)
    } else if let Some(path) = policy_path {
        match fs::read_to_string(&path).map_err(|e| e.to_string()).and_then(|s| Policy::from_json(&s).map_err(|e| e.to_string())) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("error: could not load policy {}: {e}", path.display());
                return ExitCode::from(4);
            }
        }
    } else {
        Policy::empty()
    };

    let tools = default_tool_registry();
    let tracer = match &trace {
        Some(path) => match File::create(path) {
            Ok(f) => Tracer::new(Box::new(JsonlSink::new(f))),
            Err(e) => {
                eprintln!("error: could not open trace file {}: {e}", path.display());
                return ExitCode::from(4);
            }
        },
        None => Tracer::null(),
    };
    let (outcome, _tracer) = run_source(&file.to_string_lossy(), &source, &tools, &policy, tracer);

    render_outcome(&outcome, json);
    ExitCode::from(outcome.exit_code() as u8)
}

fn render_outcome(outcome: &RunOutcome, json: bool) {
    match outcome {
        RunOutcome::Success { value } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&a0_core::json::value_to_json(value)).unwrap());
            } else {
                println!("{value}");
            }
        }
        RunOutcome::SuccessWithFailedChecks { value, checks_failed } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&a0_core::json::value_to_json(value)).unwrap());
            } else {
                println!("{value}");
            }
            for failure in checks_failed {
                eprintln!("check failed: {}", failure.message);
            }
        }
        RunOutcome::Failure(err) => {
            if json {
                eprintln!("{}", serde_json::to_string_pretty(err).unwrap());
            } else {
                let span = err
                    .span
                    .as_ref()
                    .map(|s| format!(" {s}"))
                    .unwrap_or_default();
                eprintln!("── {}{span} ──\n\n{}", err.code.category(), err.message);
            }
        }
    }
}

fn fmt_command(file: PathBuf) -> ExitCode {
    let source = match fs::read_to_string(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {e}", file.display());
            return ExitCode::from(4);
        }
    };
    match a0_syntax::parse_source(&file.to_string_lossy(), &source) {
        Ok(program) => {
            print!("{}", a0_fmt::format_program(&program));
            ExitCode::from(0)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
