//! CLI driver (SPEC_FULL.md §1: explicitly out of core scope, kept thin).
//! Mirrors the teacher's `src/bin/why.rs`: `clap::Parser` derive for
//! argument handling, `simple_logger` installed once here (library code
//! never initializes a logger, SPEC_FULL.md §1.1), and a `log::error!` +
//! non-zero exit on failure.

extern crate lattox;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as CParser;
use log::error;

use lattox::{compile_file, CompileOptions};

#[derive(CParser, Debug)]
#[command(author, version, about = "Lat/Tox to EWVM assembly compiler")]
struct Cli {
    /// Source file to compile.
    file: PathBuf,

    /// Write assembly here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Parse and type-check only; do not print the emitted assembly.
    #[arg(long)]
    emit_only: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Escalate non-fatal warnings to compile errors.
    #[arg(long)]
    warnings_as_errors: bool,
}

fn main() -> ExitCode {
    let args = Cli::parse();

    let level = match args.verbose {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        _ => log::Level::Debug,
    };
    simple_logger::init_with_level(level).expect("logger can only be installed once");

    let options = CompileOptions {
        warnings_as_errors: args.warnings_as_errors,
        ..CompileOptions::default()
    };

    let assembly = match compile_file(&args.file, &options) {
        Ok(assembly) => assembly,
        Err(err) => {
            error!("{} ({})", err, err.span());
            return ExitCode::FAILURE;
        }
    };

    if args.emit_only {
        return ExitCode::SUCCESS;
    }

    match args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, assembly) {
                error!("could not write '{}': {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
        None => print!("{assembly}"),
    }

    ExitCode::SUCCESS
}
