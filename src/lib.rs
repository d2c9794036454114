//! Single-pass compiler front-end for Lat/Tox, emitting EWVM assembly
//! (SPEC_FULL.md §1). Every public item below composes into the
//! `compile_source`/`compile_file` entry points documented in §6.1; the
//! CLI binary in `src/bin/lattoxc.rs` is a thin consumer, not part of the
//! core.

#[macro_use]
extern crate pest_derive;

pub mod compiler;
pub mod context;
pub mod emitter;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod options;
pub mod scope;
pub mod token;
pub mod typecheck;
pub mod types;

use std::fs;
use std::path::Path;

pub use compiler::CompileOutcome;
pub use error::{CompileError, CompileWarning};
pub use options::CompileOptions;

/// Compiles Lat/Tox source text to EWVM assembly (SPEC_FULL.md §6.1).
///
/// Discards warnings after logging them at `log::Level::Warn`; callers that
/// want to inspect warnings themselves should use [`compile_source_outcome`].
pub fn compile_source(source: &str, options: &CompileOptions) -> Result<String, CompileError> {
    let outcome = compile_source_outcome(source, options)?;
    for warning in &outcome.warnings {
        log::warn!("{warning}");
    }
    Ok(outcome.assembly)
}

/// Compiles Lat/Tox source text, returning both the emitted assembly and
/// every non-fatal warning collected along the way (SPEC_FULL.md §6.1).
/// When `options.warnings_as_errors` is set, the first collected warning is
/// instead escalated into a fatal `CompileError::TypeMismatch`.
pub fn compile_source_outcome(source: &str, options: &CompileOptions) -> Result<CompileOutcome, CompileError> {
    log::debug!("compiling {} bytes of source", source.len());
    let outcome = compiler::compile_program(source)?;
    if options.warnings_as_errors {
        if let Some(first) = outcome.warnings.first() {
            return Err(CompileError::type_mismatch(first.span, first.message.clone()));
        }
    }
    Ok(outcome)
}

/// Reads `path` and compiles its contents (SPEC_FULL.md §6.1).
pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<String, CompileError> {
    let source = fs::read_to_string(path).map_err(|e| {
        CompileError::internal(
            error::Span::new(0, 0),
            format!("could not read '{}': {e}", path.display()),
        )
    })?;
    log::info!("read {} ({} bytes)", path.display(), source.len());
    compile_source(&source, options)
}
