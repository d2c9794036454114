//! Shared assertion helpers for `tests/*.rs` (SPEC_FULL.md §1.1), playing
//! the same "dev-dependency-only helper crate" role as the teacher's
//! `test-utils`. The teacher's version shells out to a built `why` binary
//! and a downstream VM; there is no such external VM in this crate's scope
//! (SPEC_FULL.md §1), so these helpers instead drive `lattox::compile_source`
//! directly and assert on the emitted assembly / error taxonomy.

use lattox::{compile_source, CompileError, CompileOptions};

/// Asserts that `source` compiles successfully and emits exactly
/// `expected_assembly` (byte-for-byte, including trailing newlines).
pub fn assert_compiles_to(source: &str, expected_assembly: &str) {
    let options = CompileOptions::default();
    match compile_source(source, &options) {
        Ok(assembly) => assert_eq!(assembly, expected_assembly, "emitted assembly did not match"),
        Err(e) => panic!("expected '{source}' to compile, got error: {e}"),
    }
}

/// Asserts that `source` compiles successfully, without checking the exact
/// emitted text (for scenarios where only incidental details like label
/// counters would make an exact match brittle).
pub fn assert_compiles(source: &str) -> String {
    let options = CompileOptions::default();
    match compile_source(source, &options) {
        Ok(assembly) => assembly,
        Err(e) => panic!("expected '{source}' to compile, got error: {e}"),
    }
}

/// Asserts that `source` fails to compile with a `CompileError` whose
/// `kind_name()` equals `expected_kind` (e.g. `"TypeMismatch"`,
/// `"RedefinedFunction"`), per the error taxonomy in SPEC_FULL.md §7.
pub fn assert_compile_error(source: &str, expected_kind: &str) -> CompileError {
    let options = CompileOptions::default();
    match compile_source(source, &options) {
        Ok(assembly) => panic!("expected '{source}' to fail to compile, got assembly:\n{assembly}"),
        Err(e) => {
            assert_eq!(e.kind_name(), expected_kind, "unexpected error kind: {e}");
            e
        }
    }
}

/// Asserts that the assembly emitted for `source` contains every line in
/// `expected_fragments`, in order (not necessarily contiguous) — useful for
/// checking a specific instruction sequence (e.g. the call protocol) without
/// pinning down the entire program's text.
pub fn assert_contains_in_order(assembly: &str, expected_fragments: &[&str]) {
    let mut rest = assembly;
    for fragment in expected_fragments {
        match rest.find(fragment) {
            Some(idx) => rest = &rest[idx + fragment.len()..],
            None => panic!("expected fragment '{fragment}' not found (in order) in assembly:\n{assembly}"),
        }
    }
}
