//! `CompileCtx`: the single mutable value threaded through every reduction
//! (SPEC_FULL.md §9, "Eliminating cross-module global parser state"). The
//! original attaches `current_scope`, `global_count`, `frame_count`,
//! `if_count`, `loop_count`, and handler objects directly onto the PLY
//! `parser` object as mutable attributes; here they are fields of one
//! struct the grammar driver holds `&mut` to. The original's
//! `array_assign_items`/`num_args` counters have no counterpart here: array-
//! literal sizes fall out of the number of expressions this crate already
//! walks, and nested calls fall out of plain recursion, so neither needs a
//! side channel on the context.

use crate::emitter::Emitter;
use crate::error::CompileWarning;
use crate::functions::FunctionTable;
use crate::scope::ScopeStack;
use crate::typecheck::TypeStack;

pub struct CompileCtx {
    pub scopes: ScopeStack,
    pub functions: FunctionTable,
    pub type_stack: TypeStack,
    pub emitter: Emitter,

    /// Next free global slot; grows with global declarations, shrinks on
    /// scope exit (SPEC_FULL.md §3).
    pub global_count: i64,
    /// Next free local slot inside the function currently being emitted.
    pub frame_count: i64,

    pub warnings: Vec<CompileWarning>,
}

impl CompileCtx {
    pub fn new() -> Self {
        CompileCtx {
            scopes: ScopeStack::new(),
            functions: FunctionTable::new(),
            type_stack: TypeStack::new(),
            emitter: Emitter::new(),
            global_count: 0,
            frame_count: 0,
            warnings: Vec::new(),
        }
    }

    pub fn in_function(&self) -> bool {
        self.functions.current.is_some()
    }

    /// Allocates `n` contiguous cells at whichever counter is active
    /// (global scope vs. inside a function body) and returns the
    /// inclusive (lo, hi) range, per SPEC_FULL.md §3's symbol layout rule.
    pub fn alloc_cells(&mut self, n: i64) -> (i64, i64) {
        if self.in_function() {
            let lo = self.frame_count;
            self.frame_count += n;
            (lo, lo + n - 1)
        } else {
            let lo = self.global_count;
            self.global_count += n;
            (lo, lo + n - 1)
        }
    }

    /// `es` companion to `alloc_cells`: shrink whichever counter is active
    /// by `n` cells (scope teardown), and emit `POP n`.
    pub fn end_scope_emit(&mut self) -> String {
        let n = self.scopes.end_scope();
        if self.in_function() {
            self.frame_count -= n;
        } else {
            self.global_count -= n;
        }
        format!("POP {n}\n")
    }

    pub fn start_scope(&mut self) {
        let in_function = self.in_function();
        self.scopes.start_scope(in_function);
    }
}

impl Default for CompileCtx {
    fn default() -> Self {
        Self::new()
    }
}
