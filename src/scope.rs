//! The lexical scope stack (SPEC_FULL.md §4.3), grounded on the original
//! `lat.semantics._scopes.Scope`/`MetaData`, re-architected per §9 as a
//! stack of owned records indexed by integer rather than `parent: Option<Scope>`
//! reference cycles (the teacher's `typechecker::scope::Scope` keeps its
//! frames as a flat `Vec<StackFrame>`, which this mirrors).

use std::collections::HashMap;

use crate::error::{CompileError, RedeclaredIdentifier, Span};
use crate::types::Type;

/// Symbol metadata (`MetaData` in the original).
#[derive(Debug, Clone)]
pub struct MetaData {
    pub ty: Type,
    /// Inclusive (lo, hi) stack-cell range this symbol occupies.
    pub stack_position: (i64, i64),
    pub array_shape: Option<Vec<usize>>,
    /// False only for a declared-but-not-yet-assigned pointer.
    pub initialized: bool,
}

impl MetaData {
    pub fn size_in_cells(&self) -> i64 {
        self.stack_position.1 - self.stack_position.0 + 1
    }
}

/// One lexical scope. Parent linkage is an index into `ScopeStack::frames`,
/// never a reference, so frames can be a plain `Vec` (§9: "Cyclic scope
/// parents").
#[derive(Debug)]
pub struct Scope {
    pub name: String,
    pub level: usize,
    pub parent: Option<usize>,
    pub in_function: bool,
    pub table: HashMap<String, MetaData>,
}

impl Scope {
    fn root() -> Self {
        Scope {
            name: "GLOBAL".to_string(),
            level: 0,
            parent: None,
            in_function: false,
            table: HashMap::new(),
        }
    }

    pub fn num_cells(&self) -> i64 {
        self.table.values().map(MetaData::size_in_cells).sum()
    }
}

/// The result of a symbol lookup: the metadata (if found), whether the
/// owning scope is inside a function body, and the owning scope's name —
/// matching the original's `Scope.get` which returns `(MetaData | None,
/// in_function, scope_name)` even on a total miss (in which case the root
/// scope's `in_function`/`name` are reported).
pub struct Lookup<'a> {
    pub meta: Option<&'a MetaData>,
    pub in_function: bool,
    pub owner: String,
}

/// Owns every scope ever created during a compile, addressed by index so
/// a `Scope` never needs to borrow or `Rc` its parent.
pub struct ScopeStack {
    frames: Vec<Scope>,
    current: usize,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![Scope::root()],
            current: 0,
        }
    }

    pub fn current(&self) -> &Scope {
        &self.frames[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Scope {
        &mut self.frames[self.current]
    }

    pub fn depth(&self) -> usize {
        self.current().level
    }

    /// `ss` — pushes a child scope. `in_function` is inherited from whether
    /// a function is currently being emitted (passed in by the caller,
    /// which is `CompileCtx::current_function.is_some()`).
    pub fn start_scope(&mut self, in_function: bool) {
        let parent = self.current;
        let level = self.current().level + 1;
        let name = format!("SCOPE_{level}");
        self.frames.push(Scope {
            name,
            level,
            parent: Some(parent),
            in_function,
            table: HashMap::new(),
        });
        self.current = self.frames.len() - 1;
    }

    /// `es` — pops the current scope, returning the number of cells it
    /// allocated (for the caller to emit `POP n` and adjust
    /// `frame_count`/`global_count`).
    pub fn end_scope(&mut self) -> i64 {
        let n = self.current().num_cells();
        let parent = self
            .current()
            .parent
            .expect("end_scope called with no parent (unbalanced ss/es)");
        self.current = parent;
        n
    }

    /// Insert `name` into the *current* scope only. Errors if the name
    /// already exists in this scope (shadowing in nested scopes is fine).
    pub fn declare(
        &mut self,
        span: Span,
        name: &str,
        ty: Type,
        stack_position: (i64, i64),
        array_shape: Option<Vec<usize>>,
        initialized: bool,
    ) -> Result<(), CompileError> {
        if self.current().table.contains_key(name) {
            return Err(CompileError::RedeclaredIdentifier(RedeclaredIdentifier {
                span,
                name: name.to_string(),
            }));
        }
        self.current_mut().table.insert(
            name.to_string(),
            MetaData {
                ty,
                stack_position,
                array_shape,
                initialized,
            },
        );
        Ok(())
    }

    /// Walk from the current scope outward to the root, returning the
    /// first match.
    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        let mut idx = self.current;
        loop {
            let scope = &self.frames[idx];
            if let Some(meta) = scope.table.get(name) {
                return Lookup {
                    meta: Some(meta),
                    in_function: scope.in_function,
                    owner: scope.name.clone(),
                };
            }
            match scope.parent {
                Some(p) => idx = p,
                None => {
                    return Lookup {
                        meta: None,
                        in_function: scope.in_function,
                        owner: scope.name.clone(),
                    }
                }
            }
        }
    }

    pub fn mark_initialized(&mut self, name: &str) {
        // Mutation only ever targets the scope the variable was actually
        // found in, which may not be `current`; walk the same chain as
        // `lookup` but mutably.
        let mut idx = self.current;
        loop {
            if self.frames[idx].table.contains_key(name) {
                self.frames[idx].table.get_mut(name).unwrap().initialized = true;
                return;
            }
            match self.frames[idx].parent {
                Some(p) => idx = p,
                None => return,
            }
        }
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        Span::new(1, 1)
    }

    #[test]
    fn root_scope_is_level_zero_global() {
        let stack = ScopeStack::new();
        assert_eq!(stack.current().level, 0);
        assert!(!stack.current().in_function);
    }

    #[test]
    fn shadowing_allowed_in_nested_scope_only() {
        let mut stack = ScopeStack::new();
        stack
            .declare(dummy_span(), "x", Type::Primitive(crate::types::Prim::Integer), (0, 0), None, true)
            .unwrap();
        assert!(stack
            .declare(dummy_span(), "x", Type::Primitive(crate::types::Prim::Integer), (1, 1), None, true)
            .is_err());

        stack.start_scope(false);
        assert!(stack
            .declare(dummy_span(), "x", Type::Primitive(crate::types::Prim::Float), (0, 0), None, true)
            .is_ok());
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let mut stack = ScopeStack::new();
        stack
            .declare(dummy_span(), "g", Type::Primitive(crate::types::Prim::Integer), (0, 0), None, true)
            .unwrap();
        stack.start_scope(true);
        let found = stack.lookup("g");
        assert!(found.meta.is_some());
    }

    #[test]
    fn end_scope_reports_allocated_cells() {
        let mut stack = ScopeStack::new();
        stack.start_scope(true);
        stack
            .declare(dummy_span(), "a", Type::Primitive(crate::types::Prim::Integer), (0, 0), None, true)
            .unwrap();
        stack
            .declare(dummy_span(), "b", Type::Vector(crate::types::Prim::Integer, 3), (1, 3), None, true)
            .unwrap();
        assert_eq!(stack.end_scope(), 4);
        assert_eq!(stack.current().level, 0);
    }
}
