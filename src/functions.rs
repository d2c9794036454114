//! Function table and call protocol (SPEC_FULL.md §4.5), grounded on the
//! original `lat.semantics._functions.Functions`/`FunctionData`.

use std::collections::HashMap;

use crate::error::{ArityMismatch, CompileError, RedefinedFunction, Span};
use crate::types::Type;

#[derive(Debug, Clone)]
pub struct FunctionData {
    pub name: String,
    pub input_types: Vec<Type>,
    pub output_type: Option<Type>,
}

/// The return-slot placeholder the caller pushes before argument code when
/// the callee has an output type (SPEC_FULL.md §4.5.1). Named per the
/// original's literal sentinel value.
pub const RETURN_SLOT_PLACEHOLDER: &str = "PUSHI -69";

#[derive(Default)]
pub struct FunctionTable {
    table: HashMap<String, FunctionData>,
    pub current: Option<String>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, span: Span, name: &str) -> Result<(), CompileError> {
        if self.table.contains_key(name) {
            return Err(CompileError::RedefinedFunction(RedefinedFunction {
                span,
                name: name.to_string(),
            }));
        }
        self.table.insert(
            name.to_string(),
            FunctionData {
                name: name.to_string(),
                input_types: Vec::new(),
                output_type: None,
            },
        );
        self.current = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionData> {
        self.table.get(name)
    }

    pub fn current_mut(&mut self) -> Option<&mut FunctionData> {
        let name = self.current.clone()?;
        self.table.get_mut(&name)
    }

    pub fn close_current(&mut self) {
        self.current = None;
    }

    pub fn has(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn check_arity(&self, span: Span, name: &str, found: usize) -> Result<(), CompileError> {
        let f = self.get(name).expect("checked has() before check_arity");
        if f.input_types.len() != found {
            return Err(CompileError::ArityMismatch(ArityMismatch {
                span,
                name: name.to_string(),
                expected: f.input_types.len(),
                found,
            }));
        }
        Ok(())
    }
}

/// Underscore-stripping name munging used for both the function's label
/// definition and every call-site reference (SPEC_FULL.md §4.5.1): chosen
/// by the original for VM label compatibility.
pub fn munge(name: &str) -> String {
    name.chars().filter(|c| *c != '_').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn munging_strips_underscores() {
        assert_eq!(munge("my_func"), "myfunc");
        assert_eq!(munge("main"), "main");
    }

    #[test]
    fn redefinition_is_rejected() {
        let mut table = FunctionTable::new();
        table.declare(Span::new(1, 1), "f").unwrap();
        table.close_current();
        assert!(table.declare(Span::new(2, 1), "f").is_err());
    }

    #[test]
    fn arity_mismatch_detected() {
        let mut table = FunctionTable::new();
        table.declare(Span::new(1, 1), "f").unwrap();
        table.current_mut().unwrap().input_types.push(Type::Primitive(crate::types::Prim::Integer));
        table.close_current();
        assert!(table.check_arity(Span::new(2, 1), "f", 0).is_err());
        assert!(table.check_arity(Span::new(2, 1), "f", 1).is_ok());
    }
}
