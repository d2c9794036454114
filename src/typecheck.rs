//! The type-check operand stack (SPEC_FULL.md §4.4), mirroring the VM's
//! value stack at compile time. Grounded on the original
//! `tox.semantics._type_check.TypeCheck`.

use crate::error::{CompileError, Span, TypeMismatch};
use crate::types::{Prim, Type};

pub struct TypeStack {
    stack: Vec<(Type, usize)>,
}

impl TypeStack {
    pub fn new() -> Self {
        TypeStack { stack: Vec::new() }
    }

    pub fn push(&mut self, ty: Type, line: usize) {
        self.stack.push((ty, line));
    }

    /// Popping an empty stack yields the `None` sentinel rather than
    /// panicking, matching the original's `"None"` return (SPEC_FULL.md §4.4).
    pub fn pop(&mut self) -> Type {
        match self.stack.pop() {
            Some((ty, _)) => ty,
            None => Type::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// A right-aligned slice of the current types, oldest-to-newest, used
    /// by the call-site argument-type check (SPEC_FULL.md §4.5).
    pub fn top_n_types(&self, n: usize) -> Vec<Type> {
        let start = self.stack.len().saturating_sub(n);
        self.stack[start..].iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn truncate(&mut self, new_len: usize) {
        self.stack.truncate(new_len);
    }
}

impl Default for TypeStack {
    fn default() -> Self {
        Self::new()
    }
}

fn mismatch(span: Span, op: &str, left: &Type, right: &Type) -> CompileError {
    CompileError::TypeMismatch(TypeMismatch {
        span,
        message: format!("operation '{op}' not supported for types '{left}' and '{right}'"),
    })
}

fn mismatch1(span: Span, op: &str, operand: &Type) -> CompileError {
    CompileError::TypeMismatch(TypeMismatch {
        span,
        message: format!("operation '{op}' not supported for type '{operand}'"),
    })
}

/// Unary `!`. Accepts integer or float; emits `NOT`.
pub fn not_op(stack: &mut TypeStack, span: Span, line: usize, operand_code: &str) -> Result<String, CompileError> {
    let t = stack.pop();
    match t {
        Type::Primitive(Prim::Integer) | Type::Primitive(Prim::Float) => {
            stack.push(t, line);
            Ok(format!("{operand_code}NOT\n"))
        }
        other => Err(mismatch1(span, "not", &other)),
    }
}

/// Unary `-`.
pub fn neg_op(stack: &mut TypeStack, span: Span, line: usize, operand_code: &str) -> Result<String, CompileError> {
    match stack.pop() {
        Type::Primitive(Prim::Integer) => {
            stack.push(Type::Primitive(Prim::Integer), line);
            Ok(format!("{operand_code}PUSHI -1\nMUL\n"))
        }
        Type::Primitive(Prim::Float) => {
            stack.push(Type::Primitive(Prim::Float), line);
            Ok(format!("{operand_code}PUSHF -1.0\nFMUL\n"))
        }
        other => Err(mismatch1(span, "neg", &other)),
    }
}

enum NumOp {
    Mul,
    Div,
    Mod,
}

fn numeric_binop(
    stack: &mut TypeStack,
    span: Span,
    line: usize,
    left_code: &str,
    right_code: &str,
    op: NumOp,
) -> Result<String, CompileError> {
    let right = stack.pop();
    let left = stack.pop();
    use NumOp::*;
    match (op, &left, &right) {
        (Mul, Type::Primitive(Prim::Integer), Type::Primitive(Prim::Integer)) => {
            stack.push(Type::Primitive(Prim::Integer), line);
            Ok(format!("{left_code}{right_code}MUL\n"))
        }
        (Mul, Type::Primitive(Prim::Float), Type::Primitive(Prim::Float)) => {
            stack.push(Type::Primitive(Prim::Float), line);
            Ok(format!("{left_code}{right_code}FMUL\n"))
        }
        (Div, Type::Primitive(Prim::Integer), Type::Primitive(Prim::Integer)) => {
            stack.push(Type::Primitive(Prim::Integer), line);
            Ok(format!("{left_code}{right_code}DIV\n"))
        }
        (Div, Type::Primitive(Prim::Float), Type::Primitive(Prim::Float)) => {
            stack.push(Type::Primitive(Prim::Float), line);
            Ok(format!("{left_code}{right_code}FDIV\n"))
        }
        (Mod, Type::Primitive(Prim::Integer), Type::Primitive(Prim::Integer)) => {
            stack.push(Type::Primitive(Prim::Integer), line);
            Ok(format!("{left_code}{right_code}MOD\n"))
        }
        (op, left, right) => {
            let name = match op {
                Mul => "mul",
                Div => "div",
                Mod => "mod",
            };
            Err(mismatch(span, name, left, right))
        }
    }
}

pub fn mul_op(stack: &mut TypeStack, span: Span, line: usize, l: &str, r: &str) -> Result<String, CompileError> {
    numeric_binop(stack, span, line, l, r, NumOp::Mul)
}

pub fn div_op(stack: &mut TypeStack, span: Span, line: usize, l: &str, r: &str) -> Result<String, CompileError> {
    numeric_binop(stack, span, line, l, r, NumOp::Div)
}

pub fn mod_op(stack: &mut TypeStack, span: Span, line: usize, l: &str, r: &str) -> Result<String, CompileError> {
    numeric_binop(stack, span, line, l, r, NumOp::Mod)
}

/// `+`. Note the filum case's operand-code swap (SPEC_FULL.md §4.4.1):
/// `right_code` is emitted before `left_code`.
pub fn add_op(stack: &mut TypeStack, span: Span, line: usize, left_code: &str, right_code: &str) -> Result<String, CompileError> {
    let right = stack.pop();
    let left = stack.pop();
    match (&left, &right) {
        (Type::Primitive(Prim::Integer), Type::Primitive(Prim::Integer)) => {
            stack.push(Type::Primitive(Prim::Integer), line);
            Ok(format!("{left_code}{right_code}ADD\n"))
        }
        (Type::Primitive(Prim::Float), Type::Primitive(Prim::Float)) => {
            stack.push(Type::Primitive(Prim::Float), line);
            Ok(format!("{left_code}{right_code}FADD\n"))
        }
        (Type::Pointer(p), Type::Primitive(Prim::Integer)) => {
            stack.push(Type::Pointer(*p), line);
            Ok(format!("{left_code}{right_code}PADD\n"))
        }
        (Type::Primitive(Prim::Filum), Type::Primitive(Prim::Filum)) => {
            stack.push(Type::Primitive(Prim::Filum), line);
            Ok(format!("{right_code}{left_code}CONCAT\n"))
        }
        (left, right) => Err(mismatch(span, "add", left, right)),
    }
}

pub fn sub_op(stack: &mut TypeStack, span: Span, line: usize, left_code: &str, right_code: &str) -> Result<String, CompileError> {
    let right = stack.pop();
    let left = stack.pop();
    match (&left, &right) {
        (Type::Primitive(Prim::Integer), Type::Primitive(Prim::Integer)) => {
            stack.push(Type::Primitive(Prim::Integer), line);
            Ok(format!("{left_code}{right_code}SUB\n"))
        }
        (Type::Pointer(a), Type::Pointer(b)) if a == b => {
            stack.push(Type::Primitive(Prim::Integer), line);
            Ok(format!("{left_code}{right_code}SUB\n"))
        }
        (Type::Primitive(Prim::Float), Type::Primitive(Prim::Float)) => {
            stack.push(Type::Primitive(Prim::Float), line);
            Ok(format!("{left_code}{right_code}FSUB\n"))
        }
        (Type::Pointer(p), Type::Primitive(Prim::Integer)) => {
            stack.push(Type::Pointer(*p), line);
            Ok(format!("{left_code}{right_code}PUSHI -1\nMUL\nPADD\n"))
        }
        (left, right) => Err(mismatch(span, "sub", left, right)),
    }
}

enum RelOp {
    Lt,
    Gt,
    Lte,
    Gte,
}

fn relational(
    stack: &mut TypeStack,
    span: Span,
    line: usize,
    left_code: &str,
    right_code: &str,
    op: RelOp,
) -> Result<String, CompileError> {
    let right = stack.pop();
    let left = stack.pop();
    let (int_op, float_op) = match op {
        RelOp::Lt => ("INF", "FINF"),
        RelOp::Gt => ("SUP", "FSUP"),
        RelOp::Lte => ("INFEQ", "FINFEQ"),
        RelOp::Gte => ("SUPEQ", "FSUPEQ"),
    };
    if left == right && !left.is_filum() && left != Type::Primitive(Prim::Float) {
        stack.push(Type::Primitive(Prim::Integer), line);
        return Ok(format!("{left_code}{right_code}{int_op}\n"));
    }
    if left == Type::Primitive(Prim::Float) && right == Type::Primitive(Prim::Float) {
        stack.push(Type::Primitive(Prim::Integer), line);
        return Ok(format!("{left_code}{right_code}{float_op}\nFTOI\n"));
    }
    let name = match op {
        RelOp::Lt => "lt",
        RelOp::Gt => "gt",
        RelOp::Lte => "lte",
        RelOp::Gte => "gte",
    };
    Err(mismatch(span, name, &left, &right))
}

pub fn lt_op(stack: &mut TypeStack, span: Span, line: usize, l: &str, r: &str) -> Result<String, CompileError> {
    relational(stack, span, line, l, r, RelOp::Lt)
}
pub fn gt_op(stack: &mut TypeStack, span: Span, line: usize, l: &str, r: &str) -> Result<String, CompileError> {
    relational(stack, span, line, l, r, RelOp::Gt)
}
pub fn lte_op(stack: &mut TypeStack, span: Span, line: usize, l: &str, r: &str) -> Result<String, CompileError> {
    relational(stack, span, line, l, r, RelOp::Lte)
}
pub fn gte_op(stack: &mut TypeStack, span: Span, line: usize, l: &str, r: &str) -> Result<String, CompileError> {
    relational(stack, span, line, l, r, RelOp::Gte)
}

fn equality(stack: &mut TypeStack, span: Span, line: usize, left_code: &str, right_code: &str, negate: bool) -> Result<String, CompileError> {
    let right = stack.pop();
    let left = stack.pop();
    if left == right && !left.is_filum() {
        stack.push(Type::Primitive(Prim::Integer), line);
        let tail = if negate { "EQUAL\nNOT\n" } else { "EQUAL\n" };
        return Ok(format!("{left_code}{right_code}{tail}"));
    }
    Err(mismatch(span, if negate { "neq" } else { "eq" }, &left, &right))
}

pub fn eq_op(stack: &mut TypeStack, span: Span, line: usize, l: &str, r: &str) -> Result<String, CompileError> {
    equality(stack, span, line, l, r, false)
}
pub fn neq_op(stack: &mut TypeStack, span: Span, line: usize, l: &str, r: &str) -> Result<String, CompileError> {
    equality(stack, span, line, l, r, true)
}

fn logical(stack: &mut TypeStack, span: Span, line: usize, left_code: &str, right_code: &str, op: &str) -> Result<String, CompileError> {
    let right = stack.pop();
    let left = stack.pop();
    if left == Type::Primitive(Prim::Integer) && right == Type::Primitive(Prim::Integer) {
        stack.push(Type::Primitive(Prim::Integer), line);
        return Ok(format!("{left_code}{right_code}{op}\n"));
    }
    Err(mismatch(span, &op.to_lowercase(), &left, &right))
}

pub fn and_op(stack: &mut TypeStack, span: Span, line: usize, l: &str, r: &str) -> Result<String, CompileError> {
    logical(stack, span, line, l, r, "AND")
}
pub fn or_op(stack: &mut TypeStack, span: Span, line: usize, l: &str, r: &str) -> Result<String, CompileError> {
    logical(stack, span, line, l, r, "OR")
}

/// `(T) expr` cast (SPEC_FULL.md §4.4.1, §9.1 item 4/5). Identity casts
/// emit no opcode.
pub fn cast_op(stack: &mut TypeStack, line: usize, target: Prim, operand_code: &str) -> String {
    let expr_type = stack.pop();
    if expr_type == Type::Primitive(target) {
        stack.push(expr_type, line);
        return operand_code.to_string();
    }
    let source = expr_type.as_primitive().unwrap_or(target);
    let opcode = format!("{}{}O{}", source.cast_source_prefix(), "T", target.cast_target_suffix());
    stack.push(Type::Primitive(target), line);
    format!("{operand_code}{opcode}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> Span {
        Span::new(1, 1)
    }

    #[test]
    fn integer_addition_emits_add() {
        let mut stack = TypeStack::new();
        stack.push(Type::Primitive(Prim::Integer), 1);
        stack.push(Type::Primitive(Prim::Integer), 1);
        let code = add_op(&mut stack, sp(), 1, "PUSHI 2\n", "PUSHI 3\n").unwrap();
        assert_eq!(code, "PUSHI 2\nPUSHI 3\nADD\n");
        assert_eq!(stack.pop(), Type::Primitive(Prim::Integer));
    }

    #[test]
    fn filum_concat_swaps_operand_code_order() {
        let mut stack = TypeStack::new();
        stack.push(Type::Primitive(Prim::Filum), 1);
        stack.push(Type::Primitive(Prim::Filum), 1);
        let code = add_op(&mut stack, sp(), 1, "PUSHS \"a\"\n", "PUSHS \"b\"\n").unwrap();
        assert_eq!(code, "PUSHS \"b\"\nPUSHS \"a\"\nCONCAT\n");
    }

    #[test]
    fn float_comparison_adds_ftoi() {
        let mut stack = TypeStack::new();
        stack.push(Type::Primitive(Prim::Float), 1);
        stack.push(Type::Primitive(Prim::Float), 1);
        let code = lt_op(&mut stack, sp(), 1, "", "").unwrap();
        assert_eq!(code, "FINF\nFTOI\n");
        assert_eq!(stack.pop(), Type::Primitive(Prim::Integer));
    }

    #[test]
    fn pointer_plus_int_stays_pointer() {
        let mut stack = TypeStack::new();
        stack.push(Type::Pointer(Prim::Integer), 1);
        stack.push(Type::Primitive(Prim::Integer), 1);
        add_op(&mut stack, sp(), 1, "", "").unwrap();
        assert_eq!(stack.pop(), Type::Pointer(Prim::Integer));
    }

    #[test]
    fn mismatched_types_are_rejected() {
        let mut stack = TypeStack::new();
        stack.push(Type::Primitive(Prim::Integer), 1);
        stack.push(Type::Primitive(Prim::Filum), 1);
        assert!(add_op(&mut stack, sp(), 1, "", "").is_err());
    }

    #[test]
    fn pop_on_empty_is_none_sentinel() {
        let mut stack = TypeStack::new();
        assert_eq!(stack.pop(), Type::None);
    }

    #[test]
    fn identity_cast_emits_nothing() {
        let mut stack = TypeStack::new();
        stack.push(Type::Primitive(Prim::Integer), 1);
        let code = cast_op(&mut stack, 1, Prim::Integer, "PUSHI 1\n");
        assert_eq!(code, "PUSHI 1\n");
    }

    #[test]
    fn int_to_filum_cast_uses_documented_itos() {
        let mut stack = TypeStack::new();
        stack.push(Type::Primitive(Prim::Integer), 1);
        let code = cast_op(&mut stack, 1, Prim::Filum, "PUSHI 1\n");
        assert_eq!(code, "PUSHI 1\nITOS\n");
    }
}
