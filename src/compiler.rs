//! The grammar-driven reduction driver (SPEC_FULL.md §4.2) together with
//! every statement and expression action (§4.6, §4.2's precedence chain).
//!
//! `LatToxParser` only recognizes syntax shape (see `lattox.pest`); every
//! function below walks the resulting `Pairs<Rule>` tree once and, for
//! each node, both validates semantics (scope/type-check/function-table
//! consultation) and appends a code fragment — there is no separate AST
//! struct, matching SPEC_FULL.md §1's "no separate AST pass". Dispatch is
//! a `match` over the `Rule` enum pest generates: the static, exhaustive
//! replacement for the original's dictionary-of-bound-methods dispatch
//! (SPEC_FULL.md §9).

use pest::iterators::Pair;
use pest::Parser;

use crate::context::CompileCtx;
use crate::emitter::LoopKind;
use crate::error::{
    ArityMismatch, CompileError, CompileWarning, IllegalBreakContinue, IllegalIndexing, MissingMain, RedefinedFunction,
    Span, SyntaxError, UninitializedPointer,
};
use crate::functions::{munge, RETURN_SLOT_PLACEHOLDER};
use crate::lexer::canonicalize_float;
use crate::token::{Token, TokenKind};
use crate::typecheck;
use crate::types::{Prim, Type};

#[derive(pest_derive::Parser)]
#[grammar = "lattox.pest"]
struct LatToxParser;

/// The complete result of a compile: emitted assembly plus any non-fatal
/// warnings collected along the way (SPEC_FULL.md §6.1).
pub struct CompileOutcome {
    pub assembly: String,
    pub warnings: Vec<CompileWarning>,
}

fn span_of(pair: &Pair<Rule>) -> Span {
    let (line, column) = pair.as_span().start_pos().line_col();
    Span::new(line, column)
}

fn syntax_error_from_pest(err: pest::error::Error<Rule>) -> CompileError {
    let (line, column) = match err.line_col {
        pest::error::LineColLocation::Pos((l, c)) => (l, c),
        pest::error::LineColLocation::Span((l, c), _) => (l, c),
    };
    CompileError::Syntax(SyntaxError {
        span: Span::new(line, column),
        message: err.to_string(),
    })
}

/// Entry point: parses and compiles a full Lat/Tox program
/// (SPEC_FULL.md §6.1's `compile_source`/`compile_file` contract).
pub fn compile_program(source: &str) -> Result<CompileOutcome, CompileError> {
    let mut pairs = LatToxParser::parse(Rule::program, source).map_err(syntax_error_from_pest)?;
    let program_pair = pairs.next().expect("Rule::program always produces exactly one pair");
    let mut ctx = CompileCtx::new();

    let mut globals_code = String::new();
    let mut functions_code = String::new();

    for item in program_pair.into_inner() {
        match item.as_rule() {
            Rule::EOI => {}
            Rule::global_item => {
                let matched = item.into_inner().next().expect("global_item always wraps one alternative");
                match matched.as_rule() {
                    Rule::function_decl => functions_code.push_str(&compile_function_decl(matched, &mut ctx)?),
                    Rule::array_declaration_stmt => {
                        globals_code.push_str(&compile_array_declaration_stmt(matched, &mut ctx)?)
                    }
                    Rule::decl_assign_stmt => globals_code.push_str(&compile_decl_assign_stmt(matched, &mut ctx)?),
                    Rule::declaration_stmt => globals_code.push_str(&compile_declaration_stmt(matched, &mut ctx)?),
                    other => unreachable!("unexpected global item rule {other:?}"),
                }
            }
            other => unreachable!("unexpected top-level rule {other:?}"),
        }
    }

    if !ctx.functions.has("main") {
        return Err(CompileError::MissingMain(MissingMain { span: Span::new(0, 0) }));
    }

    let assembly = format!("{globals_code}start\nPUSHA main\nCALL\nstop\n{functions_code}");
    Ok(CompileOutcome {
        assembly,
        warnings: ctx.warnings,
    })
}

// ---------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------

fn scalar_prim(pair: &Pair<Rule>) -> Prim {
    match pair.as_str() {
        "integer" => Prim::Integer,
        "float" => Prim::Float,
        "filum" => Prim::Filum,
        other => unreachable!("scalar_type matched unexpected lexeme '{other}'"),
    }
}

fn type_name_to_type(pair: Pair<Rule>) -> Type {
    match pair.as_rule() {
        Rule::type_name => {
            let inner = pair.into_inner().next().expect("type_name always wraps one alternative");
            type_name_to_type(inner)
        }
        Rule::pointer_type => {
            let scalar = pair.into_inner().next().expect("pointer_type always wraps a scalar_type");
            Type::Pointer(scalar_prim(&scalar))
        }
        Rule::scalar_type => Type::Primitive(scalar_prim(&pair)),
        other => unreachable!("type_name_to_type called on unexpected rule {other:?}"),
    }
}

fn vec_type_to_prim(pair: Pair<Rule>) -> Prim {
    let scalar = pair.into_inner().next().expect("vec_type always wraps a scalar_type");
    scalar_prim(&scalar)
}

fn literal_integer_value(pair: Pair<Rule>) -> Result<i64, CompileError> {
    let span = span_of(&pair);
    fn find(p: Pair<Rule>) -> Option<Pair<Rule>> {
        if p.as_rule() == Rule::integer_lit {
            return Some(p);
        }
        p.into_inner().find_map(find)
    }
    let lit = find(pair).ok_or_else(|| CompileError::type_mismatch(span, "array range bounds must be literal integers"))?;
    lit.as_str()
        .parse::<i64>()
        .map_err(|_| CompileError::internal(span, "invalid integer literal"))
}

// ---------------------------------------------------------------------
// Functions (SPEC_FULL.md §4.5)
// ---------------------------------------------------------------------

fn compile_function_decl(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().expect("function_decl always has a name").as_str().to_string();

    ctx.functions.declare(span, &name)?;
    ctx.frame_count = 0;
    ctx.start_scope();

    let mut next = inner.next();
    let mut params_code = String::new();
    let mut param_count: i64 = 0;

    if let Some(p) = next.clone() {
        if p.as_rule() == Rule::param_list {
            for param_pair in p.into_inner() {
                param_count += 1;
                let mut pi = param_pair.into_inner();
                let pname = pi.next().expect("param always has a name").as_str().to_string();
                let pty_pair = pi.next().expect("param always has a type");
                let pty = type_name_to_type(pty_pair);
                ctx.scopes
                    .declare(span, &pname, pty.clone(), (param_count - 1, param_count - 1), None, true)?;
                ctx.frame_count += 1;
                ctx.functions
                    .current_mut()
                    .expect("current function set above")
                    .input_types
                    .push(pty);
                params_code.push_str(&format!(
                    "PUSHI 0\nPUSHFP\nLOAD -{param_count}\nSTOREL {}\n",
                    param_count - 1
                ));
            }
            next = inner.next();
        }
    }

    let mut output_type: Option<Type> = None;
    if let Some(p) = next.clone() {
        if p.as_rule() == Rule::out_type {
            let ty_pair = p.into_inner().next().expect("out_type always wraps a type_name");
            let ty = type_name_to_type(ty_pair);
            output_type = Some(ty.clone());
            ctx.functions.current_mut().expect("current function set above").output_type = Some(ty);
            next = inner.next();
        }
    }

    let block_pair = next.expect("function_decl always ends with a block");
    let body_code = compile_stmts_in_current_scope(block_pair, ctx)?;
    let es_code = ctx.end_scope_emit();

    let mut full_body = format!("{params_code}{body_code}{es_code}");
    if !full_body.ends_with("RETURN\n") {
        if output_type.is_some() {
            ctx.warnings.push(CompileWarning {
                span,
                message: format!("function '{name}' may fall off the end without a return"),
            });
        }
        full_body.push_str("RETURN\n");
    }

    ctx.functions.close_current();
    ctx.frame_count = 0;

    Ok(format!("{}:\n{full_body}", munge(&name)))
}

fn compile_stmts_in_current_scope(block: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let mut code = String::new();
    for stmt in block.into_inner() {
        code.push_str(&compile_stmt(stmt, ctx)?);
    }
    Ok(code)
}

fn compile_block_open(block: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    ctx.start_scope();
    compile_stmts_in_current_scope(block, ctx)
}

fn compile_block(block: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let body = compile_block_open(block, ctx)?;
    Ok(format!("{body}{}", ctx.end_scope_emit()))
}

// ---------------------------------------------------------------------
// Statements (SPEC_FULL.md §4.6)
// ---------------------------------------------------------------------

fn compile_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let inner = pair.into_inner().next().expect("stmt always wraps one alternative");
    match inner.as_rule() {
        Rule::if_stmt => compile_if_stmt_top(inner, ctx),
        Rule::while_stmt => compile_while_stmt(inner, ctx),
        Rule::do_while_stmt => compile_do_while_stmt(inner, ctx),
        Rule::for_stmt => compile_for_stmt(inner, ctx),
        Rule::match_stmt => compile_match_stmt(inner, ctx),
        Rule::break_stmt => compile_break_stmt(inner, ctx),
        Rule::continue_stmt => compile_continue_stmt(inner, ctx),
        Rule::return_stmt => compile_return_stmt(inner, ctx),
        Rule::print_stmt => compile_print_stmt(inner, ctx),
        Rule::array_declaration_stmt => compile_array_declaration_stmt(inner, ctx),
        Rule::decl_assign_stmt => compile_decl_assign_stmt(inner, ctx),
        Rule::declaration_stmt => compile_declaration_stmt(inner, ctx),
        Rule::indexed_assign_stmt => compile_indexed_assign_stmt(inner, ctx),
        Rule::assign_stmt => compile_assign_stmt(inner, ctx),
        Rule::expr_stmt => compile_expr_stmt(inner, ctx),
        other => unreachable!("stmt matched unexpected rule {other:?}"),
    }
}

fn compile_declaration_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().expect("declaration_stmt always has a name").as_str().to_string();
    let ty = type_name_to_type(inner.next().expect("declaration_stmt always has a type"));
    let (lo, hi) = ctx.alloc_cells(1);

    match &ty {
        Type::Primitive(p) => {
            let code = match p {
                Prim::Integer => "PUSHI 0\n",
                Prim::Float => "PUSHF 0.0\n",
                Prim::Filum => "PUSHS \"\"\n",
            }
            .to_string();
            ctx.scopes.declare(span, &name, ty, (lo, hi), None, true)?;
            Ok(code)
        }
        Type::Pointer(_) => {
            let push_op = if ctx.in_function() { "PUSHFP" } else { "PUSHGP" };
            let code = format!("{push_op}\nPUSHI {lo}\nPADD\n");
            ctx.scopes.declare(span, &name, ty, (lo, hi), None, false)?;
            Ok(code)
        }
        Type::Vector(..) | Type::None => unreachable!("declaration_stmt's grammar cannot produce this type"),
    }
}

fn compile_array_declaration_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .expect("array_declaration_stmt always has a name")
        .as_str()
        .to_string();
    let prim = vec_type_to_prim(inner.next().expect("array_declaration_stmt always has a vec_type"));
    let size_pair = inner.next().expect("array_declaration_stmt always has a size");
    let n: usize = size_pair
        .as_str()
        .parse()
        .map_err(|_| CompileError::internal(span, "invalid array size literal"))?;

    let (lo, hi) = ctx.alloc_cells(n as i64);
    let code = match prim {
        Prim::Integer => format!("PUSHN {n}\n"),
        Prim::Float => "PUSHF 0.0\n".repeat(n),
        Prim::Filum => "PUSHS \"\"\n".repeat(n),
    };
    ctx.scopes.declare(span, &name, Type::Vector(prim, n), (lo, hi), Some(vec![n]), true)?;
    Ok(code)
}

fn compile_decl_assign_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().expect("decl_assign_stmt always has a name").as_str().to_string();
    let ty_pair = inner.next().expect("decl_assign_stmt always has a declared type");
    let init_pair = inner.next().expect("decl_assign_stmt always has an initializer");
    let init_inner = init_pair.into_inner().next().expect("init_expr always wraps one alternative");

    match init_inner.as_rule() {
        Rule::array_literal => {
            let prim = require_vec_type(ty_pair, span)?;
            let mut code = String::new();
            let mut n = 0usize;
            for expr in init_inner.into_inner() {
                let expr_code = compile_expression(expr, ctx)?;
                let expr_ty = ctx.type_stack.pop();
                if expr_ty != Type::Primitive(prim) {
                    return Err(CompileError::type_mismatch(
                        span,
                        format!("array element of type '{expr_ty}' does not match declared element type '{prim}'"),
                    ));
                }
                code.push_str(&expr_code);
                n += 1;
            }
            let (lo, hi) = ctx.alloc_cells(n as i64);
            ctx.scopes.declare(span, &name, Type::Vector(prim, n), (lo, hi), Some(vec![n]), true)?;
            Ok(code)
        }
        Rule::array_range => {
            let prim = require_vec_type(ty_pair, span)?;
            if prim != Prim::Integer {
                return Err(CompileError::type_mismatch(span, "array range initializers are only defined for vec<integer>"));
            }
            let mut bounds = init_inner.into_inner();
            let a = literal_integer_value(bounds.next().expect("array_range has a lower bound"))?;
            let b = literal_integer_value(bounds.next().expect("array_range has an upper bound"))?;
            if b < a {
                return Err(CompileError::type_mismatch(span, format!("array range [{a}...{b}] is empty or descending")));
            }
            let n = (b - a + 1) as usize;
            // SPEC_FULL.md §4.6.1: emit the PUSHI sequence unconditionally,
            // both at global and local scope (fixing the original's
            // global-scope-only omission).
            let mut code = String::new();
            for i in a..=b {
                code.push_str(&format!("PUSHI {i}\n"));
            }
            let (lo, hi) = ctx.alloc_cells(n as i64);
            ctx.scopes.declare(span, &name, Type::Vector(prim, n), (lo, hi), Some(vec![n]), true)?;
            Ok(code)
        }
        Rule::expression => {
            let target_ty = type_name_to_type(ty_pair);
            let expr_code = compile_expression(init_inner, ctx)?;
            let expr_ty = ctx.type_stack.pop();
            if !assignable(&target_ty, &expr_ty) {
                return Err(CompileError::type_mismatch(
                    span,
                    format!("cannot initialize '{name}' of type '{target_ty}' with expression of type '{expr_ty}'"),
                ));
            }
            let (lo, hi) = ctx.alloc_cells(1);
            ctx.scopes.declare(span, &name, target_ty, (lo, hi), None, true)?;
            Ok(expr_code)
        }
        other => unreachable!("init_expr matched unexpected rule {other:?}"),
    }
}

fn require_vec_type(ty_pair: Pair<Rule>, span: Span) -> Result<Prim, CompileError> {
    match ty_pair.as_rule() {
        Rule::vec_type => Ok(vec_type_to_prim(ty_pair)),
        _ => Err(CompileError::internal(span, "array initializer requires a vec<T> declared type")),
    }
}

/// `x: &T = expr` accepts `expr: &T` or `expr: vec<T>` (decay); every
/// other target requires an exact structural match (SPEC_FULL.md §4.6).
fn assignable(target: &Type, value: &Type) -> bool {
    match target {
        Type::Pointer(p) => value == target || matches!(value, Type::Vector(q, _) if q == p),
        other => other == value,
    }
}

fn compile_assign_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().expect("assign_stmt always has a name").as_str().to_string();
    let expr_pair = inner.next().expect("assign_stmt always has a value expression");
    compile_plain_assign(&name, expr_pair, ctx, span)
}

fn compile_plain_assign(name: &str, expr_pair: Pair<Rule>, ctx: &mut CompileCtx, span: Span) -> Result<String, CompileError> {
    let lookup = ctx.scopes.lookup(name);
    let meta = lookup.meta.cloned().ok_or_else(|| CompileError::undeclared(span, name.to_string()))?;
    let in_function = lookup.in_function;

    if matches!(meta.ty, Type::Vector(..)) {
        return Err(CompileError::type_mismatch(span, "assignment to an array is not allowed; use indexing instead"));
    }

    let expr_code = compile_expression(expr_pair, ctx)?;
    let expr_ty = ctx.type_stack.pop();
    if !assignable(&meta.ty, &expr_ty) {
        return Err(CompileError::type_mismatch(
            span,
            format!("cannot assign value of type '{expr_ty}' to variable of type '{}'", meta.ty),
        ));
    }
    if matches!(meta.ty, Type::Pointer(_)) {
        ctx.scopes.mark_initialized(name);
    }

    let store_op = if in_function { "STOREL" } else { "STOREG" };
    Ok(format!("{expr_code}{store_op} {}\n", meta.stack_position.0))
}

fn compile_indexed_assign_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().expect("indexed_assign_stmt always has a name").as_str().to_string();
    let index_pair = inner.next().expect("indexed_assign_stmt always has an index");
    let value_pair = inner.next().expect("indexed_assign_stmt always has a value");

    let lookup = ctx.scopes.lookup(&name);
    let meta = lookup.meta.cloned().ok_or_else(|| CompileError::undeclared(span, name.clone()))?;
    let in_function = lookup.in_function;
    let push_op = if in_function { "PUSHFP" } else { "PUSHGP" };

    let index_code = compile_expression(index_pair, ctx)?;
    let index_ty = ctx.type_stack.pop();
    if index_ty != Type::Primitive(Prim::Integer) {
        return Err(CompileError::IllegalIndexing(IllegalIndexing {
            span,
            message: format!("indexing with non-integer type '{index_ty}'"),
        }));
    }

    let elem_prim = match meta.ty {
        Type::Vector(p, _) => p,
        Type::Pointer(p) => {
            if !meta.initialized {
                return Err(CompileError::UninitializedPointer(UninitializedPointer { span, name: name.clone() }));
            }
            p
        }
        _ => {
            return Err(CompileError::IllegalIndexing(IllegalIndexing {
                span,
                message: format!("indexing not allowed on variable of type '{}'", meta.ty),
            }))
        }
    };

    let value_code = compile_expression(value_pair, ctx)?;
    let value_ty = ctx.type_stack.pop();
    if value_ty != Type::Primitive(elem_prim) {
        return Err(CompileError::type_mismatch(
            span,
            format!("cannot assign value of type '{value_ty}' to element of type '{elem_prim}'"),
        ));
    }

    let base = match meta.ty {
        Type::Vector(..) => format!("{push_op}\nPUSHI {}\nPADD\n", meta.stack_position.0),
        Type::Pointer(_) => format!("{push_op}\nLOAD {}\n", meta.stack_position.0),
        _ => unreachable!(),
    };
    Ok(format!("{base}{index_code}PADD\n{value_code}STORE 0\n"))
}

fn compile_print_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let mut code = String::new();
    if let Some(args) = pair.into_inner().next() {
        for expr in args.into_inner() {
            let expr_code = compile_expression(expr, ctx)?;
            let ty = ctx.type_stack.pop();
            let op = match ty {
                Type::Primitive(Prim::Filum) => "WRITES\n",
                Type::Primitive(Prim::Integer) => "WRITEI\n",
                Type::Primitive(Prim::Float) => "WRITEF\n",
                // SPEC_FULL.md §9.1 item 6: printing an array/pointer stays
                // an explicit refusal, matching the original.
                Type::Pointer(_) | Type::Vector(..) => {
                    return Err(CompileError::type_mismatch(span, "cannot print an array or pointer value (not implemented)"))
                }
                Type::None => return Err(CompileError::internal(span, "print of an empty type-check stack entry")),
            };
            code.push_str(&expr_code);
            code.push_str(op);
        }
    }
    Ok(code)
}

fn compile_expr_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let expr_pair = pair.into_inner().next().expect("expr_stmt always wraps an expression");
    // A call to a function with no output type leaves nothing on the VM
    // stack (its own `POP {arg_count}` already balances the pushed
    // arguments); only discard a value here if the expression actually
    // produced one, or a statement-level void call would underflow the
    // stack at runtime.
    let before = ctx.type_stack.len();
    let code = compile_expression(expr_pair, ctx)?;
    if ctx.type_stack.len() > before {
        ctx.type_stack.pop();
        Ok(format!("{code}POP 1\n"))
    } else {
        Ok(code)
    }
}

fn compile_return_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let expr_pair = pair.into_inner().next();
    let fname = ctx
        .functions
        .current
        .clone()
        .ok_or_else(|| CompileError::internal(span, "return statement outside of a function body"))?;
    let f = ctx.functions.get(&fname).expect("current function is always registered");
    let input_len = f.input_types.len();
    let output_type = f.output_type.clone();

    match expr_pair {
        Some(e) => {
            let code = compile_expression(e, ctx)?;
            let ty = ctx.type_stack.pop();
            match &output_type {
                Some(out) if *out == ty => {
                    let slot = -(input_len as i64 + 1);
                    Ok(format!("{code}STOREL {slot}\nRETURN\n"))
                }
                _ => Err(CompileError::type_mismatch(
                    span,
                    format!("returned type '{ty}' does not match declared output type '{output_type:?}'"),
                )),
            }
        }
        None => {
            if output_type.is_some() {
                Err(CompileError::type_mismatch(span, "bare 'return;' in a function with a declared output type"))
            } else {
                Ok("RETURN\n".to_string())
            }
        }
    }
}

fn compile_break_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let k = ctx.emitter.innermost_loop_k().ok_or_else(|| {
        CompileError::IllegalBreakContinue(IllegalBreakContinue {
            span,
            message: "'break' outside of a loop".to_string(),
        })
    })?;
    Ok(format!("JUMP LOOP{k}END\n"))
}

fn compile_continue_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    match ctx.emitter.innermost_loop() {
        None => Err(CompileError::IllegalBreakContinue(IllegalBreakContinue {
            span,
            message: "'continue' outside of a loop".to_string(),
        })),
        Some(LoopKind::Do) => Err(CompileError::IllegalBreakContinue(IllegalBreakContinue {
            span,
            message: "'continue' is not allowed inside a do-while loop".to_string(),
        })),
        Some(_) => {
            let k = ctx.emitter.innermost_loop_k().expect("innermost_loop just confirmed a loop is active");
            Ok(format!("JUMP NEXTLOOP{k}\n"))
        }
    }
}

// ---------------------------------------------------------------------
// Control flow (SPEC_FULL.md §4.6, §4.8)
// ---------------------------------------------------------------------

fn compile_if_stmt_top(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let rel = ctx.emitter.next_rel_if();
    let code = compile_if_arm(pair, ctx, rel)?;
    Ok(format!("{code}FINISHIF{rel}:\n"))
}

fn compile_if_arm(pair: Pair<Rule>, ctx: &mut CompileCtx, rel: u32) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let k = ctx.emitter.next_if();
    let mut inner = pair.into_inner();
    let cond_pair = inner.next().expect("if_stmt always has a condition");
    let block_pair = inner.next().expect("if_stmt always has a body block");
    let else_pair = inner.next();

    let cond_code = compile_expression(cond_pair, ctx)?;
    let cond_ty = ctx.type_stack.pop();
    if cond_ty != Type::Primitive(Prim::Integer) {
        return Err(CompileError::type_mismatch(span, format!("if condition must be 'integer', found '{cond_ty}'")));
    }
    let body_code = compile_block(block_pair, ctx)?;

    let mut code = format!("{cond_code}JZ IFLABEL{k}END\n{body_code}JUMP FINISHIF{rel}\nIFLABEL{k}END:\n");

    if let Some(else_clause) = else_pair {
        let next = else_clause.into_inner().next().expect("else_clause always wraps a branch");
        match next.as_rule() {
            Rule::if_stmt => code.push_str(&compile_if_arm(next, ctx, rel)?),
            Rule::block => code.push_str(&compile_block(next, ctx)?),
            other => unreachable!("else_clause matched unexpected rule {other:?}"),
        }
    }
    Ok(code)
}

fn compile_while_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let k = ctx.emitter.next_loop();
    ctx.emitter.enter_loop(LoopKind::While, k);

    let mut inner = pair.into_inner();
    let cond_pair = inner.next().expect("while_stmt always has a condition");
    let block_pair = inner.next().expect("while_stmt always has a body block");

    let cond_code = compile_expression(cond_pair, ctx)?;
    let cond_ty = ctx.type_stack.pop();
    if cond_ty != Type::Primitive(Prim::Integer) {
        ctx.emitter.exit_loop();
        return Err(CompileError::type_mismatch(span, format!("while condition must be 'integer', found '{cond_ty}'")));
    }

    let body_code = compile_block_open(block_pair, ctx)?;
    let pop_code = ctx.end_scope_emit();
    ctx.emitter.exit_loop();

    Ok(format!(
        "LOOP{k}START:\n{cond_code}JZ LOOP{k}END\n{body_code}NEXTLOOP{k}:\n{pop_code}JUMP LOOP{k}START\nLOOP{k}END:\n"
    ))
}

fn compile_do_while_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let k = ctx.emitter.next_loop();
    ctx.emitter.enter_loop(LoopKind::Do, k);

    let mut inner = pair.into_inner();
    let block_pair = inner.next().expect("do_while_stmt always has a body block");
    let cond_pair = inner.next().expect("do_while_stmt always has a condition");

    let body_code = compile_block_open(block_pair, ctx)?;
    let pop_code = ctx.end_scope_emit();

    let cond_code = compile_expression(cond_pair, ctx)?;
    let cond_ty = ctx.type_stack.pop();
    ctx.emitter.exit_loop();
    if cond_ty != Type::Primitive(Prim::Integer) {
        return Err(CompileError::type_mismatch(span, format!("do-while condition must be 'integer', found '{cond_ty}'")));
    }

    Ok(format!(
        "LOOP{k}START:\n{body_code}NEXTLOOP{k}:\n{pop_code}{cond_code}JZ LOOP{k}END\nJUMP LOOP{k}START\nLOOP{k}END:\n"
    ))
}

fn compile_for_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let k = ctx.emitter.next_loop();
    ctx.emitter.enter_loop(LoopKind::For, k);
    ctx.start_scope(); // outer scope: the loop's init variable(s)

    let mut inner = pair.into_inner();
    let mut current = inner.next();

    let mut init_code = String::new();
    if let Some(p) = current.clone() {
        if p.as_rule() == Rule::for_init {
            init_code = compile_for_init(p, ctx)?;
            current = inner.next();
        }
    }

    let cond_pair = current.expect("for_stmt always has a condition");
    current = inner.next();

    let mut update_pair = None;
    if let Some(p) = current.clone() {
        if p.as_rule() == Rule::for_update {
            update_pair = Some(p);
            current = inner.next();
        }
    }
    let block_pair = current.expect("for_stmt always ends with a body block");

    let cond_code = compile_expression(cond_pair, ctx)?;
    let cond_ty = ctx.type_stack.pop();
    if cond_ty != Type::Primitive(Prim::Integer) {
        ctx.emitter.exit_loop();
        ctx.end_scope_emit();
        return Err(CompileError::type_mismatch(span, format!("for condition must be 'integer', found '{cond_ty}'")));
    }

    let body_code = compile_block_open(block_pair, ctx)?; // inner scope: the loop body

    let update_code = match update_pair {
        Some(p) => compile_for_update(p, ctx)?,
        None => String::new(),
    };
    let inner_pop = ctx.end_scope_emit();
    ctx.emitter.exit_loop();
    let outer_pop = ctx.end_scope_emit();

    Ok(format!(
        "{init_code}LOOP{k}START:\n{cond_code}JZ LOOP{k}END\n{body_code}NEXTLOOP{k}:\n{update_code}{inner_pop}JUMP LOOP{k}START\nLOOP{k}END:\n{outer_pop}"
    ))
}

fn compile_for_init(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let parts: Vec<Pair<Rule>> = pair.into_inner().collect();
    if parts.len() == 3 {
        let name = parts[0].as_str().to_string();
        let ty = type_name_to_type(parts[1].clone());
        let expr_code = compile_expression(parts[2].clone(), ctx)?;
        let expr_ty = ctx.type_stack.pop();
        if !assignable(&ty, &expr_ty) {
            return Err(CompileError::type_mismatch(
                span,
                format!("cannot initialize loop variable '{name}' of type '{ty}' with expression of type '{expr_ty}'"),
            ));
        }
        let (lo, hi) = ctx.alloc_cells(1);
        ctx.scopes.declare(span, &name, ty, (lo, hi), None, true)?;
        Ok(expr_code)
    } else {
        let name = parts[0].as_str().to_string();
        compile_plain_assign(&name, parts[1].clone(), ctx, span)
    }
}

fn compile_for_update(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().expect("for_update always has a name").as_str().to_string();
    let expr_pair = inner.next().expect("for_update always has a value expression");
    compile_plain_assign(&name, expr_pair, ctx, span)
}

fn compile_match_stmt(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let rel = ctx.emitter.next_rel_match();
    let mut inner = pair.into_inner();
    let subject_pair = inner.next().expect("match_stmt always has a subject expression");
    let subject_code = compile_expression(subject_pair, ctx)?;
    let subject_ty = ctx.type_stack.pop();
    if subject_ty.is_filum() {
        return Err(CompileError::type_mismatch(span, "match on a 'filum' subject is not supported"));
    }

    ctx.start_scope();
    let scratch = format!("__match_subject_{rel}");
    let (lo, hi) = ctx.alloc_cells(1);
    ctx.scopes.declare(span, &scratch, subject_ty.clone(), (lo, hi), None, true)?;
    let in_function = ctx.in_function();
    let store_op = if in_function { "STOREL" } else { "STOREG" };
    let push_op = if in_function { "PUSHFP" } else { "PUSHGP" };

    let mut code = format!("{subject_code}{store_op} {lo}\n");

    let mut rest: Vec<Pair<Rule>> = inner.collect();
    let default_pair = rest.pop().expect("match_stmt always has a mandatory default arm");

    for arm in rest {
        let k = ctx.emitter.next_match();
        let mut ai = arm.into_inner();
        let arm_expr = ai.next().expect("match_arm always has an expression");
        let arm_block = ai.next().expect("match_arm always has a block");

        let arm_expr_code = compile_expression(arm_expr, ctx)?;
        let arm_ty = ctx.type_stack.pop();
        if arm_ty != subject_ty {
            return Err(CompileError::type_mismatch(
                span,
                format!("match arm of type '{arm_ty}' does not match subject type '{subject_ty}'"),
            ));
        }
        let arm_body = compile_block(arm_block, ctx)?;
        code.push_str(&format!(
            "{push_op}\nLOAD {lo}\n{arm_expr_code}EQUAL\nJZ MATCHARM{k}END\n{arm_body}JUMP FINISHMATCH{rel}\nMATCHARM{k}END:\n"
        ));
    }

    let default_block = default_pair
        .into_inner()
        .next()
        .expect("default_arm always has a block");
    code.push_str(&compile_block(default_block, ctx)?);
    code.push_str(&format!("FINISHMATCH{rel}:\n"));
    code.push_str(&ctx.end_scope_emit());
    Ok(code)
}

// ---------------------------------------------------------------------
// Expressions (SPEC_FULL.md §4.2's precedence chain, §4.4)
// ---------------------------------------------------------------------

type BinOpFn = fn(&mut crate::typecheck::TypeStack, Span, usize, &str, &str) -> Result<String, CompileError>;

fn binop_for(rule: Rule) -> BinOpFn {
    match rule {
        Rule::or_op => typecheck::or_op,
        Rule::and_op => typecheck::and_op,
        Rule::eq_op => typecheck::eq_op,
        Rule::neq_op => typecheck::neq_op,
        Rule::lt_op => typecheck::lt_op,
        Rule::gt_op => typecheck::gt_op,
        Rule::lte_op => typecheck::lte_op,
        Rule::gte_op => typecheck::gte_op,
        Rule::plus_op => typecheck::add_op,
        Rule::minus_op => typecheck::sub_op,
        Rule::star_op => typecheck::mul_op,
        Rule::slash_op => typecheck::div_op,
        Rule::percent_op => typecheck::mod_op,
        other => unreachable!("no binary operator handler for rule {other:?}"),
    }
}

fn compile_chain(
    pair: Pair<Rule>,
    ctx: &mut CompileCtx,
    compile_operand: fn(Pair<Rule>, &mut CompileCtx) -> Result<String, CompileError>,
) -> Result<String, CompileError> {
    let line = span_of(&pair).line;
    let mut inner = pair.into_inner();
    let first = inner.next().expect("a precedence-chain rule always has a first operand");
    let mut code = compile_operand(first, ctx)?;

    let rest: Vec<Pair<Rule>> = inner.collect();
    let mut idx = 0;
    while idx < rest.len() {
        let op_pair = rest[idx].clone();
        let operand_pair = rest[idx + 1].clone();
        idx += 2;
        let op_span = span_of(&op_pair);
        let right_code = compile_operand(operand_pair, ctx)?;
        let apply = binop_for(op_pair.as_rule());
        code = apply(&mut ctx.type_stack, op_span, line, &code, &right_code)?;
    }
    Ok(code)
}

fn compile_expression(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    compile_chain(pair, ctx, compile_subexpression)
}
fn compile_subexpression(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    compile_chain(pair, ctx, compile_condition)
}
fn compile_condition(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    compile_chain(pair, ctx, compile_comparison)
}
fn compile_comparison(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    compile_chain(pair, ctx, compile_term)
}
fn compile_term(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    compile_chain(pair, ctx, compile_factor)
}
fn compile_factor(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    compile_chain(pair, ctx, compile_unary)
}

fn compile_unary(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let line = span.line;
    let mut has_not = false;
    let mut has_neg = false;
    let mut cast_target: Option<Prim> = None;
    let mut postfix_pair: Option<Pair<Rule>> = None;

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::not_op => has_not = true,
            Rule::minus_op => has_neg = true,
            Rule::cast => {
                let type_pair = p.into_inner().next().expect("cast always wraps a type_name");
                cast_target = type_name_to_type(type_pair).as_primitive();
            }
            Rule::postfix => postfix_pair = Some(p),
            other => unreachable!("unary matched unexpected child rule {other:?}"),
        }
    }

    let mut code = compile_postfix(postfix_pair.expect("unary always has a postfix operand"), ctx)?;
    if let Some(target) = cast_target {
        code = typecheck::cast_op(&mut ctx.type_stack, line, target, &code);
    }
    if has_neg {
        code = typecheck::neg_op(&mut ctx.type_stack, span, line, &code)?;
    }
    if has_not {
        code = typecheck::not_op(&mut ctx.type_stack, span, line, &code)?;
    }
    Ok(code)
}

fn compile_postfix(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let line = span.line;
    let mut inner = pair.into_inner();
    let primary_pair = inner.next().expect("postfix always has a primary");
    let index_pair = inner.next();

    match index_pair {
        None => compile_primary(primary_pair, ctx),
        Some(idx) => {
            let matched = primary_pair.into_inner().next().expect("primary always wraps one alternative");
            if matched.as_rule() != Rule::ident {
                return Err(CompileError::IllegalIndexing(IllegalIndexing {
                    span,
                    message: "indexing is only allowed directly on a variable name".to_string(),
                }));
            }
            let name = matched.as_str().to_string();
            let lookup = ctx.scopes.lookup(&name);
            let meta = lookup.meta.cloned().ok_or_else(|| CompileError::undeclared(span, name.clone()))?;
            let in_function = lookup.in_function;

            let index_expr = idx.into_inner().next().expect("index_suffix always wraps an expression");
            let index_code = compile_expression(index_expr, ctx)?;
            let index_ty = ctx.type_stack.pop();
            if index_ty != Type::Primitive(Prim::Integer) {
                return Err(CompileError::IllegalIndexing(IllegalIndexing {
                    span,
                    message: format!("indexing with non-integer type '{index_ty}'"),
                }));
            }

            let push_op = if in_function { "PUSHFP" } else { "PUSHGP" };
            match meta.ty {
                Type::Vector(p, _) => {
                    ctx.type_stack.push(Type::Primitive(p), line);
                    Ok(format!("{push_op}\nPUSHI {}\nPADD\n{index_code}PADD\nLOAD 0\n", meta.stack_position.0))
                }
                Type::Pointer(p) => {
                    if !meta.initialized {
                        return Err(CompileError::UninitializedPointer(UninitializedPointer { span, name }));
                    }
                    ctx.type_stack.push(Type::Primitive(p), line);
                    Ok(format!("{push_op}\nLOAD {}\n{index_code}PADD\nLOAD 0\n", meta.stack_position.0))
                }
                _ => Err(CompileError::IllegalIndexing(IllegalIndexing {
                    span,
                    message: format!("indexing not allowed on variable of type '{}'", meta.ty),
                })),
            }
        }
    }
}

fn compile_primary(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let line = span.line;
    let inner = pair.into_inner().next().expect("primary always wraps one alternative");
    match inner.as_rule() {
        Rule::float_lit => {
            ctx.type_stack.push(Type::Primitive(Prim::Float), line);
            Ok(format!("PUSHF {}\n", canonicalize_float(inner.as_str())))
        }
        Rule::integer_lit => {
            ctx.type_stack.push(Type::Primitive(Prim::Integer), line);
            Ok(format!("PUSHI {}\n", inner.as_str()))
        }
        Rule::string_lit => {
            ctx.type_stack.push(Type::Primitive(Prim::Filum), line);
            Ok(format!("PUSHS {}\n", inner.as_str()))
        }
        Rule::read_expr => compile_read_expr(inner, ctx),
        Rule::call_expr => compile_call_expr(inner, ctx),
        Rule::ident => compile_ident_ref(inner, ctx),
        Rule::expression => compile_expression(inner, ctx),
        other => unreachable!("primary matched unexpected rule {other:?}"),
    }
}

fn compile_ident_ref(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let line = span.line;
    let name = pair.as_str();
    let token = Token::new(TokenKind::Identifier, name, span.line, span.column, pair.as_span().start());
    log::trace!("resolving identifier reference {token:?}");
    let lookup = ctx.scopes.lookup(name);
    let meta = lookup.meta.cloned().ok_or_else(|| CompileError::undeclared(span, name.to_string()))?;
    let in_function = lookup.in_function;

    match meta.ty {
        Type::Primitive(_) | Type::Pointer(_) => {
            let push_op = if in_function { "PUSHFP" } else { "PUSHGP" };
            let slot = meta.stack_position.0;
            ctx.type_stack.push(meta.ty, line);
            Ok(format!("{push_op}\nLOAD {slot}\n"))
        }
        Type::Vector(p, n) => {
            let push_op = if in_function { "PUSHFP" } else { "PUSHGP" };
            let lo = meta.stack_position.0;
            ctx.type_stack.push(Type::Vector(p, n), line);
            Ok(format!("{push_op}\nPUSHI {lo}\nPADD\n"))
        }
        Type::None => Err(CompileError::internal(span, "variable bound to the sentinel type")),
    }
}

fn compile_read_expr(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let kw = pair.into_inner().next().expect("read_expr always has a read_kw").as_str();
    match kw {
        "readi" => {
            ctx.type_stack.push(Type::Primitive(Prim::Integer), span.line);
            Ok("READ\nATOI\n".to_string())
        }
        "readf" => {
            ctx.type_stack.push(Type::Primitive(Prim::Float), span.line);
            Ok("READ\nATOF\n".to_string())
        }
        "reads" => {
            ctx.type_stack.push(Type::Primitive(Prim::Filum), span.line);
            Ok("READ\n".to_string())
        }
        other => unreachable!("read_kw matched unexpected lexeme '{other}'"),
    }
}

fn compile_call_expr(pair: Pair<Rule>, ctx: &mut CompileCtx) -> Result<String, CompileError> {
    let span = span_of(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().expect("call_expr always has a name").as_str().to_string();

    if !ctx.functions.has(&name) {
        return Err(CompileError::undeclared(span, name));
    }

    let mut arg_codes = Vec::new();
    if let Some(args) = inner.next() {
        for expr in args.into_inner() {
            arg_codes.push(compile_expression(expr, ctx)?);
        }
    }

    ctx.functions.check_arity(span, &name, arg_codes.len())?;
    let f = ctx.functions.get(&name).expect("presence checked above");
    let input_types = f.input_types.clone();
    let output_type = f.output_type.clone();

    let actual = ctx.type_stack.top_n_types(arg_codes.len());
    if actual != input_types {
        return Err(CompileError::type_mismatch(
            span,
            format!("call to '{name}' expects argument types {input_types:?}, found {actual:?}"),
        ));
    }
    let new_len = ctx.type_stack.len() - arg_codes.len();
    ctx.type_stack.truncate(new_len);
    if let Some(out) = &output_type {
        ctx.type_stack.push(out.clone(), span.line);
    }

    let prefix = if output_type.is_some() {
        format!("{RETURN_SLOT_PLACEHOLDER}\n")
    } else {
        String::new()
    };
    let arg_count = arg_codes.len();
    let args_concat: String = arg_codes.concat();
    Ok(format!("{prefix}{args_concat}PUSHA {}\nCALL\nPOP {arg_count}\n", munge(&name)))
}
