//! The error taxonomy (SPEC_FULL.md §7), one dedicated struct per kind
//! aggregated by `CompileError`, in the style of the teacher crate's
//! `typechecker::error` module: each struct carries its own span and
//! implements `Display`; the outer enum forwards to whichever variant is
//! active.

use std::fmt;

/// A 1-based line/column position, paired with a byte offset for tooling
/// that wants it. Mirrors the `Token` position fields of SPEC_FULL.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    fn fmt_prefix(&self) -> String {
        format!("{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fmt_prefix())
    }
}

macro_rules! error_struct {
    ($name:ident, $doc:literal, { $($field:ident : $ty:ty),* $(,)? }, $fmt:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name {
            pub span: Span,
            $(pub $field: $ty,)*
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                #[allow(unused_variables)]
                let Self { span, $($field),* } = self;
                write!(f, "{span}: {}", $fmt(self))
            }
        }

        impl std::error::Error for $name {}
    };
}

error_struct!(LexError, "Illegal character during scanning.", { message: String }, |e: &LexError| e.message.clone());
error_struct!(SyntaxError, "Invalid token at the given position.", { message: String }, |e: &SyntaxError| e.message.clone());
error_struct!(UndeclaredIdentifier, "Use of a name with no visible declaration.", { name: String }, |e: &UndeclaredIdentifier| format!("use of undeclared identifier '{}'", e.name));
error_struct!(RedeclaredIdentifier, "Duplicate declaration within the same scope.", { name: String }, |e: &RedeclaredIdentifier| format!("'{}' is already defined in this scope", e.name));
error_struct!(RedefinedFunction, "Function name already bound.", { name: String }, |e: &RedefinedFunction| format!("function '{}' is already defined", e.name));
error_struct!(TypeMismatch, "Operand/assignment/initializer/return type disagreement.", { message: String }, |e: &TypeMismatch| e.message.clone());
error_struct!(ArityMismatch, "Wrong argument count at a call site.", { name: String, expected: usize, found: usize }, |e: &ArityMismatch| format!("'{}' expects {} argument(s), found {}", e.name, e.expected, e.found));
error_struct!(IllegalIndexing, "Indexing a non-array/non-pointer, or with a non-integer index.", { message: String }, |e: &IllegalIndexing| e.message.clone());
error_struct!(IllegalBreakContinue, "break/continue outside a loop, or continue inside do-while.", { message: String }, |e: &IllegalBreakContinue| e.message.clone());
error_struct!(MissingMain, "No `main` function found at end-of-program.", {}, |_e: &MissingMain| "no 'main' function defined".to_string());
error_struct!(UninitializedPointer, "Indexing a pointer declared without initialization.", { name: String }, |e: &UninitializedPointer| format!("pointer '{}' is used before being initialized", e.name));
error_struct!(InternalAssertion, "An implementer invariant was violated.", { message: String }, |e: &InternalAssertion| format!("internal compiler assertion failed: {}", e.message));

/// The closed set of ways a compile can fail. Every variant is fatal: on
/// the first one constructed, compilation aborts (single-error model,
/// SPEC_FULL.md §7) and the CLI driver turns this into exit code 1.
#[derive(Debug, Clone)]
pub enum CompileError {
    Lex(LexError),
    Syntax(SyntaxError),
    UndeclaredIdentifier(UndeclaredIdentifier),
    RedeclaredIdentifier(RedeclaredIdentifier),
    RedefinedFunction(RedefinedFunction),
    TypeMismatch(TypeMismatch),
    ArityMismatch(ArityMismatch),
    IllegalIndexing(IllegalIndexing),
    IllegalBreakContinue(IllegalBreakContinue),
    MissingMain(MissingMain),
    UninitializedPointer(UninitializedPointer),
    Internal(InternalAssertion),
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::Lex(e) => e.span,
            CompileError::Syntax(e) => e.span,
            CompileError::UndeclaredIdentifier(e) => e.span,
            CompileError::RedeclaredIdentifier(e) => e.span,
            CompileError::RedefinedFunction(e) => e.span,
            CompileError::TypeMismatch(e) => e.span,
            CompileError::ArityMismatch(e) => e.span,
            CompileError::IllegalIndexing(e) => e.span,
            CompileError::IllegalBreakContinue(e) => e.span,
            CompileError::MissingMain(e) => e.span,
            CompileError::UninitializedPointer(e) => e.span,
            CompileError::Internal(e) => e.span,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            CompileError::Lex(_) => "LexError",
            CompileError::Syntax(_) => "SyntaxError",
            CompileError::UndeclaredIdentifier(_) => "UndeclaredIdentifier",
            CompileError::RedeclaredIdentifier(_) => "RedeclaredIdentifier",
            CompileError::RedefinedFunction(_) => "RedefinedFunction",
            CompileError::TypeMismatch(_) => "TypeMismatch",
            CompileError::ArityMismatch(_) => "ArityMismatch",
            CompileError::IllegalIndexing(_) => "IllegalIndexing",
            CompileError::IllegalBreakContinue(_) => "IllegalBreakContinue",
            CompileError::MissingMain(_) => "MissingMain",
            CompileError::UninitializedPointer(_) => "UninitializedPointer",
            CompileError::Internal(_) => "InternalAssertion",
        }
    }

    pub fn type_mismatch(span: Span, message: impl Into<String>) -> Self {
        CompileError::TypeMismatch(TypeMismatch { span, message: message.into() })
    }

    pub fn undeclared(span: Span, name: impl Into<String>) -> Self {
        CompileError::UndeclaredIdentifier(UndeclaredIdentifier { span, name: name.into() })
    }

    pub fn internal(span: Span, message: impl Into<String>) -> Self {
        CompileError::Internal(InternalAssertion { span, message: message.into() })
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind_name(), self.display_inner())
    }
}

impl CompileError {
    fn display_inner(&self) -> String {
        match self {
            CompileError::Lex(e) => e.to_string(),
            CompileError::Syntax(e) => e.to_string(),
            CompileError::UndeclaredIdentifier(e) => e.to_string(),
            CompileError::RedeclaredIdentifier(e) => e.to_string(),
            CompileError::RedefinedFunction(e) => e.to_string(),
            CompileError::TypeMismatch(e) => e.to_string(),
            CompileError::ArityMismatch(e) => e.to_string(),
            CompileError::IllegalIndexing(e) => e.to_string(),
            CompileError::IllegalBreakContinue(e) => e.to_string(),
            CompileError::MissingMain(e) => e.to_string(),
            CompileError::UninitializedPointer(e) => e.to_string(),
            CompileError::Internal(e) => e.to_string(),
        }
    }
}

impl std::error::Error for CompileError {}

/// Non-fatal diagnostics (SPEC_FULL.md §7): currently only the
/// fall-off-without-return case.
#[derive(Debug, Clone)]
pub struct CompileWarning {
    pub span: Span,
    pub message: String,
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: warning: {}", self.span, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_span() {
        let err = CompileError::undeclared(Span::new(3, 7), "foo");
        let text = err.to_string();
        assert!(text.contains("UndeclaredIdentifier"));
        assert!(text.contains("foo"));
    }
}
