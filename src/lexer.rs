//! Lexical helpers that sit alongside the pest grammar (SPEC_FULL.md §4.1).
//!
//! `lattox.pest`'s `float_lit`/`integer_lit`/`string_lit` rules recognize
//! *shape*; canonicalizing a matched float lexeme into the decimal form the
//! VM's `PUSHF` expects is a small enough transform that it does not deserve
//! its own hand-rolled scanning pass (SPEC_FULL.md §9 steers away from a
//! second, redundant lexer), so it lives here as a pure function `compiler.rs`
//! calls at the `float_lit` primary.

/// Canonicalizes a matched `float_lit` lexeme (`"3f"`, `"3.5"`, `"3.5f"`) into
/// plain decimal form (`"3.0"`, `"3.5"`, `"3.5"`) per SPEC_FULL.md §4.1: the
/// trailing `f` suffix is stripped and a missing fractional part gets `.0`
/// appended.
pub fn canonicalize_float(lexeme: &str) -> String {
    let trimmed = lexeme.strip_suffix('f').unwrap_or(lexeme);
    if trimmed.contains('.') {
        trimmed.to_string()
    } else {
        format!("{trimmed}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_with_f_suffix_gets_decimal_point() {
        assert_eq!(canonicalize_float("3f"), "3.0");
    }

    #[test]
    fn decimal_with_f_suffix_drops_suffix() {
        assert_eq!(canonicalize_float("3.5f"), "3.5");
    }

    #[test]
    fn bare_decimal_is_unchanged() {
        assert_eq!(canonicalize_float("3.5"), "3.5");
    }
}
