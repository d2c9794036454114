//! The `Type` discriminated union (§9: "Type stack as explicit discriminated union").
//!
//! The original implementation carries types as strings (`"integer"`,
//! `"&integer"`, `"vec<integer>"`); here they are a proper enum with
//! structural equality, and the string form only resurfaces in diagnostics.

use std::fmt;

/// A primitive Lat/Tox type. Pointers and vectors may only range over these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    Integer,
    Float,
    Filum,
}

impl Prim {
    /// First half of a cast opcode name, per the original's
    /// `_get_first_part_of_casting` (source-type prefix).
    pub fn cast_source_prefix(self) -> &'static str {
        match self {
            Prim::Integer => "I",
            Prim::Float => "F",
            Prim::Filum => "A",
        }
    }

    /// Second half of a cast opcode name, per the original's
    /// `_get_second_part_of_casting` (target-type suffix), except that the
    /// int->filum direction is special-cased to the documented `ITOS`
    /// (see SPEC_FULL.md §4.4.1, §9.1 item 5) rather than the derived `ITOA`.
    pub fn cast_target_suffix(self) -> &'static str {
        match self {
            Prim::Integer => "I",
            Prim::Float => "F",
            Prim::Filum => "S",
        }
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prim::Integer => write!(f, "integer"),
            Prim::Float => write!(f, "float"),
            Prim::Filum => write!(f, "filum"),
        }
    }
}

/// A full Lat/Tox type: primitive, pointer-to-primitive, or
/// fixed-size vector-of-primitive. `None` is the type-check stack's
/// empty-pop sentinel and never appears in a symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Primitive(Prim),
    Pointer(Prim),
    Vector(Prim, usize),
    /// Sentinel produced by popping an empty type-check stack (§4.4).
    None,
}

impl Type {
    pub fn is_primitive(&self, p: Prim) -> bool {
        matches!(self, Type::Primitive(q) if *q == p)
    }

    pub fn as_primitive(&self) -> Option<Prim> {
        match self {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_pointee(&self) -> Option<Prim> {
        match self {
            Type::Pointer(p) => Some(*p),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<(Prim, usize)> {
        match self {
            Type::Vector(p, n) => Some((*p, *n)),
            _ => None,
        }
    }

    pub fn is_filum(&self) -> bool {
        matches!(self, Type::Primitive(Prim::Filum))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{p}"),
            Type::Pointer(p) => write!(f, "&{p}"),
            Type::Vector(p, n) => write!(f, "vec<{p}>[{n}]"),
            Type::None => write!(f, "None"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_surface_syntax() {
        assert_eq!(Type::Primitive(Prim::Integer).to_string(), "integer");
        assert_eq!(Type::Pointer(Prim::Float).to_string(), "&float");
        assert_eq!(Type::Vector(Prim::Filum, 3).to_string(), "vec<filum>[3]");
        assert_eq!(Type::None.to_string(), "None");
    }

    #[test]
    fn structural_equality() {
        assert_eq!(Type::Primitive(Prim::Integer), Type::Primitive(Prim::Integer));
        assert_ne!(Type::Primitive(Prim::Integer), Type::Primitive(Prim::Float));
        assert_ne!(Type::Pointer(Prim::Integer), Type::Primitive(Prim::Integer));
    }

    #[test]
    fn cast_opcode_parts() {
        assert_eq!(Prim::Integer.cast_source_prefix(), "I");
        assert_eq!(Prim::Filum.cast_target_suffix(), "S");
    }
}
