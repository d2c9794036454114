//! Scope-stack and declaration-teardown balance tests (SPEC_FULL.md §4.3,
//! §8's "declaration-teardown balance" round-trip law).

use test_utils::assert_contains_in_order;

#[test]
fn inner_scope_may_shadow_outer_with_different_type() {
    let src = r#"
func main() {
    x: integer = 1;
    si (x == 1) {
        x: float = 2.0;
        print(x);
    }
    print(x);
}
"#;
    let assembly = test_utils::assert_compiles(src);
    // the inner `x` is a fresh float at its own frame slot; printing it
    // uses WRITEF, while the outer `print(x)` after the block closes still
    // sees the original integer and uses WRITEI.
    assert_contains_in_order(&assembly, &["WRITEF", "WRITEI"]);
}

#[test]
fn redeclaring_in_the_same_scope_is_rejected() {
    test_utils::assert_compile_error("func main() { x: integer; x: integer; }", "RedeclaredIdentifier");
}

#[test]
fn nested_block_scope_emits_matching_pop() {
    let src = r#"
func main() {
    si (1) {
        a: integer;
        b: integer;
    }
}
"#;
    let assembly = test_utils::assert_compiles(src);
    assert!(assembly.contains("POP 2\n"), "expected a 2-cell teardown for the if-block's two locals:\n{assembly}");
}

#[test]
fn array_declaration_reserves_contiguous_cells_and_pops_them_all() {
    let src = r#"
func main() {
    arr: vec<integer>[4];
}
"#;
    let assembly = test_utils::assert_compiles(src);
    assert!(assembly.contains("PUSHN 4\n"));
    assert!(assembly.contains("POP 4\n"));
}

#[test]
fn array_range_initializer_emits_pushes_at_global_scope_too() {
    // SPEC_FULL.md §4.6.1: one evolutionary copy of the original only
    // emitted the range's PUSHI sequence for a local declaration; this
    // repo fixes that to also emit at global scope.
    let assembly = test_utils::assert_compiles("arr: vec<integer> = [1...3]; func main() {}");
    assert_contains_in_order(&assembly, &["PUSHI 1", "PUSHI 2", "PUSHI 3"]);
}

#[test]
fn global_and_local_declarations_use_distinct_opcode_families() {
    let src = r#"
g: integer = 10;
func main() {
    l: integer = 5;
    print(g);
    print(l);
}
"#;
    let assembly = test_utils::assert_compiles(src);
    assert!(assembly.contains("PUSHGP\nLOAD 0\n"), "global read should use PUSHGP+LOAD:\n{assembly}");
    assert!(assembly.contains("PUSHFP\nLOAD 0\n"), "local read should use PUSHFP+LOAD:\n{assembly}");
}
