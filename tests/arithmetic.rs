const SRC: &str = r#"
func main() {
    x: integer = 2 + 3 * 4;
    print(x);
}
"#;

#[test]
fn operator_precedence_multiplies_before_adding() {
    test_utils::assert_compiles_to(
        SRC,
        "start\nPUSHA main\nCALL\nstop\nmain:\nPUSHI 2\nPUSHI 3\nPUSHI 4\nMUL\nADD\nPUSHFP\nLOAD 0\nWRITEI\nPOP 1\nRETURN\n",
    );
}

#[test]
fn float_arithmetic_uses_float_opcodes() {
    let assembly = test_utils::assert_compiles("func main() { y: float = 1.5 + 2.5; print(y); }");
    test_utils::assert_contains_in_order(&assembly, &["PUSHF 1.5", "PUSHF 2.5", "FADD", "WRITEF"]);
}

#[test]
fn string_concatenation_swaps_operand_order() {
    let assembly = test_utils::assert_compiles(r#"func main() { s: filum = "a" + "b"; print(s); }"#);
    test_utils::assert_contains_in_order(&assembly, &["PUSHS \"b\"", "PUSHS \"a\"", "CONCAT", "WRITES"]);
}

#[test]
fn comparison_of_equal_types_emits_relational_opcode() {
    let assembly = test_utils::assert_compiles("func main() { b: integer = 3 < 5; print(b); }");
    test_utils::assert_contains_in_order(&assembly, &["PUSHI 3", "PUSHI 5", "INF"]);
}

#[test]
fn float_comparison_appends_ftoi() {
    let assembly = test_utils::assert_compiles("func main() { b: integer = 3.0 < 5.0; print(b); }");
    test_utils::assert_contains_in_order(&assembly, &["FINF", "FTOI"]);
}

#[test]
fn cast_to_same_type_emits_no_opcode() {
    let assembly = test_utils::assert_compiles("func main() { x: integer = (integer) 3; print(x); }");
    assert!(!assembly.contains("ITOI"), "identity cast should not emit an opcode:\n{assembly}");
}

#[test]
fn int_to_filum_cast_uses_documented_itos() {
    let assembly = test_utils::assert_compiles("func main() { s: filum = (filum) 3; print(s); }");
    assert!(assembly.contains("ITOS\n"), "expected ITOS in:\n{assembly}");
}
