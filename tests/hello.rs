use test_utils::assert_contains_in_order;

const SRC: &str = r#"
func main() {
    print("hi");
}
"#;

#[test]
fn hello_world_emits_prologue_and_write() {
    let assembly = test_utils::assert_compiles(SRC);
    assert_contains_in_order(
        &assembly,
        &["start", "PUSHA main", "CALL", "stop", "main:", "PUSHS \"hi\"", "WRITES", "RETURN"],
    );
}

#[test]
fn empty_main_compiles_and_returns() {
    let assembly = test_utils::assert_compiles("func main() {}");
    assert_contains_in_order(&assembly, &["main:", "RETURN"]);
}
