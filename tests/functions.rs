use test_utils::assert_contains_in_order;

#[test]
fn call_with_arguments_follows_documented_protocol() {
    let src = r#"
func add(a: integer, b: integer) -> integer {
    return a + b;
}
func main() {
    print(add(2, 3));
}
"#;
    let assembly = test_utils::assert_compiles(src);
    assert_contains_in_order(&assembly, &["add:", "LOAD -1", "STOREL 0", "LOAD -2", "STOREL 1"]);
    assert_contains_in_order(&assembly, &["PUSHI -69", "PUSHI 2", "PUSHI 3", "PUSHA add", "CALL", "POP 2"]);
    assert_contains_in_order(&assembly, &["PUSHFP", "LOAD 0", "PUSHFP", "LOAD 1", "ADD", "STOREL -3", "RETURN"]);
}

#[test]
fn void_call_has_no_return_slot_placeholder() {
    let src = r#"
func greet(name: filum) {
    print(name);
}
func main() {
    greet("bob");
}
"#;
    let assembly = test_utils::assert_compiles(src);
    assert!(!assembly.contains("PUSHI -69"), "a void call must not reserve a return slot:\n{assembly}");
    assert_contains_in_order(&assembly, &["PUSHS \"bob\"", "PUSHA greet", "CALL", "POP 1"]);
}

#[test]
fn underscores_are_stripped_from_labels_and_call_sites() {
    let src = r#"
func my_func() -> integer {
    return 1;
}
func main() {
    print(my_func());
}
"#;
    let assembly = test_utils::assert_compiles(src);
    assert!(assembly.contains("myfunc:"), "expected munged label in:\n{assembly}");
    assert!(assembly.contains("PUSHA myfunc\n"), "expected munged call site in:\n{assembly}");
}

#[test]
fn function_falling_off_without_return_gets_one_appended() {
    let assembly = test_utils::assert_compiles("func side_effect() { print(1); } func main() { side_effect(); }");
    assert!(assembly.contains("RETURN\n"));
}

#[test]
fn redefined_function_is_rejected() {
    test_utils::assert_compile_error("func f() {} func f() {} func main() {}", "RedefinedFunction");
}

#[test]
fn arity_mismatch_is_rejected() {
    let src = r#"
func add(a: integer, b: integer) -> integer {
    return a + b;
}
func main() {
    print(add(2));
}
"#;
    test_utils::assert_compile_error(src, "ArityMismatch");
}

#[test]
fn argument_type_mismatch_is_rejected() {
    let src = r#"
func add(a: integer, b: integer) -> integer {
    return a + b;
}
func main() {
    print(add(2, "x"));
}
"#;
    test_utils::assert_compile_error(src, "TypeMismatch");
}

#[test]
fn calling_an_unknown_function_is_undeclared() {
    test_utils::assert_compile_error("func main() { print(mystery(1)); }", "UndeclaredIdentifier");
}

#[test]
fn missing_main_is_fatal() {
    test_utils::assert_compile_error("func f() {}", "MissingMain");
}

#[test]
fn bare_return_requires_no_output_type() {
    test_utils::assert_compile_error("func f() -> integer { return; } func main() {}", "TypeMismatch");
}
