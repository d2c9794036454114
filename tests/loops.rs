use test_utils::assert_contains_in_order;

#[test]
fn while_with_break_jumps_to_loop_end() {
    let src = r#"
func main() {
    i: integer = 0;
    while (i < 5) {
        si (i == 3) {
            break;
        }
        i = i + 1;
    }
    print(i);
}
"#;
    let assembly = test_utils::assert_compiles(src);
    assert_contains_in_order(
        &assembly,
        &["LOOP1START:", "JZ LOOP1END", "JZ IFLABEL1END", "JUMP LOOP1END", "FINISHIF1:", "NEXTLOOP1:", "JUMP LOOP1START", "LOOP1END:"],
    );
}

#[test]
fn do_while_runs_body_before_condition() {
    let src = r#"
func main() {
    i: integer = 0;
    do {
        i = i + 1;
    } while (i < 3);
    print(i);
}
"#;
    let assembly = test_utils::assert_compiles(src);
    let loop_start = assembly.find("LOOP1START:").expect("loop start label emitted");
    let store = assembly.find("STOREL 0").expect("body store emitted");
    let cond = assembly.rfind("INF").expect("condition evaluated");
    assert!(loop_start < store, "body must precede the condition in do-while");
    assert!(store < cond, "condition must be evaluated after the body runs");
}

#[test]
fn continue_inside_do_while_is_rejected() {
    let src = r#"
func main() {
    do {
        continue;
    } while (1);
}
"#;
    test_utils::assert_compile_error(src, "IllegalBreakContinue");
}

#[test]
fn continue_inside_while_jumps_to_nextloop() {
    let src = r#"
func main() {
    i: integer = 0;
    while (i < 5) {
        i = i + 1;
        continue;
    }
}
"#;
    let assembly = test_utils::assert_compiles(src);
    assert!(assembly.contains("JUMP NEXTLOOP1\n"));
}

#[test]
fn for_loop_has_two_nested_scopes() {
    let src = r#"
func main() {
    for (i: integer = 0; i < 3; i = i + 1) {
        print(i);
    }
}
"#;
    let assembly = test_utils::assert_compiles(src);
    assert_contains_in_order(
        &assembly,
        &["LOOP1START:", "JZ LOOP1END", "NEXTLOOP1:", "JUMP LOOP1START", "LOOP1END:"],
    );
    // the init scope (holding `i`) and the body scope each get their own
    // teardown pop: "POP 1" for the one declared loop variable, "POP 0"
    // for the otherwise-empty body block.
    assert!(assembly.contains("POP 1\n"), "expected init-scope teardown in:\n{assembly}");
    assert!(assembly.contains("POP 0\n"), "expected body-scope teardown in:\n{assembly}");
}

#[test]
fn break_outside_loop_is_rejected() {
    test_utils::assert_compile_error("func main() { break; }", "IllegalBreakContinue");
}

#[test]
fn continue_outside_loop_is_rejected() {
    test_utils::assert_compile_error("func main() { continue; }", "IllegalBreakContinue");
}
