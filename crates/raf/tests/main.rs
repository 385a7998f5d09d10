//! End-to-end scenarios executed through both back ends.
//!
//! Every helper here runs a program twice, once per back end, and asserts
//! identical observable output before returning it.

use pretty_assertions::assert_eq;
use raf::{Backend, CollectStringPrint, RafError, Runner};

fn run_backend(source: &str, backend: Backend) -> Result<String, RafError> {
    let runner = Runner::new(source, "test.raf")?;
    let mut print = CollectStringPrint::new();
    runner.run(backend, &mut print)?;
    Ok(print.into_output())
}

/// Runs via the tree-walker and the VM, asserting back-end equivalence.
fn run_both(source: &str) -> String {
    let tree = run_backend(source, Backend::Tree).expect("tree back end failed");
    let vm = run_backend(source, Backend::Vm).expect("vm back end failed");
    assert_eq!(tree, vm, "back ends disagree on observable output");
    tree
}

/// Asserts both back ends fail, returning the two messages.
fn error_both(source: &str) -> (String, String) {
    let tree = run_backend(source, Backend::Tree).expect_err("tree back end unexpectedly succeeded");
    let vm = run_backend(source, Backend::Vm).expect_err("vm back end unexpectedly succeeded");
    (tree.message().to_owned(), vm.message().to_owned())
}

#[test]
fn if_else_prints_ok() {
    let out = run_both(r#"x = 12; if (x >= 10) { print("ok"); } else { print("no"); }"#);
    assert_eq!(out, "ok\n");
}

#[test]
fn while_loop_prints_0_1_2() {
    let out = run_both("i = 0; while (i < 3) { print(i); i = i + 1; }");
    assert_eq!(out, "0\n1\n2\n");
}

#[test]
fn function_return() {
    let out = run_both("def add(a, b) { return a + b; } print(add(2, 5));");
    assert_eq!(out, "7\n");
}

#[test]
fn list_literal_and_index() {
    let out = run_both("lst = [10, 20, 30]; print(lst[1]);");
    assert_eq!(out, "20\n");
}

#[test]
fn empty_program_prints_nothing() {
    assert_eq!(run_both(""), "");
}

#[test]
fn empty_list_has_length_zero() {
    assert_eq!(run_both("print(len([]));"), "0\n");
}

#[test]
fn len_of_strings_and_lists() {
    let out = run_both(r#"print(len("hello"), len([1, 2, 3]));"#);
    assert_eq!(out, "5 3\n");
}

#[test]
fn division_always_fractional() {
    assert_eq!(run_both("print(4 / 2); print(7 / 2);"), "2.0\n3.5\n");
}

#[test]
fn mixed_arithmetic_promotes() {
    assert_eq!(run_both("print(1 + 2.5); print(2 * 3); print(7 % 3); print(7.5 % 2);"), "3.5\n6\n1\n1.5\n");
}

#[test]
fn string_concatenation_and_indexing() {
    let out = run_both(r#"s = "ab" + "cd"; print(s, s[2], len(s));"#);
    assert_eq!(out, "abcd c 4\n");
}

#[test]
fn list_concatenation() {
    assert_eq!(run_both("print([1, 2] + [3]);"), "[1, 2, 3]\n");
}

#[test]
fn value_rendering_uses_language_literals() {
    let out = run_both(r#"print(true, false, none, 2.0, [1, "a", none]);"#);
    assert_eq!(out, "true false none 2.0 [1, \"a\", none]\n");
}

#[test]
fn comparisons_and_equality() {
    let out = run_both(
        "print(1 == 1.0); print(true == 1); print(\"a\" == \"a\"); print([1, 2] == [1.0, 2]); print(1 != 2); print(\"a\" < \"b\");",
    );
    assert_eq!(out, "true\nfalse\ntrue\ntrue\ntrue\ntrue\n");
}

#[test]
fn truthiness_drives_conditions() {
    let out = run_both(
        r#"
        if (0) { print("int"); }
        if (0.0) { print("float"); }
        if ("") { print("str"); }
        if ([]) { print("list"); }
        if (none) { print("none"); }
        if ([0]) { print("nonempty"); }
        "#,
    );
    assert_eq!(out, "nonempty\n");
}

#[test]
fn short_circuit_preserves_operand_values() {
    let out = run_both(
        r#"
        print(0 and 5);
        print(2 and 5);
        print(0 or 7);
        print("x" or 7);
        print(false or none);
        "#,
    );
    assert_eq!(out, "0\n5\n7\nx\nnone\n");
}

#[test]
fn short_circuit_skips_side_effects() {
    let out = run_both(
        r#"
        def loud(v) { print("called"); return v; }
        x = false and loud(1);
        y = true or loud(2);
        print(x, y);
        "#,
    );
    assert_eq!(out, "false true\n");
}

#[test]
fn unary_operators() {
    assert_eq!(run_both("print(-3, -2.5, not true, not 0, not \"\");"), "-3 -2.5 false true true\n");
}

#[test]
fn closures_capture_by_reference() {
    let out = run_both(
        r#"
        x = 1;
        def get() { return x; }
        x = 2;
        print(get());
        "#,
    );
    assert_eq!(out, "2\n");
}

#[test]
fn functions_nest_and_recurse() {
    let out = run_both(
        r#"
        def fib(n) {
            if (n < 2) { return n; }
            return fib(n - 1) + fib(n - 2);
        }
        print(fib(10));
        "#,
    );
    assert_eq!(out, "55\n");
}

#[test]
fn function_without_return_yields_none() {
    let out = run_both("def noop() { 1 + 1; } print(noop());");
    assert_eq!(out, "none\n");
}

#[test]
fn bare_return_yields_none() {
    let out = run_both("def early() { return; print(\"never\"); } print(early());");
    assert_eq!(out, "none\n");
}

#[test]
fn assignment_writes_through_to_enclosing_scopes() {
    let out = run_both(
        r#"
        x = 1;
        def show() {
            x = 10;
            if (true) { x = 20; }
            print(x);
        }
        show();
        print(x);
        "#,
    );
    // assignment updates the nearest existing binding, so both writes land
    // on the global
    assert_eq!(out, "20\n20\n");
}

#[test]
fn block_definitions_do_not_leak() {
    let out = run_both(
        r#"
        def probe() {
            if (true) { local = 5; }
            return len([]);
        }
        print(probe());
        "#,
    );
    assert_eq!(out, "0\n");
}

#[test]
fn while_body_scope_resets_each_iteration() {
    let out = run_both(
        r#"
        i = 0;
        while (i < 2) {
            fresh = i * 10;
            print(fresh);
            i = i + 1;
        }
        "#,
    );
    assert_eq!(out, "0\n10\n");
}

#[test]
fn nested_def_shadows_without_touching_outer() {
    let out = run_both(
        r#"
        def g() { return 1; }
        def h() {
            def g() { return 2; }
            return g();
        }
        print(h());
        print(g());
        "#,
    );
    assert_eq!(out, "2\n1\n");
}

#[test]
fn functions_are_values() {
    let out = run_both(
        r#"
        def double(n) { return n * 2; }
        f = double;
        print(f(21));
        "#,
    );
    assert_eq!(out, "42\n");
}

#[test]
fn top_level_return_ends_the_module() {
    assert_eq!(run_both("print(1); return; print(2);"), "1\n");
}

#[test]
fn argument_evaluation_is_left_to_right() {
    let out = run_both(
        r#"
        def tag(label, v) { print(label); return v; }
        def sum3(a, b, c) { return a + b + c; }
        print(sum3(tag("a", 1), tag("b", 2), tag("c", 3)));
        "#,
    );
    assert_eq!(out, "a\nb\nc\n6\n");
}

#[test]
fn multiline_strings_and_escapes() {
    let out = run_both("print(\"a\\tb\");\nprint(\"line1\nline2\");");
    assert_eq!(out, "a\tb\nline1\nline2\n");
}

#[test]
fn division_by_zero_fails_both_backends() {
    let (tree, vm) = error_both("print(1 / 0);");
    assert!(tree.contains("division by zero"), "{tree}");
    assert!(vm.contains("division by zero"), "{vm}");
}

#[test]
fn arity_mismatch_names_function_and_counts() {
    let (tree, vm) = error_both("def add(a, b) { return a + b; } add(1, 2, 3);");
    assert!(tree.contains("add() expected 2 args, got 3"), "{tree}");
    assert!(vm.contains("add() expected 2 args, got 3"), "{vm}");
}

#[test]
fn negative_index_is_out_of_range() {
    let (tree, vm) = error_both("lst = [1]; print(lst[-1]);");
    assert!(tree.contains("list index out of range"), "{tree}");
    assert!(vm.contains("list index out of range"), "{vm}");
}

#[test]
fn non_integer_index_is_rejected() {
    let (tree, vm) = error_both("print([1][0.0]);");
    assert!(tree.contains("Index must be an integer"), "{tree}");
    assert!(vm.contains("Index must be an integer"), "{vm}");
}

#[test]
fn calling_a_non_function_fails() {
    let (tree, vm) = error_both("x = 3; x();");
    assert!(tree.contains("Can only call functions"), "{tree}");
    assert!(vm.contains("Can only call functions"), "{vm}");
}

#[test]
fn type_mismatch_in_operator_fails() {
    let (tree, vm) = error_both(r#"print("a" + 1);"#);
    assert!(tree.contains("unsupported operands for '+': str and int"), "{tree}");
    assert!(vm.contains("unsupported operands for '+': str and int"), "{vm}");
}

#[test]
fn ordering_across_kinds_fails() {
    let (tree, vm) = error_both(r#"print(1 < "a");"#);
    assert!(tree.contains("'<' not supported between int and str"), "{tree}");
    assert!(vm.contains("'<' not supported between int and str"), "{vm}");
}

#[test]
fn disassembly_lists_module_and_function_chunks() {
    let runner = Runner::new("def add(a, b) { return a + b; } print(add(2, 5));", "test.raf").unwrap();
    let listing = runner.disassemble();
    assert!(listing.contains("== <module> =="), "{listing}");
    assert!(listing.contains("== <fn add> =="), "{listing}");
    assert!(listing.contains("MAKE_FUNC"), "{listing}");
    assert!(listing.contains("CALL"), "{listing}");
    assert!(listing.contains("RET"), "{listing}");
}

#[test]
fn runner_is_reusable() {
    let runner = Runner::new("print(1 + 2);", "test.raf").unwrap();
    for backend in [Backend::Tree, Backend::Vm] {
        let mut print = CollectStringPrint::new();
        runner.run(backend, &mut print).unwrap();
        assert_eq!(print.output(), "3\n");
    }
}
