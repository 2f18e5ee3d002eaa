use minic_compiler::ast::{Expr, Item, Program, Stmt};
use minic_compiler::{check, compile_to_il, semantic, CompileError, Diagnostic, SemanticErrorKind};

fn diagnostics(source: &str) -> Vec<Diagnostic> {
    let (_, diagnostics) = check(source).expect("source should parse");
    diagnostics
}

fn kinds(source: &str) -> Vec<SemanticErrorKind> {
    diagnostics(source).into_iter().map(|d| d.kind).collect()
}

fn assert_semantic_error(result: Result<String, CompileError>, expected: SemanticErrorKind) {
    match result {
        Err(CompileError::Semantic(diagnostics)) => assert!(
            diagnostics.iter().any(|d| d.kind == expected),
            "expected {}, got {:?}",
            expected,
            diagnostics
        ),
        Err(other) => panic!("expected {}, got {}", expected, other),
        Ok(_) => panic!("expected {}, but compilation succeeded", expected),
    }
}

// ── Declarations ─────────────────────────────────────────────────────────

#[test]
fn variable_redefinition_reported_once() {
    let source = "int main() {\n    int a = 5;\n    int b = 10;\n    int a = 20;\n    return a + b;\n}";
    let d = diagnostics(source);
    assert_eq!(d.len(), 1, "{:?}", d);
    assert_eq!(d[0].kind, SemanticErrorKind::VariableRedefinition);
    assert_eq!(d[0].line, Some(4));
}

#[test]
fn shadowing_in_nested_block_is_allowed() {
    let source = "int main() { int a = 1; { int a = 2; a = 3; } return a; }";
    assert!(kinds(source).is_empty());
}

#[test]
fn array_redefinition() {
    let source = "int x[5]; int x[10]; int main() { return 0; }";
    assert_semantic_error(compile_to_il(source), SemanticErrorKind::ArrayRedefinition);
}

#[test]
fn function_redefinition() {
    let source = "int f() { return 1; } int f() { return 2; } int main() { return f(); }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::FunctionRedefinition]);
}

#[test]
fn parameter_redefinition() {
    let source = "int f(int a, int a) { return a; } int main() { return 0; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::ParameterRedefinition]);
}

// ── Name resolution ──────────────────────────────────────────────────────

#[test]
fn undefined_variable() {
    let source = "int main() { y = 3; return 0; }";
    assert_semantic_error(compile_to_il(source), SemanticErrorKind::UndefinedVariable);
}

#[test]
fn builtin_names_cannot_be_incremented() {
    assert_eq!(
        kinds("int main() { NULL++; return 0; }"),
        vec![SemanticErrorKind::UndefinedVariable]
    );
    assert_eq!(
        kinds("int main() { cout--; return 0; }"),
        vec![SemanticErrorKind::UndefinedVariable]
    );
}

#[test]
fn loop_body_variable_out_of_scope_after_loop() {
    let source = r#"
int main() {
    for (int i = 0; i < 5; i++) {
        int temp = i * 2;
    }
    temp = 10;
    return 0;
}
"#;
    let d = diagnostics(source);
    assert_eq!(d.len(), 1, "{:?}", d);
    assert_eq!(d[0].kind, SemanticErrorKind::OutOfScope);
    assert_eq!(d[0].line, Some(6));
}

#[test]
fn loop_counter_out_of_scope_after_loop() {
    let source = "int main() { for (int i = 0; i < 3; i++) { } return i; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::OutOfScope]);
}

#[test]
fn block_variable_out_of_scope_after_block() {
    let source = "int main() { { int t = 1; } t = 2; return 0; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::OutOfScope]);
}

#[test]
fn if_body_variable_out_of_scope_after_if() {
    let source = "int main() {\n    bool c = true;\n    if (c) { int y = 1; }\n    y = 2;\n    return 0;\n}";
    let d = diagnostics(source);
    assert_eq!(d.len(), 1, "{:?}", d);
    assert_eq!(d[0].kind, SemanticErrorKind::OutOfScope);
    assert_eq!(d[0].line, Some(4));
}

#[test]
fn else_body_variable_out_of_scope_after_if() {
    let source = "int main() { bool c = true; if (c) { } else { int z = 1; } return z; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::OutOfScope]);
}

#[test]
fn while_body_variable_out_of_scope_after_loop() {
    let source = "int main() { int c = 1; while (c) { int w = 1; c = 0; } return w; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::OutOfScope]);
}

#[test]
fn other_functions_locals_are_undeclared() {
    let source = r#"
int func1() {
    int local_var = 10;
    return local_var;
}
int main() {
    local_var = 20;
    return 0;
}
"#;
    assert_eq!(kinds(source), vec![SemanticErrorKind::UndefinedVariable]);
}

#[test]
fn undefined_function() {
    let source = "int main() { int x = foo(); return x; }";
    assert_semantic_error(compile_to_il(source), SemanticErrorKind::UndefinedFunction);
}

#[test]
fn variable_called_as_function() {
    let source = "int main() { int g = 1; return g(2); }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::NotAFunction]);
}

#[test]
fn scalar_indexed_as_array() {
    let source = "int main() { int x = 1; return x[0]; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::NotAnArray]);
}

// ── Types ────────────────────────────────────────────────────────────────

#[test]
fn binary_operand_mismatch() {
    let source = "int main() { char c = 'a'; int n = c + true; return n; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::TypeMismatch]);
}

#[test]
fn int_does_not_narrow_to_char() {
    let source = "int main() { char c = 65; return 0; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::TypeMismatch]);
}

#[test]
fn directional_coercions_are_accepted() {
    let source = "int main() { int n = 'A'; bool f = 5; f = n; return n; }";
    assert!(kinds(source).is_empty());
}

#[test]
fn comparison_requires_identical_types() {
    let source = "int main() { int x = 1; if (x > 'A') { x = 2; } return x; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::TypeMismatch]);
}

#[test]
fn char_condition_is_rejected() {
    let source = "int main() { char c = 'a'; while (c) { c = 'b'; } return 0; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::ConditionType]);
}

#[test]
fn int_condition_is_accepted() {
    let source = "int main() { int n = 3; while (n) { n = n - 1; } return n; }";
    assert!(kinds(source).is_empty());
}

#[test]
fn printing_an_array_is_rejected() {
    let source = "int main() { int a[2]; cout << a; return 0; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::TypeMismatch]);
}

// ── Calls ────────────────────────────────────────────────────────────────

#[test]
fn argument_count_mismatch_reported_once() {
    let source = r#"
int add(int a, int b) { return a + b; }
int main() { int x = add(1, 2, 3); return x; }
"#;
    let d = diagnostics(source);
    assert_eq!(d.len(), 1, "{:?}", d);
    assert_eq!(d[0].kind, SemanticErrorKind::ArgumentCountMismatch);
}

#[test]
fn too_few_arguments() {
    let source = "int add(int a, int b) { return a + b; } int main() { return add(1); }";
    assert_semantic_error(compile_to_il(source), SemanticErrorKind::ArgumentCountMismatch);
}

#[test]
fn arguments_are_not_coerced() {
    let source = "int twice(int n) { return n * 2; } int main() { return twice('a'); }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::ArgumentTypeMismatch]);
}

// ── Returns ──────────────────────────────────────────────────────────────

#[test]
fn return_outside_function() {
    let program = Program {
        includes: Vec::new(),
        usings: Vec::new(),
        items: vec![Item::Global(Stmt::Return {
            line: 1,
            value: Some(Expr::Number(1, 0)),
        })],
    };
    let d = semantic::analyze(&program);
    assert_eq!(d.len(), 1);
    assert_eq!(d[0].kind, SemanticErrorKind::ReturnOutsideFunction);
}

#[test]
fn int_returned_from_bool_function() {
    let d = diagnostics("bool f() { return 5; } int main() { return 0; }");
    assert_eq!(d.len(), 1, "{:?}", d);
    assert_eq!(d[0].kind, SemanticErrorKind::TypeMismatch);

    assert!(kinds("bool f() { return true; } int main() { return 0; }").is_empty());
}

#[test]
fn char_returned_from_int_function() {
    assert!(kinds("int f() { return 'a'; } int main() { return f(); }").is_empty());
}

#[test]
fn missing_return_value() {
    let source = "int f() { return; } int main() { return 0; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::ReturnValue]);
}

#[test]
fn value_returned_from_void_function() {
    let source = "void f() { return 1; } int main() { return 0; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::ReturnValue]);
}

// ── Arrays ───────────────────────────────────────────────────────────────

#[test]
fn literal_index_bounds() {
    assert!(kinds("int main() { int x[3]; return x[3]; }").is_empty());
    assert_eq!(
        kinds("int main() { int x[3]; return x[5]; }"),
        vec![SemanticErrorKind::IndexOutOfBounds]
    );
}

#[test]
fn index_must_be_int() {
    let source = "int main() { int a[4]; return a[true]; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::IndexType]);
}

#[test]
fn initializer_longer_than_array() {
    let source = "int main() { int a[2] = {1, 2, 3}; return 0; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::InitializerTooLong]);
}

#[test]
fn initializer_elements_must_match_exactly() {
    let source = "int main() { int a[2] = {1, 'b'}; return 0; }";
    assert_eq!(kinds(source), vec![SemanticErrorKind::TypeMismatch]);
}

#[test]
fn zero_sized_array() {
    let source = "int a[0]; int main() { return 0; }";
    assert_semantic_error(compile_to_il(source), SemanticErrorKind::InvalidArraySize);
}

// ── Whole-program behaviour ──────────────────────────────────────────────

#[test]
fn analysis_continues_past_errors() {
    let source =
        std::fs::read_to_string("../samples/type_errors.cpp").expect("Failed to read samples/type_errors.cpp");
    let d = diagnostics(&source);
    assert_eq!(d.len(), 11, "{:#?}", d);
    let arg_errors = d
        .iter()
        .filter(|d| d.kind == SemanticErrorKind::ArgumentTypeMismatch)
        .count();
    assert_eq!(arg_errors, 4);
}

#[test]
fn analysis_is_repeatable() {
    let source =
        std::fs::read_to_string("../samples/type_errors.cpp").expect("Failed to read samples/type_errors.cpp");
    let (parsed, first) = check(&source).unwrap();
    let second = semantic::analyze(&parsed.program);
    assert_eq!(first, second);
}

#[test]
fn syntax_error_is_fatal() {
    let source = "int main() {\n    int x = ;\n}";
    match compile_to_il(source) {
        Err(CompileError::Parse { line, message, .. }) => {
            assert_eq!(line, 2);
            assert!(message.contains("Unexpected token"), "{}", message);
        }
        other => panic!("expected a parse error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn unexpected_end_of_input() {
    let result = compile_to_il("int main() { return 0;");
    assert!(matches!(result, Err(CompileError::Parse { .. })));
}

#[test]
fn lexical_errors_do_not_stop_analysis() {
    let (parsed, d) = check("int main() {\n    int x = 1 @;\n    return x;\n}").unwrap();
    assert!(d.is_empty());
    assert_eq!(parsed.lexical_errors.len(), 1);
    assert_eq!(parsed.lexical_errors[0].line, 2);
    assert_eq!(parsed.lexical_errors[0].unexpected_char, '@');
}

#[test]
fn semantic_error_display_carries_kind_and_line() {
    let err = compile_to_il("int main() {\n  return missing;\n}").unwrap_err();
    let text = err.to_string();
    assert!(text.contains("UndefinedVariable"), "{}", text);
    assert!(text.contains("line 2"), "{}", text);
}

#[test]
fn lexical_errors_block_code_generation() {
    match compile_to_il("int main() {\n    int x = 1 @;\n    return x;\n}") {
        Err(CompileError::Lexical(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].line, 2);
        }
        other => panic!("expected a lexical error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn oversized_literal_never_reaches_code_generation() {
    let source = "int main() { int x = 1 3000000000; return x; }";
    let (parsed, d) = check(source).unwrap();
    assert!(d.is_empty(), "{:?}", d);
    assert_eq!(parsed.lexical_errors.len(), 1);
    assert_eq!(parsed.lexical_errors[0].text, "3000000000");
    assert!(matches!(compile_to_il(source), Err(CompileError::Lexical(_))));

    let result = compile_to_il("int main() { int x = 3000000000; return x; }");
    assert!(matches!(result, Err(CompileError::Parse { .. })), "{:?}", result.map(|_| ()));
}

#[test]
fn largest_literal_compiles() {
    let il = compile_to_il("int main() { return 2147483647; }").unwrap();
    assert!(il.contains("ldc.i4 2147483647"), "{}", il);
}
