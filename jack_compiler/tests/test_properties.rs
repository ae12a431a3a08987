//! Properties the instruction stream must hold for any compiled unit:
//! deterministic output, balanced stack effects, per-subroutine label
//! uniqueness, and the declared failure modes.
use jack_compiler::{compile_str, engine::CompileError, symbols::SymbolError};

const FIXTURES: &[&str] = &[
    include_str!("main.jack"),
    include_str!("array.jack"),
    include_str!("point.jack"),
    include_str!("game.jack"),
    include_str!("flow.jack"),
    include_str!("greet.jack"),
    include_str!("calc.jack"),
];

/// Simulate the stack depth of each subroutine body, line by line.
///
/// Every expression nets +1 and every statement nets 0, so a linear
/// scan must never underflow, must hold exactly one value at every
/// `return`, and must be back at zero depth at function boundaries.
fn assert_balanced(code: &str) {
    let mut depth: i32 = 0;
    for line in code.lines() {
        let mut parts = line.split_whitespace();
        let op = parts.next().expect("blank instruction line");
        match op {
            "push" => depth += 1,
            "pop" => depth -= 1,
            "add" | "sub" | "eq" | "gt" | "lt" | "and" | "or" => depth -= 1,
            "neg" | "not" | "label" | "goto" => {}
            "if-goto" => depth -= 1,
            "call" => {
                let n_args: i32 = parts.nth(1).unwrap().parse().unwrap();
                depth += 1 - n_args;
            }
            "function" => {
                assert_eq!(depth, 0, "unbalanced stack at '{line}'");
            }
            "return" => {
                depth -= 1;
                assert_eq!(depth, 0, "return must leave exactly one value");
            }
            other => panic!("unknown instruction '{other}'"),
        }
        assert!(depth >= 0, "stack underflow at '{line}'");
    }
    assert_eq!(depth, 0);
}

#[test]
fn test_balanced_stack_contract() {
    for source in FIXTURES {
        assert_balanced(&compile_str(source).unwrap());
    }
}

#[test]
fn test_deterministic_output() {
    for source in FIXTURES {
        let first = compile_str(source).unwrap();
        let second = compile_str(source).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_labels_unique_per_subroutine() {
    let source = "\
class Loopy {
    function void a() {
        var int i;
        let i = 0;
        while (i < 2) { if (true) { let i = i + 1; } }
        while (i > 0) { let i = i - 1; }
        return;
    }
    function void b() {
        while (false) { }
        return;
    }
}";
    let code = compile_str(source).unwrap();

    for subroutine in code.split("function ").skip(1) {
        let labels: Vec<&str> = subroutine
            .lines()
            .filter(|line| line.starts_with("label "))
            .collect();
        let mut unique = labels.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(labels.len(), unique.len(), "duplicate label in\n{subroutine}");
    }

    // Counters reset per subroutine, so numbering restarts in b.
    assert_eq!(code.matches("label WHILE_EXP0").count(), 2);
    assert!(code.contains("label WHILE_EXP1"));
}

#[test]
fn test_array_read() {
    let code =
        compile_str("class A { function int at(Array arr, int i) { return arr[i]; } }").unwrap();
    assert!(code.contains(
        "push argument 0\npush argument 1\nadd\npop pointer 1\npush that 0\nreturn\n"
    ));
}

#[test]
fn test_true_is_not_of_zero() {
    let code = compile_str("class T { function boolean yes() { return true; } }").unwrap();
    assert!(code.contains("push constant 0\nnot\nreturn\n"));
}

#[test]
fn test_null_is_zero() {
    let code =
        compile_str("class N { function void clear(Array a) { let a = null; return; } }").unwrap();
    assert!(code.contains("push constant 0\npop argument 0\n"));
}

#[test]
fn test_local_shadows_field() {
    let code = compile_str(
        "class S { field int x; method int zero() { var int x; let x = 0; return x; } }",
    )
    .unwrap();
    assert!(code.contains("pop local 0"));
    assert!(!code.contains("pop this 0"));
}

#[test]
fn test_int_range_limits() {
    let code = compile_str("class Max { function int top() { return 32767; } }").unwrap();
    assert!(code.contains("push constant 32767"));

    let code = compile_str("class Min { function int zero() { return 0; } }").unwrap();
    assert!(code.contains("push constant 0"));
}

#[test]
fn test_int_out_of_range() {
    let err = compile_str("class Max { function int top() { return 32768; } }").unwrap_err();
    assert!(matches!(err, CompileError::IntOutOfRange(_)));
}

#[test]
fn test_redeclaration_fails() {
    let err = compile_str("class R { function void f() { var int x; var boolean x; return; } }")
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Symbol(SymbolError::Redefined { .. })
    ));
}

#[test]
fn test_unknown_let_target_fails() {
    let err = compile_str("class U { function void f() { let y = 1; return; } }").unwrap_err();
    assert!(matches!(err, CompileError::UnknownVariable(_)));
}

#[test]
fn test_missing_semicolon_fails() {
    let err = compile_str("class S { function int f() { return 1 } }").unwrap_err();
    assert!(matches!(err, CompileError::Token(_)));
}
