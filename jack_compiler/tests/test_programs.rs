//! End-to-end compilation of whole source units, checked against the
//! exact instruction stream each one must produce.
use jack_compiler::compile_str;

#[test]
fn test_compile_main() {
    let code = compile_str(include_str!("main.jack")).unwrap();
    let expected = "\
function Main.main 0
push constant 1
push constant 2
add
call Output.printInt 1
pop temp 0
push constant 0
return
";
    assert_eq!(code, expected);
}

#[test]
fn test_compile_array_write() {
    let code = compile_str(include_str!("array.jack")).unwrap();
    // The target address sits under the value; the value is parked in
    // temp 0 so the address can be popped into pointer 1.
    let expected = "\
function Main.fill 2
push local 0
push local 1
add
push constant 5
pop temp 0
pop pointer 1
push temp 0
pop that 0
push constant 0
return
";
    assert_eq!(code, expected);
}

#[test]
fn test_compile_constructor_and_method() {
    let code = compile_str(include_str!("point.jack")).unwrap();
    let expected = "\
function Point.new 0
push constant 2
call Memory.alloc 1
pop pointer 0
push argument 0
pop this 0
push argument 1
pop this 1
push static 0
push constant 1
add
pop static 0
push pointer 0
return
function Point.getX 0
push argument 0
pop pointer 0
push this 0
return
";
    assert_eq!(code, expected);
}

#[test]
fn test_compile_call_dispatch() {
    let code = compile_str(include_str!("game.jack")).unwrap();
    let expected = "\
function Game.run 1
push argument 0
pop pointer 0
push constant 0
pop local 0
label WHILE_EXP0
push local 0
not
not
if-goto WHILE_END0
push this 0
call Square.move 1
pop temp 0
push pointer 0
call Game.draw 1
pop temp 0
goto WHILE_EXP0
label WHILE_END0
push constant 0
return
function Game.draw 0
push argument 0
pop pointer 0
push constant 0
push constant 0
push constant 10
push constant 10
call Screen.drawRectangle 4
pop temp 0
push constant 0
return
";
    assert_eq!(code, expected);
}

#[test]
fn test_compile_nested_if() {
    let code = compile_str(include_str!("flow.jack")).unwrap();
    let expected = "\
function Flow.classify 0
push argument 0
push constant 10
lt
if-goto IF_TRUE0
goto IF_FALSE0
label IF_TRUE0
push argument 0
push constant 5
lt
if-goto IF_TRUE1
goto IF_FALSE1
label IF_TRUE1
push constant 0
return
goto IF_END1
label IF_FALSE1
push constant 1
return
label IF_END1
goto IF_END0
label IF_FALSE0
push constant 2
return
label IF_END0
";
    assert_eq!(code, expected);
}

#[test]
fn test_compile_string_constant() {
    let code = compile_str(include_str!("greet.jack")).unwrap();
    let expected = "\
function Greet.hello 0
push constant 3
call String.new 1
push constant 72
call String.appendChar 2
push constant 105
call String.appendChar 2
push constant 33
call String.appendChar 2
return
";
    assert_eq!(code, expected);
}

#[test]
fn test_compile_operators() {
    let code = compile_str(include_str!("calc.jack")).unwrap();
    let expected = "\
function Calc.mix 0
push argument 0
push argument 1
call Math.multiply 2
push argument 0
push constant 2
call Math.divide 2
add
push constant 1
sub
return
";
    assert_eq!(code, expected);
}
