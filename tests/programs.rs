//! Whole programs driven through the public session API, checking what they
//! print and how they fail.

use treelox::error::LoxError;
use treelox::session::Lox;

fn run(source: &str) -> (String, Result<(), LoxError>) {
    let mut output = Vec::new();
    let result = {
        let mut lox = Lox::new(&mut output);
        lox.run(source)
    };
    (String::from_utf8(output).expect("output is utf-8"), result)
}

fn expect_output(source: &str, expected: &str) {
    let (output, result) = run(source);
    assert_eq!(result, Ok(()), "program failed: {}", source);
    assert_eq!(output, expected);
}

#[test]
fn addition() {
    expect_output("print 1 + 2;", "3\n");
}

#[test]
fn string_concatenation() {
    expect_output("var a = \"hi\"; var b = \" there\"; print a + b;", "hi there\n");
}

#[test]
fn closure_counter() {
    expect_output(
        "fun make(n) { fun inner() { n = n + 1; return n; } return inner; } \
         var c = make(10); print c(); print c();",
        "11\n12\n",
    );
}

#[test]
fn method_reads_field_through_this() {
    expect_output(
        "class A { greet() { print \"hello \" + this.name; } } \
         var a = A(); a.name = \"world\"; a.greet();",
        "hello world\n",
    );
}

#[test]
fn initializer_and_methods() {
    expect_output(
        "class Counter { init(n) { this.n = n; } \
         bump() { this.n = this.n + 1; return this.n; } } \
         var k = Counter(0); print k.bump(); print k.bump();",
        "1\n2\n",
    );
}

#[test]
fn for_loop_accumulates() {
    expect_output(
        "var i = 0; for (var j = 0; j < 3; j = j + 1) i = i + j; print i;",
        "3\n",
    );
}

#[test]
fn adding_string_and_number_is_a_runtime_error() {
    let (output, result) = run("print \"x\" + 1;");
    assert_eq!(result, Err(LoxError::Runtime));
    assert_eq!(output, "");
}

#[test]
fn runtime_error_message_and_line() {
    let mut output = Vec::new();
    let mut lox = Lox::new(&mut output);
    assert_eq!(lox.run("print \"x\" + 1;"), Err(LoxError::Runtime));
    assert_eq!(
        lox.diagnostics(),
        ["operands should be numbers or strings\n[line 1]"]
    );
}

#[test]
fn every_parse_error_is_reported_before_giving_up() {
    let mut output = Vec::new();
    let mut lox = Lox::new(&mut output);
    assert_eq!(lox.run("var 1;\nprint 2;\nvar = 3;"), Err(LoxError::Syntax));
    assert_eq!(lox.diagnostics().len(), 2);
    // Nothing ran, including the well-formed middle statement.
    assert!(output.is_empty());
}

#[test]
fn shadowing_and_scope_exit() {
    expect_output(
        "var a = \"outer\"; { var a = \"inner\"; print a; } print a;",
        "inner\nouter\n",
    );
}

#[test]
fn closures_share_their_defining_frame() {
    expect_output(
        "fun pair() { var n = 0; fun get() { return n; } fun set(v) { n = v; } \
         print get(); set(9); print get(); } \
         pair();",
        "0\n9\n",
    );
}

#[test]
fn inheritance_dispatch_and_super() {
    expect_output(
        "class Animal { init(name) { this.name = name; } \
         speak() { return this.name + \" makes a sound\"; } } \
         class Dog < Animal { speak() { return super.speak() + \": woof\"; } } \
         print Dog(\"Rex\").speak();",
        "Rex makes a sound: woof\n",
    );
}

#[test]
fn init_called_directly_returns_the_instance() {
    expect_output(
        "class A { init() { this.x = 1; } } \
         var a = A(); var b = a.init(); print a == b;",
        "true\n",
    );
}

#[test]
fn global_var_initialized_from_enclosing_global() {
    expect_output("var x = 1; var x = x + 1; print x;", "2\n");
}

#[test]
fn value_formatting() {
    expect_output("print nil;", "nil\n");
    expect_output("print true; print false;", "true\nfalse\n");
    expect_output("print 4 - 1;", "3\n");
    expect_output("fun f() {} print f;", "<fn f>\n");
    expect_output("print clock;", "<native fn>\n");
    expect_output("class C {} print C; print C();", "C\nC instance\n");
}

#[test]
fn fibonacci_program() {
    expect_output(
        "fun fib(n) { if (n < 2) return n; return fib(n - 2) + fib(n - 1); } \
         for (var i = 0; i < 8; i = i + 1) print fib(i);",
        "0\n1\n1\n2\n3\n5\n8\n13\n",
    );
}

#[test]
fn statements_after_a_runtime_error_do_not_run() {
    let (output, result) = run("print 1; print missing; print 2;");
    assert_eq!(result, Err(LoxError::Runtime));
    assert_eq!(output, "1\n");
}
