use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use rlox::{RunStatus, Session};

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn run(source: &str) -> (String, RunStatus) {
    let buffer = SharedBuffer::default();
    let mut session = Session::with_output(Box::new(buffer.clone()));
    let status = session.run(source);
    let output = String::from_utf8(buffer.0.borrow().clone()).expect("utf-8 output");
    (output, status)
}

fn run_ok(source: &str) -> String {
    let (output, status) = run(source);
    assert_eq!(status, RunStatus::Success, "program failed:\n{}", source);
    output
}

#[test]
fn arithmetic_follows_f64_semantics() {
    assert_eq!(
        run_ok("print (-50) * 23.133;"),
        format!("{}\n", -50.0f64 * 23.133)
    );
    assert_eq!(run_ok("print 1.0 / 2.0;"), "0.5\n");
    assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let (_, status) = run("print 1 / 0;");
    assert_eq!(status, RunStatus::RuntimeError);
}

#[test]
fn string_concatenation_coerces_numbers() {
    assert_eq!(run_ok("print \"a\" + \"b\";"), "ab\n");
    assert_eq!(run_ok("print \"x\" + 1;"), "x1\n");
    assert_eq!(run_ok("print 1 + \"x\";"), "1x\n");
}

#[test]
fn adding_number_and_boolean_is_a_type_error() {
    let (_, status) = run("print 1 + true;");
    assert_eq!(status, RunStatus::RuntimeError);
}

#[test]
fn comparison_requires_numbers() {
    let (_, status) = run("print \"a\" < \"b\";");
    assert_eq!(status, RunStatus::RuntimeError);
}

#[test]
fn equality_never_errors() {
    assert_eq!(run_ok("print nil == nil;"), "true\n");
    assert_eq!(run_ok("print 1 == \"1\";"), "false\n");
    assert_eq!(run_ok("print nil != false;"), "true\n");
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(run_ok("print \"hi\" or 2;"), "hi\n");
    assert_eq!(run_ok("print nil or \"yes\";"), "yes\n");
    assert_eq!(run_ok("print nil and 2;"), "nil\n");
    assert_eq!(
        run_ok("var touched = false; fun f() { touched = true; return 1; } print false and f(); print touched;"),
        "false\nfalse\n"
    );
}

#[test]
fn closures_capture_by_reference() {
    let source = "\
fun make() {
  var i = 0;
  fun inc() {
    i = i + 1;
    return i;
  }
  return inc;
}
var c = make();
print c();
print c();
";
    assert_eq!(run_ok(source), "1\n2\n");
}

#[test]
fn sibling_closures_share_one_frame() {
    let source = "\
var get; var set;
{
  var shared = 0;
  fun read() { return shared; }
  fun write(v) { shared = v; }
  get = read;
  set = write;
}
set(42);
print get();
";
    assert_eq!(run_ok(source), "42\n");
}

#[test]
fn block_shadowing_leaves_outer_binding_alone() {
    let source = "\
var x = \"outer\";
{
  var x = \"inner\";
  x = \"changed\";
  print x;
}
print x;
";
    assert_eq!(run_ok(source), "changed\nouter\n");
}

#[test]
fn resolver_pins_captured_bindings() {
    // The classic jlox scoping trap: the closure must keep seeing the
    // binding from its creation scope, not a later shadowing global.
    let source = "\
var a = \"global\";
{
  fun show() { print a; }
  show();
  var a = \"block\";
  show();
}
";
    assert_eq!(run_ok(source), "global\nglobal\n");
}

#[test]
fn anonymous_functions_are_values() {
    let source = "\
var twice = fun (f, x) { return f(f(x)); };
print twice(fun (n) { return n + 1; }, 5);
";
    assert_eq!(run_ok(source), "7\n");
}

#[test]
fn recursion_through_the_declaring_scope() {
    let source = "\
fun fib(n) {
  if (n < 2) return n;
  return fib(n - 1) + fib(n - 2);
}
print fib(10);
";
    assert_eq!(run_ok(source), "55\n");
}

#[test]
fn inherited_methods_bind_the_subclass_instance() {
    let source = "\
class Animal {
  speak() {
    return this.name + \" makes a sound\";
  }
}
class Dog < Animal {}
var d = Dog();
d.name = \"Rex\";
print d.speak();
";
    assert_eq!(run_ok(source), "Rex makes a sound\n");
}

#[test]
fn super_dispatches_above_the_defining_class() {
    let source = "\
class A {
  method() { print \"A method\"; }
}
class B < A {
  method() { print \"B method\"; }
  test() { super.method(); }
}
class C < B {}
C().test();
";
    assert_eq!(run_ok(source), "A method\n");
}

#[test]
fn init_always_returns_the_instance() {
    let source = "\
class Point {
  init(x, y) {
    this.x = x;
    this.y = y;
    if (x == 0) return;
    this.origin = false;
  }
}
var p = Point(0, 3);
print p.x + p.y;
print Point(1, 2).origin;
";
    assert_eq!(run_ok(source), "3\nfalse\n");
}

#[test]
fn calling_init_again_still_yields_the_instance() {
    let source = "\
class A {
  init() { this.field = \"set\"; }
}
var a = A();
a.field = \"other\";
print a.init().field;
";
    assert_eq!(run_ok(source), "set\n");
}

#[test]
fn class_arity_comes_from_init() {
    let (_, status) = run("class P { init(x) {} } P(1, 2);");
    assert_eq!(status, RunStatus::RuntimeError);
}

#[test]
fn calling_a_non_callable_is_a_type_error() {
    let (_, status) = run("var x = 1; x();");
    assert_eq!(status, RunStatus::RuntimeError);
}

#[test]
fn property_access_on_non_instances_fails() {
    let (_, status) = run("var x = 1; print x.field;");
    assert_eq!(status, RunStatus::RuntimeError);
}

#[test]
fn unknown_property_fails() {
    let (_, status) = run("class A {} print A().missing;");
    assert_eq!(status, RunStatus::RuntimeError);
}

#[test]
fn fields_shadow_methods() {
    let source = "\
class A {
  greet() { return \"method\"; }
}
var a = A();
a.greet = fun () { return \"field\"; };
print a.greet();
";
    assert_eq!(run_ok(source), "field\n");
}

#[test]
fn break_exits_only_the_innermost_loop() {
    let source = "\
for (var i = 0; i < 3; i = i + 1) {
  for (var j = 0; j < 3; j = j + 1) {
    if (j == 1) break;
    print i * 10 + j;
  }
}
";
    assert_eq!(run_ok(source), "0\n10\n20\n");
}

#[test]
fn break_outside_a_loop_is_a_static_error() {
    let (output, status) = run("break;");
    assert_eq!(status, RunStatus::StaticError);
    assert_eq!(output, "");
}

#[test]
fn while_loops_run_until_falsy() {
    let source = "\
var n = 0;
while (n < 3) {
  print n;
  n = n + 1;
}
";
    assert_eq!(run_ok(source), "0\n1\n2\n");
}

#[test]
fn runtime_error_aborts_only_the_failing_statement() {
    let (output, status) = run("print undefined_thing; print \"still here\";");
    assert_eq!(status, RunStatus::RuntimeError);
    assert_eq!(output, "still here\n");
}

#[test]
fn top_level_expressions_render_their_value() {
    assert_eq!(run_ok("1 + 2;"), "3\n");
}

#[test]
fn printed_tree_reparses_to_the_same_result() {
    use rlox::ast::Stmt;
    use rlox::ast_printer::print_expr;
    use rlox::parser::Parser;
    use rlox::scanner::Scanner;

    let source = "print (-50) * 23.133;";
    let tokens = Scanner::new(source).scan_tokens();
    let mut parser = Parser::new(&tokens);
    let statements = parser.parse();
    let Stmt::Print { expression } = &statements[0] else {
        panic!("expected print statement");
    };

    let rendered = format!("print {};", print_expr(expression));
    assert_eq!(run_ok(source), run_ok(&rendered));
}

#[test]
fn clock_is_predefined() {
    assert_eq!(run_ok("print clock() > 0;"), "true\n");
}

#[test]
fn nil_prints_as_nil() {
    assert_eq!(run_ok("var x; print x;"), "nil\n");
}
