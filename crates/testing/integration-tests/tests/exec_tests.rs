//! Execution tests: lowered IR run through the reference interpreter

use integration_tests::{decl, stmt, ProgramBuilder};
use lk_ast::{BinaryOp, BindingKind, ParamKind, RetTy, UnaryOp};
use lk_intern::Interner;
use lk_interp::{InterpError, Interpreter, Val};
use lk_ir::Module;
use lk_lower::lower_program;

fn compile(pb: ProgramBuilder) -> (Module, Interner) {
    let (program, mut interner) = pb.finish();
    let module = lower_program(&program, &mut interner).expect("lowering should succeed");
    (module, interner)
}

#[test]
fn literal_arithmetic_follows_the_precedence_ladder() {
    let mut pb = ProgramBuilder::new();
    // return 2 + 3 * 4 - 10 / 2;
    let two = pb.lit(2);
    let three = pb.lit(3);
    let four = pb.lit(4);
    let ten = pb.lit(10);
    let half = pb.lit(2);
    let product = pb.binary(BinaryOp::Mul, three, four);
    let sum = pb.binary(BinaryOp::Add, two, product);
    let quotient = pb.binary(BinaryOp::Div, ten, half);
    let total = pb.binary(BinaryOp::Sub, sum, quotient);
    let ret = pb.ret(Some(total));
    pb.func(RetTy::Int, "calc", &[], vec![stmt(ret)]);

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("calc", &[]), Ok(Val::Int(9)));
}

#[test]
fn comparisons_are_integers_zero_or_one() {
    let mut pb = ProgramBuilder::new();
    // return (1 < 2) + (3 == 3);
    let one = pb.lit(1);
    let two = pb.lit(2);
    let lt = pb.binary(BinaryOp::Lt, one, two);
    let three_a = pb.lit(3);
    let three_b = pb.lit(3);
    let eq = pb.binary(BinaryOp::Eq, three_a, three_b);
    let lt_paren = pb.paren(lt);
    let eq_paren = pb.paren(eq);
    let sum = pb.binary(BinaryOp::Add, lt_paren, eq_paren);
    let ret = pb.ret(Some(sum));
    pb.func(RetTy::Int, "flags", &[], vec![stmt(ret)]);

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("flags", &[]), Ok(Val::Int(2)));
}

#[test]
fn logical_not_canonicalizes() {
    let mut pb = ProgramBuilder::new();
    let x = pb.read("x");
    let not = pb.unary(UnaryOp::Not, x);
    let ret = pb.ret(Some(not));
    pb.func(RetTy::Int, "bang", &[("x", ParamKind::Int)], vec![stmt(ret)]);

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("bang", &[Val::Int(0)]), Ok(Val::Int(1)));
    assert_eq!(interp.run("bang", &[Val::Int(5)]), Ok(Val::Int(0)));
}

#[test]
fn logical_operators_evaluate_both_operands() {
    let mut pb = ProgramBuilder::new();
    // int tick() { putint(1); return 1; }
    let one = pb.lit(1);
    let put = pb.call("putint", vec![one]);
    let put_stmt = pb.expr_stmt(put);
    let ret_one = pb.lit(1);
    let ret1 = pb.ret(Some(ret_one));
    pb.func(RetTy::Int, "tick", &[], vec![stmt(put_stmt), stmt(ret1)]);
    // int eager() { return 0 && tick(); }
    let zero = pb.lit(0);
    let tick = pb.call("tick", vec![]);
    let and = pb.binary(BinaryOp::And, zero, tick);
    let ret = pb.ret(Some(and));
    pb.func(RetTy::Int, "eager", &[], vec![stmt(ret)]);

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("eager", &[]), Ok(Val::Int(0)));
    // the right operand ran even though the left alone decides the result
    assert_eq!(interp.output(), &[1]);
}

#[test]
fn shadowed_bindings_leave_the_outer_one_unchanged() {
    let mut pb = ProgramBuilder::new();
    // int shadow() { int x = 1; { int x = 2; x = 99; } return x; }
    let one = pb.lit(1);
    let outer = pb.decl(BindingKind::Var, "x", Some(one));
    let two = pb.lit(2);
    let inner = pb.decl(BindingKind::Var, "x", Some(two));
    let ninety_nine = pb.lit(99);
    let set_inner = pb.assign("x", ninety_nine);
    let block = pb.block_stmt(vec![decl(inner), stmt(set_inner)]);
    let x = pb.read("x");
    let ret = pb.ret(Some(x));
    pb.func(
        RetTy::Int,
        "shadow",
        &[],
        vec![decl(outer), stmt(block), stmt(ret)],
    );

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("shadow", &[]), Ok(Val::Int(1)));
}

#[test]
fn short_array_initializers_pad_with_zero() {
    let mut pb = ProgramBuilder::new();
    // int pad() { int a[3] = {1, 2}; return a[0]*100 + a[1]*10 + a[2]; }
    let three = pb.lit(3);
    let one = pb.lit(1);
    let two = pb.lit(2);
    let arr = pb.array_decl(BindingKind::Var, "a", three, vec![one, two]);
    let idx0 = pb.lit(0);
    let a0 = pb.read_at("a", idx0);
    let hundred = pb.lit(100);
    let h = pb.binary(BinaryOp::Mul, a0, hundred);
    let idx1 = pb.lit(1);
    let a1 = pb.read_at("a", idx1);
    let ten = pb.lit(10);
    let t = pb.binary(BinaryOp::Mul, a1, ten);
    let idx2 = pb.lit(2);
    let a2 = pb.read_at("a", idx2);
    let ht = pb.binary(BinaryOp::Add, h, t);
    let total = pb.binary(BinaryOp::Add, ht, a2);
    let ret = pb.ret(Some(total));
    pb.func(RetTy::Int, "pad", &[], vec![decl(arr), stmt(ret)]);

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("pad", &[]), Ok(Val::Int(120)));
}

#[test]
fn oversized_array_initializers_truncate() {
    let mut pb = ProgramBuilder::new();
    // int trunc() { int a[2] = {1, 2, 3, 4}; return a[0]*10 + a[1]; }
    let two = pb.lit(2);
    let inits: Vec<_> = (1..=4).map(|value| pb.lit(value)).collect();
    let arr = pb.array_decl(BindingKind::Var, "a", two, inits);
    let idx0 = pb.lit(0);
    let a0 = pb.read_at("a", idx0);
    let ten = pb.lit(10);
    let scaled = pb.binary(BinaryOp::Mul, a0, ten);
    let idx1 = pb.lit(1);
    let a1 = pb.read_at("a", idx1);
    let total = pb.binary(BinaryOp::Add, scaled, a1);
    let ret = pb.ret(Some(total));
    pb.func(RetTy::Int, "trunc", &[], vec![decl(arr), stmt(ret)]);

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("trunc", &[]), Ok(Val::Int(12)));
}

#[test]
fn array_arguments_decay_to_pointers() {
    let mut pb = ProgramBuilder::new();
    // int sum(int a[], int n) { int s = 0; int i = 0;
    //   while (i < n) { s = s + a[i]; i = i + 1; } return s; }
    let zero_s = pb.lit(0);
    let s_decl = pb.decl(BindingKind::Var, "s", Some(zero_s));
    let zero_i = pb.lit(0);
    let i_decl = pb.decl(BindingKind::Var, "i", Some(zero_i));
    let i_cond = pb.read("i");
    let n = pb.read("n");
    let cond = pb.binary(BinaryOp::Lt, i_cond, n);
    let s = pb.read("s");
    let i_index = pb.read("i");
    let elem = pb.read_at("a", i_index);
    let added = pb.binary(BinaryOp::Add, s, elem);
    let set_s = pb.assign("s", added);
    let i_step = pb.read("i");
    let one = pb.lit(1);
    let inc = pb.binary(BinaryOp::Add, i_step, one);
    let set_i = pb.assign("i", inc);
    let body = pb.block_stmt(vec![stmt(set_s), stmt(set_i)]);
    let loop_stmt = pb.while_stmt(cond, body);
    let s_ret = pb.read("s");
    let ret = pb.ret(Some(s_ret));
    pb.func(
        RetTy::Int,
        "sum",
        &[("a", ParamKind::IntArray), ("n", ParamKind::Int)],
        vec![decl(s_decl), decl(i_decl), stmt(loop_stmt), stmt(ret)],
    );
    // int main0() { int buf[4] = {1, 2, 3, 4}; return sum(buf, 4); }
    let four = pb.lit(4);
    let inits: Vec<_> = (1..=4).map(|value| pb.lit(value)).collect();
    let buf = pb.array_decl(BindingKind::Var, "buf", four, inits);
    let buf_arg = pb.read("buf");
    let four_arg = pb.lit(4);
    let call = pb.call("sum", vec![buf_arg, four_arg]);
    let ret_call = pb.ret(Some(call));
    pb.func(RetTy::Int, "main0", &[], vec![decl(buf), stmt(ret_call)]);

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("main0", &[]), Ok(Val::Int(10)));
}

#[test]
fn global_variables_persist_across_calls() {
    let mut pb = ProgramBuilder::new();
    let five = pb.lit(5);
    let g = pb.decl(BindingKind::Var, "g", Some(five));
    pb.global(g);
    // void bump() { g = g + 1; }
    let g_read = pb.read("g");
    let one = pb.lit(1);
    let plus = pb.binary(BinaryOp::Add, g_read, one);
    let set = pb.assign("g", plus);
    pb.func(RetTy::Void, "bump", &[], vec![stmt(set)]);
    // int readg() { return g; }
    let g_ret = pb.read("g");
    let ret = pb.ret(Some(g_ret));
    pb.func(RetTy::Int, "readg", &[], vec![stmt(ret)]);

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("bump", &[]), Ok(Val::Unit));
    assert_eq!(interp.run("bump", &[]), Ok(Val::Unit));
    assert_eq!(interp.run("readg", &[]), Ok(Val::Int(7)));
}

#[test]
fn continue_skips_to_the_condition() {
    let mut pb = ProgramBuilder::new();
    // int odds(int n) { int s = 0; int i = 0;
    //   while (i < n) { i = i + 1; if (i % 2 == 0) continue; s = s + i; }
    //   return s; }
    let zero_s = pb.lit(0);
    let s_decl = pb.decl(BindingKind::Var, "s", Some(zero_s));
    let zero_i = pb.lit(0);
    let i_decl = pb.decl(BindingKind::Var, "i", Some(zero_i));
    let i_cond = pb.read("i");
    let n = pb.read("n");
    let cond = pb.binary(BinaryOp::Lt, i_cond, n);
    let i_step = pb.read("i");
    let one = pb.lit(1);
    let inc = pb.binary(BinaryOp::Add, i_step, one);
    let set_i = pb.assign("i", inc);
    let i_rem = pb.read("i");
    let two = pb.lit(2);
    let rem = pb.binary(BinaryOp::Rem, i_rem, two);
    let zero = pb.lit(0);
    let even = pb.binary(BinaryOp::Eq, rem, zero);
    let cont = pb.continue_stmt();
    let skip = pb.if_stmt(even, cont, None);
    let s_read = pb.read("s");
    let i_add = pb.read("i");
    let added = pb.binary(BinaryOp::Add, s_read, i_add);
    let set_s = pb.assign("s", added);
    let body = pb.block_stmt(vec![stmt(set_i), stmt(skip), stmt(set_s)]);
    let loop_stmt = pb.while_stmt(cond, body);
    let s_ret = pb.read("s");
    let ret = pb.ret(Some(s_ret));
    pb.func(
        RetTy::Int,
        "odds",
        &[("n", ParamKind::Int)],
        vec![decl(s_decl), decl(i_decl), stmt(loop_stmt), stmt(ret)],
    );

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("odds", &[Val::Int(5)]), Ok(Val::Int(9)));
}

#[test]
fn recursion_terminates_through_early_returns() {
    let mut pb = ProgramBuilder::new();
    // int fact(int n) { if (n < 2) return 1; return n * fact(n - 1); }
    let n_check = pb.read("n");
    let two = pb.lit(2);
    let small = pb.binary(BinaryOp::Lt, n_check, two);
    let one = pb.lit(1);
    let ret_one = pb.ret(Some(one));
    let base = pb.if_stmt(small, ret_one, None);
    let n = pb.read("n");
    let n_arg = pb.read("n");
    let one_arg = pb.lit(1);
    let minus = pb.binary(BinaryOp::Sub, n_arg, one_arg);
    let rec = pb.call("fact", vec![minus]);
    let product = pb.binary(BinaryOp::Mul, n, rec);
    let ret = pb.ret(Some(product));
    pb.func(
        RetTy::Int,
        "fact",
        &[("n", ParamKind::Int)],
        vec![stmt(base), stmt(ret)],
    );

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("fact", &[Val::Int(5)]), Ok(Val::Int(120)));
}

#[test]
fn division_by_zero_is_left_to_the_runtime() {
    let mut pb = ProgramBuilder::new();
    let one = pb.lit(1);
    let zero = pb.lit(0);
    let quotient = pb.binary(BinaryOp::Div, one, zero);
    let ret = pb.ret(Some(quotient));
    pb.func(RetTy::Int, "boom", &[], vec![stmt(ret)]);

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("boom", &[]), Err(InterpError::DivisionByZero));
}

#[test]
fn stdlib_io_roundtrips_through_the_channels() {
    let mut pb = ProgramBuilder::new();
    // void echo2() { putint(getint()); putint(getint()); }
    let get_a = pb.call("getint", vec![]);
    let put_a = pb.call("putint", vec![get_a]);
    let stmt_a = pb.expr_stmt(put_a);
    let get_b = pb.call("getint", vec![]);
    let put_b = pb.call("putint", vec![get_b]);
    let stmt_b = pb.expr_stmt(put_b);
    pb.func(RetTy::Void, "echo2", &[], vec![stmt(stmt_a), stmt(stmt_b)]);

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    interp.feed_input(&[3, 9]);
    assert_eq!(interp.run("echo2", &[]), Ok(Val::Unit));
    assert_eq!(interp.output(), &[3, 9]);
}

#[test]
fn getarray_fills_and_putarray_drains_a_buffer() {
    let mut pb = ProgramBuilder::new();
    // void pump() { int buf[5]; int n = getarray(buf); putarray(n, buf); putint(n); }
    let five = pb.lit(5);
    let buf = pb.array_decl_uninit(BindingKind::Var, "buf", five);
    let buf_arg = pb.read("buf");
    let get = pb.call("getarray", vec![buf_arg]);
    let n_decl = pb.decl(BindingKind::Var, "n", Some(get));
    let n_arg = pb.read("n");
    let buf_again = pb.read("buf");
    let put = pb.call("putarray", vec![n_arg, buf_again]);
    let put_stmt = pb.expr_stmt(put);
    let n_last = pb.read("n");
    let put_n = pb.call("putint", vec![n_last]);
    let put_n_stmt = pb.expr_stmt(put_n);
    pb.func(
        RetTy::Void,
        "pump",
        &[],
        vec![decl(buf), decl(n_decl), stmt(put_stmt), stmt(put_n_stmt)],
    );

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    interp.feed_input(&[3, 10, 20, 30]);
    assert_eq!(interp.run("pump", &[]), Ok(Val::Unit));
    assert_eq!(interp.output(), &[10, 20, 30, 3]);
}

#[test]
fn end_to_end_loop_over_a_global_const() {
    let mut pb = ProgramBuilder::new();
    // const int N = 3;
    let three = pb.lit(3);
    let n_global = pb.decl(BindingKind::Const, "N", Some(three));
    pb.global(n_global);
    // int f(int x) { int s = 0; int i = 0;
    //   while (i < N) { s = s + x; i = i + 1; } return s; }
    let zero_s = pb.lit(0);
    let s_decl = pb.decl(BindingKind::Var, "s", Some(zero_s));
    let zero_i = pb.lit(0);
    let i_decl = pb.decl(BindingKind::Var, "i", Some(zero_i));
    let i_cond = pb.read("i");
    let n_read = pb.read("N");
    let cond = pb.binary(BinaryOp::Lt, i_cond, n_read);
    let s_read = pb.read("s");
    let x_read = pb.read("x");
    let added = pb.binary(BinaryOp::Add, s_read, x_read);
    let set_s = pb.assign("s", added);
    let i_read = pb.read("i");
    let one = pb.lit(1);
    let inc = pb.binary(BinaryOp::Add, i_read, one);
    let set_i = pb.assign("i", inc);
    let body = pb.block_stmt(vec![stmt(set_s), stmt(set_i)]);
    let loop_stmt = pb.while_stmt(cond, body);
    let s_ret = pb.read("s");
    let ret = pb.ret(Some(s_ret));
    pb.func(
        RetTy::Int,
        "f",
        &[("x", ParamKind::Int)],
        vec![decl(s_decl), decl(i_decl), stmt(loop_stmt), stmt(ret)],
    );

    let (module, interner) = compile(pb);
    let mut interp = Interpreter::new(&module, &interner);
    assert_eq!(interp.run("f", &[Val::Int(4)]), Ok(Val::Int(12)));
}
