//! End-to-end scenarios driven through `analyze_program`, exercising the
//! WTO/fixpoint engine, resolver, and inspection checker together over a
//! hand-built `SyntheticProgram` rather than a real C/C++ parser.

use knight_analyzer::{analyze_program, KnightOptions};
use knight_analyzer::front_end::synthetic::{CfgBuilder, SyntheticProgram};
use knight_analyzer::front_end::{BinOp, CfgElement, StmtKind};
use knight_analyzer::ids::DeclRef;
use knight_analyzer::types::SymType;

fn dump_call(prog: &mut SyntheticProgram, arg: knight_analyzer::ids::StmtRef) -> knight_analyzer::ids::StmtRef {
    prog.fresh_stmt(StmtKind::CallExpr {
        callee: "dump".to_string(),
        args: vec![arg],
        ty: SymType::INT,
    })
}

fn reach_call(prog: &mut SyntheticProgram) -> knight_analyzer::ids::StmtRef {
    prog.fresh_stmt(StmtKind::CallExpr {
        callee: "reach".to_string(),
        args: vec![],
        ty: SymType::INT,
    })
}

fn messages(mut sink: knight_analyzer::Sink) -> Vec<String> {
    sink.take_sorted_deduped().into_iter().map(|d| d.message).collect()
}

/// `int a = 10; dump(a);` => `10`.
#[test]
fn constant_through_assignment() {
    let mut prog = SyntheticProgram::new();
    let a = DeclRef(0);
    let lit = prog.fresh_stmt(StmtKind::IntegerLiteral { value: 10, ty: SymType::INT });
    let decl = prog.fresh_stmt(StmtKind::VarDecl { var: a, init: Some(lit), ty: SymType::INT });
    let load = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: prog.fresh_stmt(StmtKind::DeclRefExpr { decl: a }),
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let call = dump_call(&mut prog, load);

    let mut b = CfgBuilder::new();
    let n0 = b.node();
    b.add_element(n0, CfgElement::Statement(lit));
    b.add_element(n0, CfgElement::Statement(decl));
    b.add_element(n0, CfgElement::Statement(load));
    b.add_element(n0, CfgElement::Statement(call));
    let cfg = b.build(n0);
    prog.add_function("constant_through_assignment", cfg);

    let sink = analyze_program(&prog, &KnightOptions::default());
    assert_eq!(messages(sink), vec!["10".to_string()]);
}

/// `int a = 0; if (x) a = 1; else a = -1; dump(a);` => `[-1, 1]`.
#[test]
fn join_over_if_else_integer_branch() {
    let mut prog = SyntheticProgram::new();
    let a = DeclRef(0);
    let x = DeclRef(1);

    let zero = prog.fresh_stmt(StmtKind::IntegerLiteral { value: 0, ty: SymType::INT });
    let decl_a = prog.fresh_stmt(StmtKind::VarDecl { var: a, init: Some(zero), ty: SymType::INT });

    let x_ref = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: x });
    let x_load = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: x_ref,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });

    let one = prog.fresh_stmt(StmtKind::IntegerLiteral { value: 1, ty: SymType::INT });
    let a_ref_then = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: a });
    let assign_then = prog.fresh_stmt(StmtKind::BinaryOperator {
        op: BinOp::Assign,
        lhs: a_ref_then,
        rhs: one,
        ty: SymType::INT,
    });

    let neg_one = prog.fresh_stmt(StmtKind::IntegerLiteral { value: -1, ty: SymType::INT });
    let a_ref_else = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: a });
    let assign_else = prog.fresh_stmt(StmtKind::BinaryOperator {
        op: BinOp::Assign,
        lhs: a_ref_else,
        rhs: neg_one,
        ty: SymType::INT,
    });

    let a_ref_dump = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: a });
    let a_load_dump = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: a_ref_dump,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let call = dump_call(&mut prog, a_load_dump);

    let mut b = CfgBuilder::new();
    let entry = b.node();
    let then_n = b.node();
    let els_n = b.node();
    let join_n = b.node();

    b.add_element(entry, CfgElement::Statement(zero));
    b.add_element(entry, CfgElement::Statement(decl_a));
    b.add_element(entry, CfgElement::Statement(x_load));
    b.set_condition(entry, x_load);
    b.add_edge(entry, then_n);
    b.add_edge(entry, els_n);

    b.add_element(then_n, CfgElement::Statement(one));
    b.add_element(then_n, CfgElement::Statement(assign_then));
    b.add_edge(then_n, join_n);

    b.add_element(els_n, CfgElement::Statement(neg_one));
    b.add_element(els_n, CfgElement::Statement(assign_else));
    b.add_edge(els_n, join_n);

    b.add_element(join_n, CfgElement::Statement(a_load_dump));
    b.add_element(join_n, CfgElement::Statement(call));
    let cfg = b.build(entry);
    prog.add_function("join_over_if_else_integer_branch", cfg);

    let sink = analyze_program(&prog, &KnightOptions::default());
    assert_eq!(messages(sink), vec!["[-1, 1]".to_string()]);
}

/// `int a=1,b=2; int c = x ? a+b : a-b; dump(c);` => `[-1, 3]`.
#[test]
fn conditional_operator_joins_both_arms() {
    let mut prog = SyntheticProgram::new();
    let a = DeclRef(0);
    let b_decl = DeclRef(1);
    let c = DeclRef(2);
    let x = DeclRef(3);

    let one = prog.fresh_stmt(StmtKind::IntegerLiteral { value: 1, ty: SymType::INT });
    let decl_a = prog.fresh_stmt(StmtKind::VarDecl { var: a, init: Some(one), ty: SymType::INT });
    let two = prog.fresh_stmt(StmtKind::IntegerLiteral { value: 2, ty: SymType::INT });
    let decl_b = prog.fresh_stmt(StmtKind::VarDecl { var: b_decl, init: Some(two), ty: SymType::INT });

    let x_ref = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: x });
    let x_load = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: x_ref,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });

    let a_ref1 = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: a });
    let a_load1 = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: a_ref1,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let b_ref1 = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: b_decl });
    let b_load1 = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: b_ref1,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let sum = prog.fresh_stmt(StmtKind::BinaryOperator {
        op: BinOp::Add,
        lhs: a_load1,
        rhs: b_load1,
        ty: SymType::INT,
    });

    let a_ref2 = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: a });
    let a_load2 = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: a_ref2,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let b_ref2 = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: b_decl });
    let b_load2 = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: b_ref2,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let diff = prog.fresh_stmt(StmtKind::BinaryOperator {
        op: BinOp::Sub,
        lhs: a_load2,
        rhs: b_load2,
        ty: SymType::INT,
    });

    let cond = prog.fresh_stmt(StmtKind::ConditionalOperator {
        cond: x_load,
        then_branch: sum,
        else_branch: diff,
        ty: SymType::INT,
    });
    let decl_c = prog.fresh_stmt(StmtKind::VarDecl { var: c, init: Some(cond), ty: SymType::INT });

    let c_ref = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: c });
    let c_load = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: c_ref,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let call = dump_call(&mut prog, c_load);

    let mut b = CfgBuilder::new();
    let n0 = b.node();
    for s in [decl_a, decl_b, x_load, a_load1, b_load1, sum, a_load2, b_load2, diff, cond, decl_c, c_load, call] {
        b.add_element(n0, CfgElement::Statement(s));
    }
    let cfg = b.build(n0);
    prog.add_function("conditional_operator_joins_both_arms", cfg);

    let sink = analyze_program(&prog, &KnightOptions::default());
    assert_eq!(messages(sink), vec!["[-1, 3]".to_string()]);
}

/// `x = 2; if (x == 1) reach(); else reach();` => first `Unreachable`,
/// second `Reachable`.
#[test]
fn reachability_of_a_contradicted_branch() {
    let mut prog = SyntheticProgram::new();
    let x = DeclRef(0);

    let two = prog.fresh_stmt(StmtKind::IntegerLiteral { value: 2, ty: SymType::INT });
    let decl_x = prog.fresh_stmt(StmtKind::VarDecl { var: x, init: Some(two), ty: SymType::INT });

    let x_ref = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: x });
    let x_load = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: x_ref,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let one = prog.fresh_stmt(StmtKind::IntegerLiteral { value: 1, ty: SymType::INT });
    let cmp = prog.fresh_stmt(StmtKind::BinaryOperator {
        op: BinOp::Eq,
        lhs: x_load,
        rhs: one,
        ty: SymType::BOOL,
    });

    let mut b = CfgBuilder::new();
    let entry = b.node();
    let then_n = b.node();
    let els_n = b.node();

    b.add_element(entry, CfgElement::Statement(decl_x));
    b.add_element(entry, CfgElement::Statement(x_load));
    b.add_element(entry, CfgElement::Statement(cmp));
    b.set_condition(entry, cmp);
    b.add_edge(entry, then_n);
    b.add_edge(entry, els_n);

    let reach_then = reach_call(&mut prog);
    b.add_element(then_n, CfgElement::Statement(reach_then));
    let reach_else = reach_call(&mut prog);
    b.add_element(els_n, CfgElement::Statement(reach_else));

    let cfg = b.build(entry);
    prog.add_function("reachability_of_a_contradicted_branch", cfg);

    let sink = analyze_program(&prog, &KnightOptions::default());
    assert_eq!(messages(sink), vec!["Unreachable".to_string(), "Reachable".to_string()]);
}

/// `if (x > 0) dump(x); else dump(x);` => `[1, +inf]` then `[-inf, 0]`.
#[test]
fn comparison_propagation_narrows_each_branch() {
    let mut prog = SyntheticProgram::new();
    let x = DeclRef(0);

    let x_ref = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: x });
    let x_load_cond = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: x_ref,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let zero = prog.fresh_stmt(StmtKind::IntegerLiteral { value: 0, ty: SymType::INT });
    let cmp = prog.fresh_stmt(StmtKind::BinaryOperator {
        op: BinOp::Gt,
        lhs: x_load_cond,
        rhs: zero,
        ty: SymType::BOOL,
    });

    let mut b = CfgBuilder::new();
    let entry = b.node();
    let then_n = b.node();
    let els_n = b.node();

    b.add_element(entry, CfgElement::Statement(x_load_cond));
    b.add_element(entry, CfgElement::Statement(zero));
    b.add_element(entry, CfgElement::Statement(cmp));
    b.set_condition(entry, cmp);
    b.add_edge(entry, then_n);
    b.add_edge(entry, els_n);

    let x_ref_then = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: x });
    let x_load_then = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: x_ref_then,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let call_then = dump_call(&mut prog, x_load_then);
    b.add_element(then_n, CfgElement::Statement(x_load_then));
    b.add_element(then_n, CfgElement::Statement(call_then));

    let x_ref_else = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: x });
    let x_load_else = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: x_ref_else,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let call_else = dump_call(&mut prog, x_load_else);
    b.add_element(els_n, CfgElement::Statement(x_load_else));
    b.add_element(els_n, CfgElement::Statement(call_else));

    let cfg = b.build(entry);
    prog.add_function("comparison_propagation_narrows_each_branch", cfg);

    let sink = analyze_program(&prog, &KnightOptions::default());
    assert_eq!(
        messages(sink),
        vec!["[1, +inf]".to_string(), "[-inf, 0]".to_string()]
    );
}

/// `int i = 0; while (i < 10) { dump(i); i = i + 1; dump(i); } dump(i);`
/// with threshold analysis enabled => inside: `[0, 9]` then `[1, 10]`;
/// after the loop: `10`.
#[test]
fn while_loop_widens_to_threshold_then_narrows() {
    let mut prog = SyntheticProgram::new();
    let i = DeclRef(0);

    let zero = prog.fresh_stmt(StmtKind::IntegerLiteral { value: 0, ty: SymType::INT });
    let decl_i = prog.fresh_stmt(StmtKind::VarDecl { var: i, init: Some(zero), ty: SymType::INT });

    let i_ref_cond = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: i });
    let i_load_cond = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: i_ref_cond,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let ten = prog.fresh_stmt(StmtKind::IntegerLiteral { value: 10, ty: SymType::INT });
    let cmp = prog.fresh_stmt(StmtKind::BinaryOperator {
        op: BinOp::Lt,
        lhs: i_load_cond,
        rhs: ten,
        ty: SymType::BOOL,
    });

    let i_ref_dump1 = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: i });
    let i_load_dump1 = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: i_ref_dump1,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let call1 = dump_call(&mut prog, i_load_dump1);

    let i_ref_rhs = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: i });
    let i_load_rhs = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: i_ref_rhs,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let one = prog.fresh_stmt(StmtKind::IntegerLiteral { value: 1, ty: SymType::INT });
    let sum = prog.fresh_stmt(StmtKind::BinaryOperator {
        op: BinOp::Add,
        lhs: i_load_rhs,
        rhs: one,
        ty: SymType::INT,
    });
    let i_ref_lhs = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: i });
    let assign = prog.fresh_stmt(StmtKind::BinaryOperator {
        op: BinOp::Assign,
        lhs: i_ref_lhs,
        rhs: sum,
        ty: SymType::INT,
    });

    let i_ref_dump2 = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: i });
    let i_load_dump2 = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: i_ref_dump2,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let call2 = dump_call(&mut prog, i_load_dump2);

    let i_ref_after = prog.fresh_stmt(StmtKind::DeclRefExpr { decl: i });
    let i_load_after = prog.fresh_stmt(StmtKind::ImplicitCast {
        operand: i_ref_after,
        is_loading_lvalue: true,
        src_ty: SymType::INT,
        dst_ty: SymType::INT,
    });
    let call_after = dump_call(&mut prog, i_load_after);

    let mut b = CfgBuilder::new();
    let entry = b.node();
    let head = b.node();
    let body = b.node();
    let after = b.node();

    b.add_element(entry, CfgElement::Statement(zero));
    b.add_element(entry, CfgElement::Statement(decl_i));
    b.add_edge(entry, head);

    b.add_element(head, CfgElement::Statement(i_load_cond));
    b.add_element(head, CfgElement::Statement(cmp));
    b.set_condition(head, cmp);
    b.add_edge(head, body);
    b.add_edge(head, after);

    for s in [i_load_dump1, call1, i_load_rhs, sum, assign, i_load_dump2, call2] {
        b.add_element(body, CfgElement::Statement(s));
    }
    b.add_edge(body, head);

    b.add_element(after, CfgElement::Statement(i_load_after));
    b.add_element(after, CfgElement::Statement(call_after));

    let cfg = b.build(entry);
    prog.add_function("while_loop_widens_to_threshold_then_narrows", cfg);

    let sink = analyze_program(&prog, &KnightOptions::default());
    assert_eq!(
        messages(sink),
        vec!["[0, 9]".to_string(), "[1, 10]".to_string(), "10".to_string()]
    );
}
