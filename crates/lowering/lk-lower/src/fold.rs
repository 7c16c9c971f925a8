//! Compile-time constant folding
//!
//! Used by declaration lowering for array lengths and global initializers.
//! The folder mirrors the runtime semantics exactly: 64-bit wrapping
//! arithmetic, comparisons and logical operators canonicalized to `0`/`1`,
//! and both operands of `&&`/`||` always evaluated. An expression that
//! divides by zero, calls a function, or reads runtime storage simply does
//! not fold; the caller decides whether that is an error.

use crate::scope::{KindHint, ScopeStack};
use lk_ast::{BinaryOp, BindingKind, Expr, ExprId, Program, UnaryOp};

/// Side-effect-free evaluator over AST expressions
pub struct ConstFolder<'a> {
    program: &'a Program,
    scopes: &'a ScopeStack,
    /// In global context the initializer image of *any* previously declared
    /// global is readable, `var` or `const`; locally only `const` bindings
    /// with recorded values fold.
    global_ctx: bool,
}

impl<'a> ConstFolder<'a> {
    #[must_use]
    pub fn new(program: &'a Program, scopes: &'a ScopeStack, global_ctx: bool) -> Self {
        Self {
            program,
            scopes,
            global_ctx,
        }
    }

    /// Evaluates `expr`, returning `None` when it is not a compile-time
    /// constant.
    #[must_use]
    pub fn fold(&self, expr: ExprId) -> Option<i64> {
        match &self.program.exprs[expr] {
            Expr::Literal { value, .. } => Some(*value),
            Expr::Paren { inner, .. } => self.fold(*inner),
            Expr::Unary { op, operand, .. } => {
                let value = self.fold(*operand)?;
                Some(match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Neg => value.wrapping_neg(),
                    UnaryOp::Not => i64::from(value == 0),
                })
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let lhs = self.fold(*lhs)?;
                let rhs = self.fold(*rhs)?;
                self.fold_binary(*op, lhs, rhs)
            }
            Expr::LValue {
                name, index: None, ..
            } => {
                let binding = self.scopes.lookup(*name, KindHint::Any).ok()?;
                match binding.kind {
                    BindingKind::Const => binding.const_value,
                    BindingKind::Var if self.global_ctx => binding.const_value,
                    BindingKind::Var => None,
                }
            }
            // array element reads and calls are runtime-only
            Expr::LValue { index: Some(_), .. } | Expr::Call { .. } => None,
        }
    }

    fn fold_binary(&self, op: BinaryOp, lhs: i64, rhs: i64) -> Option<i64> {
        Some(match op {
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => {
                if rhs == 0 {
                    return None;
                }
                lhs.wrapping_div(rhs)
            }
            BinaryOp::Rem => {
                if rhs == 0 {
                    return None;
                }
                lhs.wrapping_rem(rhs)
            }
            BinaryOp::Lt => i64::from(lhs < rhs),
            BinaryOp::Le => i64::from(lhs <= rhs),
            BinaryOp::Gt => i64::from(lhs > rhs),
            BinaryOp::Ge => i64::from(lhs >= rhs),
            BinaryOp::Eq => i64::from(lhs == rhs),
            BinaryOp::Ne => i64::from(lhs != rhs),
            BinaryOp::And => i64::from(lhs != 0 && rhs != 0),
            BinaryOp::Or => i64::from(lhs != 0 || rhs != 0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{Binding, Storage};
    use lk_intern::Interner;
    use lk_ir::GlobalId;
    use lk_span::Span;

    fn lit(program: &mut Program, value: i64) -> ExprId {
        program.alloc_expr(Expr::Literal {
            value,
            span: Span::default(),
        })
    }

    fn binary(program: &mut Program, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        program.alloc_expr(Expr::Binary {
            op,
            lhs,
            rhs,
            span: Span::default(),
        })
    }

    #[test]
    fn folds_the_precedence_ladder() {
        let mut program = Program::new();
        // 2 + 3 * 4
        let two = lit(&mut program, 2);
        let three = lit(&mut program, 3);
        let four = lit(&mut program, 4);
        let product = binary(&mut program, BinaryOp::Mul, three, four);
        let sum = binary(&mut program, BinaryOp::Add, two, product);

        let scopes = ScopeStack::new();
        let folder = ConstFolder::new(&program, &scopes, false);
        assert_eq!(folder.fold(sum), Some(14));
    }

    #[test]
    fn comparisons_canonicalize_to_zero_or_one() {
        let mut program = Program::new();
        let five = lit(&mut program, 5);
        let three = lit(&mut program, 3);
        let gt = binary(&mut program, BinaryOp::Gt, five, three);
        let not = program.alloc_expr(Expr::Unary {
            op: UnaryOp::Not,
            operand: gt,
            span: Span::default(),
        });

        let scopes = ScopeStack::new();
        let folder = ConstFolder::new(&program, &scopes, false);
        assert_eq!(folder.fold(gt), Some(1));
        assert_eq!(folder.fold(not), Some(0));
    }

    #[test]
    fn division_by_zero_does_not_fold() {
        let mut program = Program::new();
        let one = lit(&mut program, 1);
        let zero = lit(&mut program, 0);
        let div = binary(&mut program, BinaryOp::Div, one, zero);

        let scopes = ScopeStack::new();
        let folder = ConstFolder::new(&program, &scopes, false);
        assert_eq!(folder.fold(div), None);
    }

    #[test]
    fn const_bindings_fold_vars_do_not() {
        let mut interner = Interner::new();
        let n = interner.intern("n");
        let v = interner.intern("v");

        let mut program = Program::new();
        let read_n = program.alloc_expr(Expr::LValue {
            name: n,
            index: None,
            span: Span::default(),
        });
        let read_v = program.alloc_expr(Expr::LValue {
            name: v,
            index: None,
            span: Span::default(),
        });

        let mut scopes = ScopeStack::new();
        scopes
            .define(
                n,
                Binding {
                    kind: BindingKind::Const,
                    storage: Storage::Global(GlobalId(0)),
                    const_value: Some(3),
                },
            )
            .unwrap();
        scopes
            .define(
                v,
                Binding {
                    kind: BindingKind::Var,
                    storage: Storage::Global(GlobalId(1)),
                    const_value: Some(7),
                },
            )
            .unwrap();

        let local = ConstFolder::new(&program, &scopes, false);
        assert_eq!(local.fold(read_n), Some(3));
        assert_eq!(local.fold(read_v), None);

        // in global context a var's initializer image is readable
        let global = ConstFolder::new(&program, &scopes, true);
        assert_eq!(global.fold(read_v), Some(7));
    }
}
