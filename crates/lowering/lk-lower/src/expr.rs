//! Expression lowering
//!
//! Recursive translation down the precedence ladder. Every language-level
//! value is an `i64`; comparison and logical results exist as `i1` for one
//! instruction and are canonicalized back to `0`/`1` immediately. Both
//! operands of `&&`/`||` are always lowered; there is no short-circuit.

use crate::error::LowerError;
use crate::func::{scope_error, FuncCx};
use lk_ast::{BinaryOp, BindingKind, Expr, ExprId, ParamKind, UnaryOp};
use lk_intern::Symbol;
use lk_ir::{Address, BinOp, BoolOp, CmpOp, Operand};
use lk_span::Span;

impl FuncCx<'_, '_> {
    /// Lowers an expression, returning the operand holding its value.
    pub(crate) fn lower_expr(&mut self, id: ExprId) -> Result<Operand, LowerError> {
        let program = self.cx.program;
        match &program.exprs[id] {
            Expr::Literal { value, .. } => Ok(Operand::Const(*value)),
            // no-op indirection collapses here
            Expr::Paren { inner, .. } => self.lower_expr(*inner),
            Expr::Unary { op, operand, .. } => {
                let operand = self.lower_expr(*operand)?;
                Ok(match op {
                    UnaryOp::Plus => operand,
                    UnaryOp::Neg => self.builder.neg(operand),
                    UnaryOp::Not => {
                        // !x is (x == 0), canonicalized
                        let is_zero = self.builder.cmp(CmpOp::Eq, operand, Operand::Const(0));
                        self.builder.zext(is_zero)
                    }
                })
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let lhs = self.lower_expr(*lhs)?;
                let rhs = self.lower_expr(*rhs)?;
                Ok(self.lower_binary(*op, lhs, rhs))
            }
            Expr::LValue { name, index, span } => self.lower_read(*name, *index, *span),
            Expr::Call { callee, args, span } => {
                match self.lower_call(*callee, args, *span)? {
                    Some(value) => Ok(value),
                    None => Err(LowerError::Structural {
                        detail: format!(
                            "void function `{}` used as a value",
                            self.cx.interner.resolve(*callee)
                        ),
                        span: *span,
                    }),
                }
            }
        }
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: Operand, rhs: Operand) -> Operand {
        match op {
            BinaryOp::Add => self.builder.binary(BinOp::Add, lhs, rhs),
            BinaryOp::Sub => self.builder.binary(BinOp::Sub, lhs, rhs),
            BinaryOp::Mul => self.builder.binary(BinOp::Mul, lhs, rhs),
            BinaryOp::Div => self.builder.binary(BinOp::Div, lhs, rhs),
            BinaryOp::Rem => self.builder.binary(BinOp::Rem, lhs, rhs),
            BinaryOp::Lt => self.lower_cmp(CmpOp::Lt, lhs, rhs),
            BinaryOp::Le => self.lower_cmp(CmpOp::Le, lhs, rhs),
            BinaryOp::Gt => self.lower_cmp(CmpOp::Gt, lhs, rhs),
            BinaryOp::Ge => self.lower_cmp(CmpOp::Ge, lhs, rhs),
            BinaryOp::Eq => self.lower_cmp(CmpOp::Eq, lhs, rhs),
            BinaryOp::Ne => self.lower_cmp(CmpOp::Ne, lhs, rhs),
            BinaryOp::And => self.lower_logic(BoolOp::And, lhs, rhs),
            BinaryOp::Or => self.lower_logic(BoolOp::Or, lhs, rhs),
        }
    }

    fn lower_cmp(&mut self, op: CmpOp, lhs: Operand, rhs: Operand) -> Operand {
        let flag = self.builder.cmp(op, lhs, rhs);
        self.builder.zext(flag)
    }

    /// Both operands are already lowered by the caller; they are converted
    /// to booleans, combined, and canonicalized back.
    fn lower_logic(&mut self, op: BoolOp, lhs: Operand, rhs: Operand) -> Operand {
        let lhs = self.builder.to_bool(lhs);
        let rhs = self.builder.to_bool(rhs);
        let combined = self.builder.bool_op(op, lhs, rhs);
        self.builder.zext(combined)
    }

    fn lower_read(
        &mut self,
        name: Symbol,
        index: Option<ExprId>,
        span: Span,
    ) -> Result<Operand, LowerError> {
        let binding = *self
            .cx
            .scopes
            .lookup(name, crate::scope::KindHint::Any)
            .map_err(|err| {
                scope_error(self.cx.interner, err, name, span, BindingKind::Var)
            })?;
        let index = match index {
            Some(expr) => Some(self.lower_expr(expr)?),
            None => None,
        };
        let addr = self.element_addr(&binding, index, name, span)?;
        Ok(self.builder.load(addr))
    }

    /// Resolves binding storage plus an optional index operand into an
    /// element address. Indices are not range-checked; out-of-range access
    /// is undefined behavior left to the runtime.
    pub(crate) fn element_addr(
        &mut self,
        binding: &crate::scope::Binding,
        index: Option<Operand>,
        name: Symbol,
        span: Span,
    ) -> Result<Address, LowerError> {
        use crate::scope::Storage;
        match (binding.storage, index) {
            (Storage::Slot(slot), None) => Ok(Address::slot(slot)),
            (Storage::Global(global), None) => Ok(Address::global(global)),
            (Storage::SlotArray(slot, _), Some(index)) => Ok(Address::Slot {
                slot,
                index: Some(index),
            }),
            (Storage::GlobalArray(global, _), Some(index)) => Ok(Address::Global {
                global,
                index: Some(index),
            }),
            (Storage::Pointer(base), Some(index)) => Ok(Address::Pointer {
                base,
                index: Some(index),
            }),
            (Storage::SlotArray(..) | Storage::GlobalArray(..) | Storage::Pointer(_), None) => {
                Err(LowerError::Structural {
                    detail: format!(
                        "array `{}` used as a scalar value",
                        self.cx.interner.resolve(name)
                    ),
                    span,
                })
            }
            (Storage::Slot(_) | Storage::Global(_), Some(_)) => Err(LowerError::Structural {
                detail: format!("`{}` is not an array", self.cx.interner.resolve(name)),
                span,
            }),
        }
    }

    /// Lowers a call; `Ok(None)` for a `void` callee.
    ///
    /// The arity check runs before any argument lowers, so a mismatched
    /// call emits no IR at all.
    pub(crate) fn lower_call(
        &mut self,
        callee: Symbol,
        args: &[ExprId],
        span: Span,
    ) -> Result<Option<Operand>, LowerError> {
        let Some(callable) = self.cx.callables.get(&callee) else {
            return Err(LowerError::UnknownCallee {
                name: self.cx.interner.resolve(callee).to_string(),
                span,
            });
        };
        let callable = callable.clone();
        if args.len() != callable.params.len() {
            return Err(LowerError::ArityMismatch {
                name: self.cx.interner.resolve(callee).to_string(),
                expected: callable.params.len(),
                found: args.len(),
                span,
            });
        }
        let mut lowered = Vec::with_capacity(args.len());
        for (kind, arg) in callable.params.iter().zip(args) {
            let operand = match kind {
                ParamKind::Int => self.lower_expr(*arg)?,
                ParamKind::IntArray => self.lower_array_arg(*arg)?,
            };
            lowered.push(operand);
        }
        Ok(self.builder.call(callable.func, lowered, callable.ret))
    }

    /// An argument bound to an array parameter must name an array; it
    /// passes as a decayed address with no length attached.
    fn lower_array_arg(&mut self, arg: ExprId) -> Result<Operand, LowerError> {
        use crate::scope::Storage;
        let program = self.cx.program;
        let mut expr = &program.exprs[arg];
        while let Expr::Paren { inner, .. } = expr {
            expr = &program.exprs[*inner];
        }
        let Expr::LValue {
            name,
            index: None,
            span,
        } = expr
        else {
            return Err(LowerError::Structural {
                detail: "expected an array name for this argument".to_string(),
                span: expr.span(),
            });
        };
        let binding = *self
            .cx
            .scopes
            .lookup(*name, crate::scope::KindHint::Any)
            .map_err(|err| {
                scope_error(self.cx.interner, err, *name, *span, BindingKind::Var)
            })?;
        match binding.storage {
            Storage::SlotArray(slot, _) => Ok(self.builder.addr_of(Address::slot(slot))),
            Storage::GlobalArray(global, _) => Ok(self.builder.addr_of(Address::global(global))),
            Storage::Pointer(base) => Ok(Operand::Value(base)),
            Storage::Slot(_) | Storage::Global(_) => Err(LowerError::Structural {
                detail: format!("`{}` is not an array", self.cx.interner.resolve(*name)),
                span: *span,
            }),
        }
    }
}
