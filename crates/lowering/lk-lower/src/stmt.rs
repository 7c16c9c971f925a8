//! Statement and control-flow lowering
//!
//! Structured control flow becomes blocks plus explicit terminators. An arm
//! that already ended in break/continue/return receives no fallthrough
//! branch (the builder's open-block check runs before every one), so no
//! block is ever doubly terminated.

use crate::error::LowerError;
use crate::func::{scope_error, FuncCx, LoopFrame};
use lk_ast::{BindingKind, Block, BlockItem, Expr, ExprId, Stmt, StmtId};
use lk_intern::Symbol;
use lk_ir::Terminator;
use lk_span::Span;

impl FuncCx<'_, '_> {
    /// Lowers a block: a scope is pushed around its items and popped on
    /// exit no matter how control left the block. `return` is just another
    /// terminator, not an unwinding exception.
    pub(crate) fn lower_block(&mut self, block: &Block) -> Result<(), LowerError> {
        self.cx.scopes.push();
        let result = self.lower_block_items(block);
        self.cx.scopes.pop();
        result
    }

    fn lower_block_items(&mut self, block: &Block) -> Result<(), LowerError> {
        for item in &block.items {
            match item {
                BlockItem::Decl(decl) => self.lower_decl(decl)?,
                BlockItem::Stmt(stmt) => self.lower_stmt(*stmt)?,
            }
        }
        Ok(())
    }

    pub(crate) fn lower_stmt(&mut self, id: StmtId) -> Result<(), LowerError> {
        let program = self.cx.program;
        match &program.stmts[id] {
            Stmt::Expr { expr, .. } => self.lower_expr_stmt(*expr),
            Stmt::Assign {
                target,
                index,
                value,
                span,
            } => self.lower_assign(*target, *index, *value, *span),
            Stmt::Block(block) => self.lower_block(block),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => self.lower_if(*cond, *then_branch, *else_branch),
            Stmt::While { cond, body, .. } => self.lower_while(*cond, *body),
            Stmt::Break { span } => {
                let Some(frame) = self.loops.last() else {
                    return Err(LowerError::Structural {
                        detail: "`break` outside of a loop".to_string(),
                        span: *span,
                    });
                };
                let after = frame.after;
                self.builder.terminate(Terminator::Br(after));
                Ok(())
            }
            Stmt::Continue { span } => {
                let Some(frame) = self.loops.last() else {
                    return Err(LowerError::Structural {
                        detail: "`continue` outside of a loop".to_string(),
                        span: *span,
                    });
                };
                let cond = frame.cond;
                self.builder.terminate(Terminator::Br(cond));
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => Some(self.lower_expr(*expr)?),
                    None => None,
                };
                self.builder.terminate(Terminator::Ret(value));
                Ok(())
            }
        }
    }

    /// A call in statement position may be `void`; anything else lowers for
    /// its value, which is discarded.
    fn lower_expr_stmt(&mut self, expr: ExprId) -> Result<(), LowerError> {
        let program = self.cx.program;
        let mut id = expr;
        while let Expr::Paren { inner, .. } = &program.exprs[id] {
            id = *inner;
        }
        if let Expr::Call { callee, args, span } = &program.exprs[id] {
            self.lower_call(*callee, args, *span)?;
        } else {
            self.lower_expr(id)?;
        }
        Ok(())
    }

    fn lower_assign(
        &mut self,
        target: Symbol,
        index: Option<ExprId>,
        value: ExprId,
        span: Span,
    ) -> Result<(), LowerError> {
        let value = self.lower_expr(value)?;
        let index = match index {
            Some(expr) => Some(self.lower_expr(expr)?),
            None => None,
        };
        let binding = *self.cx.scopes.lookup_assignable(target).map_err(|err| {
            scope_error(self.cx.interner, err, target, span, BindingKind::Var)
        })?;
        let addr = self.element_addr(&binding, index, target, span)?;
        self.builder.store(addr, value);
        Ok(())
    }

    fn lower_if(
        &mut self,
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    ) -> Result<(), LowerError> {
        let cond = self.lower_expr(cond)?;
        let cond = self.builder.to_bool(cond);
        let then_block = self.builder.new_block();
        let else_block = else_branch.map(|_| self.builder.new_block());
        let merge_block = self.builder.new_block();
        self.builder.terminate(Terminator::CondBr {
            cond,
            then_dest: then_block,
            else_dest: else_block.unwrap_or(merge_block),
        });

        self.builder.set_current_block(then_block);
        self.lower_stmt(then_branch)?;
        if !self.builder.is_terminated() {
            self.builder.terminate(Terminator::Br(merge_block));
        }

        if let (Some(else_stmt), Some(else_block)) = (else_branch, else_block) {
            self.builder.set_current_block(else_block);
            self.lower_stmt(else_stmt)?;
            if !self.builder.is_terminated() {
                self.builder.terminate(Terminator::Br(merge_block));
            }
        }

        self.builder.set_current_block(merge_block);
        Ok(())
    }

    fn lower_while(&mut self, cond: ExprId, body: StmtId) -> Result<(), LowerError> {
        let cond_block = self.builder.new_block();
        let body_block = self.builder.new_block();
        let after_block = self.builder.new_block();

        self.builder.terminate(Terminator::Br(cond_block));

        // the condition re-evaluates every iteration
        self.builder.set_current_block(cond_block);
        let cond = self.lower_expr(cond)?;
        let cond = self.builder.to_bool(cond);
        self.builder.terminate(Terminator::CondBr {
            cond,
            then_dest: body_block,
            else_dest: after_block,
        });

        self.builder.set_current_block(body_block);
        self.loops.push(LoopFrame {
            cond: cond_block,
            after: after_block,
        });
        let body_result = self.lower_stmt(body);
        self.loops.pop();
        body_result?;
        if !self.builder.is_terminated() {
            self.builder.terminate(Terminator::Br(cond_block));
        }

        self.builder.set_current_block(after_block);
        Ok(())
    }
}
