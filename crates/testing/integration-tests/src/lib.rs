//! Integration test utilities for the Lark compiler core
//!
//! Lowering consumes an AST built by an external transcriber; these helpers
//! play that role for tests, building programs through the same arena
//! allocation API the transcriber uses.

use lk_ast::{
    BinaryOp, BindingKind, Block, BlockItem, Decl, Def, Expr, ExprId, Function, Initializer, Item,
    Param, ParamKind, Program, RetTy, Stmt, StmtId, UnaryOp,
};
use lk_intern::{Interner, Symbol};
use lk_span::Span;

/// Builds a [`Program`] node by node, the way the transcriber does
#[derive(Default)]
pub struct ProgramBuilder {
    /// The program under construction
    pub program: Program,
    /// Interner shared with the program's identifiers
    pub interner: Interner,
}

impl ProgramBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the builder, yielding the inputs `lower_program` expects.
    #[must_use]
    pub fn finish(self) -> (Program, Interner) {
        (self.program, self.interner)
    }

    pub fn sym(&mut self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    pub fn lit(&mut self, value: i64) -> ExprId {
        self.program.alloc_expr(Expr::Literal {
            value,
            span: Span::default(),
        })
    }

    pub fn paren(&mut self, inner: ExprId) -> ExprId {
        self.program.alloc_expr(Expr::Paren {
            inner,
            span: Span::default(),
        })
    }

    /// Scalar identifier read.
    pub fn read(&mut self, name: &str) -> ExprId {
        let name = self.sym(name);
        self.program.alloc_expr(Expr::LValue {
            name,
            index: None,
            span: Span::default(),
        })
    }

    /// Array element read.
    pub fn read_at(&mut self, name: &str, index: ExprId) -> ExprId {
        let name = self.sym(name);
        self.program.alloc_expr(Expr::LValue {
            name,
            index: Some(index),
            span: Span::default(),
        })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.program.alloc_expr(Expr::Unary {
            op,
            operand,
            span: Span::default(),
        })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.program.alloc_expr(Expr::Binary {
            op,
            lhs,
            rhs,
            span: Span::default(),
        })
    }

    pub fn call(&mut self, callee: &str, args: Vec<ExprId>) -> ExprId {
        let callee = self.sym(callee);
        self.program.alloc_expr(Expr::Call {
            callee,
            args,
            span: Span::default(),
        })
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.program.alloc_stmt(Stmt::Expr {
            expr,
            span: Span::default(),
        })
    }

    pub fn assign(&mut self, target: &str, value: ExprId) -> StmtId {
        let target = self.sym(target);
        self.program.alloc_stmt(Stmt::Assign {
            target,
            index: None,
            value,
            span: Span::default(),
        })
    }

    pub fn assign_at(&mut self, target: &str, index: ExprId, value: ExprId) -> StmtId {
        let target = self.sym(target);
        self.program.alloc_stmt(Stmt::Assign {
            target,
            index: Some(index),
            value,
            span: Span::default(),
        })
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> StmtId {
        self.program.alloc_stmt(Stmt::Return {
            value,
            span: Span::default(),
        })
    }

    pub fn break_stmt(&mut self) -> StmtId {
        self.program.alloc_stmt(Stmt::Break {
            span: Span::default(),
        })
    }

    pub fn continue_stmt(&mut self) -> StmtId {
        self.program.alloc_stmt(Stmt::Continue {
            span: Span::default(),
        })
    }

    pub fn if_stmt(
        &mut self,
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    ) -> StmtId {
        self.program.alloc_stmt(Stmt::If {
            cond,
            then_branch,
            else_branch,
            span: Span::default(),
        })
    }

    pub fn while_stmt(&mut self, cond: ExprId, body: StmtId) -> StmtId {
        self.program.alloc_stmt(Stmt::While {
            cond,
            body,
            span: Span::default(),
        })
    }

    pub fn block_stmt(&mut self, items: Vec<BlockItem>) -> StmtId {
        self.program.alloc_stmt(Stmt::Block(Block {
            items,
            span: Span::default(),
        }))
    }

    /// Scalar declaration with an optional initializer.
    #[must_use]
    pub fn decl(&mut self, kind: BindingKind, name: &str, init: Option<ExprId>) -> Decl {
        let name = self.sym(name);
        Decl {
            kind,
            defs: vec![Def {
                name,
                array_len: None,
                init: init.map(Initializer::Single),
                span: Span::default(),
            }],
            span: Span::default(),
        }
    }

    /// Array declaration with an initializer list.
    #[must_use]
    pub fn array_decl(
        &mut self,
        kind: BindingKind,
        name: &str,
        len: ExprId,
        inits: Vec<ExprId>,
    ) -> Decl {
        let name = self.sym(name);
        Decl {
            kind,
            defs: vec![Def {
                name,
                array_len: Some(len),
                init: Some(Initializer::List(inits)),
                span: Span::default(),
            }],
            span: Span::default(),
        }
    }

    /// Array declaration without an initializer.
    #[must_use]
    pub fn array_decl_uninit(&mut self, kind: BindingKind, name: &str, len: ExprId) -> Decl {
        let name = self.sym(name);
        Decl {
            kind,
            defs: vec![Def {
                name,
                array_len: Some(len),
                init: None,
                span: Span::default(),
            }],
            span: Span::default(),
        }
    }

    /// Adds a function definition to the program.
    pub fn func(
        &mut self,
        ret: RetTy,
        name: &str,
        params: &[(&str, ParamKind)],
        body: Vec<BlockItem>,
    ) {
        let name = self.sym(name);
        let params = params
            .iter()
            .map(|(param_name, kind)| Param {
                name: self.interner.intern(param_name),
                kind: *kind,
                span: Span::default(),
            })
            .collect();
        self.program.items.push(Item::Function(Function {
            ret,
            name,
            params,
            body: Block {
                items: body,
                span: Span::default(),
            },
            span: Span::default(),
        }));
    }

    /// Adds a global declaration to the program.
    pub fn global(&mut self, decl: Decl) {
        self.program.items.push(Item::Decl(decl));
    }
}

/// Wraps a statement as a block item.
#[must_use]
pub fn stmt(id: StmtId) -> BlockItem {
    BlockItem::Stmt(id)
}

/// Wraps a declaration as a block item.
#[must_use]
pub fn decl(decl: Decl) -> BlockItem {
    BlockItem::Decl(decl)
}
