//! Function and program lowering
//!
//! A program lowers in two passes over its items: the first registers every
//! function signature (plus the standard-library externs) in one flat
//! namespace, so call sites resolve regardless of declaration order; the
//! second lowers global declarations and function bodies in source order.

use crate::error::LowerError;
use crate::scope::{Binding, ScopeError, ScopeStack, Storage};
use lk_ast::{BindingKind, Item, ParamKind, Program, RetTy};
use lk_intern::{Interner, Symbol};
use lk_ir::{
    Address, BlockId, ExternFunction, FuncRef, FunctionBuilder, Module, Operand, Param,
    Terminator, Ty,
};
use lk_span::Span;
use rustc_hash::FxHashMap;

/// Standard-library signatures, registered before the program body lowers.
/// Bodies come from the external runtime support library.
const STDLIB: &[(&str, &[Ty], Ty)] = &[
    ("getint", &[], Ty::I64),
    ("putint", &[Ty::I64], Ty::Void),
    ("getch", &[], Ty::I64),
    ("putch", &[Ty::I64], Ty::Void),
    ("putarray", &[Ty::I64, Ty::Ptr], Ty::Void),
    ("getarray", &[Ty::Ptr], Ty::I64),
];

/// One entry of the flat function namespace
#[derive(Debug, Clone)]
pub(crate) struct Callable {
    pub(crate) func: FuncRef,
    pub(crate) params: Vec<ParamKind>,
    pub(crate) ret: Ty,
}

/// Per-compilation lowering state, passed explicitly into every lowering
/// call; nothing here is ambient or global
pub(crate) struct ProgramCx<'a> {
    pub(crate) program: &'a Program,
    pub(crate) interner: &'a mut Interner,
    pub(crate) module: Module,
    pub(crate) scopes: ScopeStack,
    pub(crate) callables: FxHashMap<Symbol, Callable>,
}

/// Branch targets of the innermost loops; `continue` branches to `cond`,
/// `break` to `after`
pub(crate) struct LoopFrame {
    pub(crate) cond: BlockId,
    pub(crate) after: BlockId,
}

/// Per-function lowering state
pub(crate) struct FuncCx<'p, 'a> {
    pub(crate) cx: &'p mut ProgramCx<'a>,
    pub(crate) builder: FunctionBuilder,
    pub(crate) loops: Vec<LoopFrame>,
    pub(crate) ret: Ty,
}

/// Lowers a whole program to an IR module.
///
/// The interner is the one the transcriber used to build `program`; it is
/// mutable so the standard-library names can be interned during
/// registration.
///
/// # Errors
///
/// Returns the first [`LowerError`] encountered; no module is produced on
/// error.
pub fn lower_program(program: &Program, interner: &mut Interner) -> Result<Module, LowerError> {
    let mut cx = ProgramCx {
        program,
        interner,
        module: Module::new(),
        scopes: ScopeStack::new(),
        callables: FxHashMap::default(),
    };
    cx.register_stdlib();
    cx.register_functions()?;
    for item in &program.items {
        match item {
            Item::Decl(decl) => cx.lower_global_decl(decl)?,
            Item::Function(func) => cx.lower_function(func)?,
        }
    }
    Ok(cx.module)
}

impl ProgramCx<'_> {
    fn register_stdlib(&mut self) {
        for (name, params, ret) in STDLIB {
            let name = self.interner.intern(name);
            let id = self.module.add_extern(ExternFunction {
                name,
                params: params.to_vec(),
                ret: *ret,
            });
            let params = params
                .iter()
                .map(|ty| match ty {
                    Ty::Ptr => ParamKind::IntArray,
                    _ => ParamKind::Int,
                })
                .collect();
            self.callables.insert(
                name,
                Callable {
                    func: FuncRef::External(id),
                    params,
                    ret: *ret,
                },
            );
        }
    }

    /// Pass 1: place every function signature in the flat namespace so
    /// bodies may call forward.
    fn register_functions(&mut self) -> Result<(), LowerError> {
        let mut next_id = 0;
        for item in &self.program.items {
            let Item::Function(func) = item else {
                continue;
            };
            if self.callables.contains_key(&func.name) {
                return Err(LowerError::Redefinition {
                    name: self.interner.resolve(func.name).to_string(),
                    span: func.span,
                });
            }
            self.callables.insert(
                func.name,
                Callable {
                    func: FuncRef::Defined(lk_ir::FuncId(next_id)),
                    params: func.params.iter().map(|param| param.kind).collect(),
                    ret: ret_ty(func.ret),
                },
            );
            next_id += 1;
        }
        Ok(())
    }

    fn lower_function(&mut self, func: &lk_ast::Function) -> Result<(), LowerError> {
        let params = func
            .params
            .iter()
            .map(|param| Param {
                name: param.name,
                ty: match param.kind {
                    ParamKind::Int => Ty::I64,
                    ParamKind::IntArray => Ty::Ptr,
                },
            })
            .collect();
        let ret = ret_ty(func.ret);
        let builder = FunctionBuilder::new(func.name, params, ret);
        let fcx = FuncCx {
            cx: self,
            builder,
            loops: Vec::new(),
            ret,
        };
        let function = fcx.lower(func)?;
        self.module.add_function(function);
        Ok(())
    }
}

impl FuncCx<'_, '_> {
    fn lower(mut self, func: &lk_ast::Function) -> Result<lk_ir::Function, LowerError> {
        self.cx.scopes.push();
        let result = self.lower_inner(func);
        self.cx.scopes.pop();
        result?;
        Ok(self.builder.finish())
    }

    fn lower_inner(&mut self, func: &lk_ast::Function) -> Result<(), LowerError> {
        self.bind_params(func)?;
        self.lower_block(&func.body)?;
        // implicit `ret void` on fallthrough; a non-void body that falls off
        // the end keeps the default `unreachable` for the backend verifier
        if !self.builder.is_terminated() && self.ret == Ty::Void {
            self.builder.terminate(Terminator::Ret(None));
        }
        Ok(())
    }

    /// Parameters pre-bind as `var` in the function scope; the body block
    /// opens its own nested scope, so a local may shadow a parameter.
    fn bind_params(&mut self, func: &lk_ast::Function) -> Result<(), LowerError> {
        for (index, param) in func.params.iter().enumerate() {
            let value = self.builder.param(index);
            let storage = match param.kind {
                ParamKind::Int => {
                    let slot = self.builder.new_slot(Some(param.name), 1);
                    self.builder.store(Address::slot(slot), Operand::Value(value));
                    Storage::Slot(slot)
                }
                ParamKind::IntArray => Storage::Pointer(value),
            };
            self.define(
                param.name,
                Binding {
                    kind: BindingKind::Var,
                    storage,
                    const_value: None,
                },
                param.span,
            )?;
        }
        Ok(())
    }

    pub(crate) fn define(
        &mut self,
        name: Symbol,
        binding: Binding,
        span: Span,
    ) -> Result<(), LowerError> {
        self.cx
            .scopes
            .define(name, binding)
            .map_err(|err| scope_error(self.cx.interner, err, name, span, BindingKind::Var))
    }
}

pub(crate) fn ret_ty(ret: RetTy) -> Ty {
    match ret {
        RetTy::Int => Ty::I64,
        RetTy::Void => Ty::Void,
    }
}

/// Attaches name and span to a typed scope failure.
pub(crate) fn scope_error(
    interner: &Interner,
    err: ScopeError,
    name: Symbol,
    span: Span,
    expected: BindingKind,
) -> LowerError {
    let name = interner.resolve(name).to_string();
    match err {
        ScopeError::AlreadyDefined => LowerError::Redefinition { name, span },
        ScopeError::NotFound => LowerError::UndefinedName { name, span },
        ScopeError::KindMismatch { actual } => LowerError::KindMismatch {
            name,
            expected,
            actual,
            span,
        },
    }
}
