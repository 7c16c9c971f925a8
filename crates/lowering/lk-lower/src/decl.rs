//! Declaration lowering
//!
//! Locals become stack slots with element stores for their initializers;
//! globals fold every initializer to a compile-time constant and become
//! module globals with flattened initializer images. Array lengths must
//! fold to a constant of at least one element. Initializer lists shorter
//! than the array pad with zeros; longer lists are truncated and the excess
//! expressions are never lowered.

use crate::error::LowerError;
use crate::fold::ConstFolder;
use crate::func::{scope_error, FuncCx, ProgramCx};
use crate::scope::{Binding, Storage};
use lk_ast::{BindingKind, Decl, Def, ExprId, Initializer};
use lk_ir::{Address, Global, Operand};

impl FuncCx<'_, '_> {
    pub(crate) fn lower_decl(&mut self, decl: &Decl) -> Result<(), LowerError> {
        for def in &decl.defs {
            match def.array_len {
                None => self.lower_scalar_def(decl.kind, def)?,
                Some(len) => self.lower_array_def(decl.kind, def, len)?,
            }
        }
        Ok(())
    }

    fn lower_scalar_def(&mut self, kind: BindingKind, def: &Def) -> Result<(), LowerError> {
        let init = self.scalar_init(kind, def)?;
        // an uninitialized variable is zero-initialized
        let value = match init {
            Some(expr) => self.lower_expr(expr)?,
            None => Operand::Const(0),
        };
        let const_value = match (kind, init) {
            (BindingKind::Const, Some(expr)) => self.fold(expr),
            _ => None,
        };
        let slot = self.builder.new_slot(Some(def.name), 1);
        self.builder.store(Address::slot(slot), value);
        self.define(
            def.name,
            Binding {
                kind,
                storage: Storage::Slot(slot),
                const_value,
            },
            def.span,
        )
    }

    fn lower_array_def(
        &mut self,
        kind: BindingKind,
        def: &Def,
        len: ExprId,
    ) -> Result<(), LowerError> {
        let elems = self.array_len(def, len)?;
        let inits = array_inits(self.cx, kind, def)?;
        let slot = self.builder.new_slot(Some(def.name), elems);
        for index in 0..elems {
            let value = match inits.get(index) {
                Some(expr) => self.lower_expr(*expr)?,
                None => Operand::Const(0),
            };
            self.builder.store(
                Address::Slot {
                    slot,
                    index: Some(Operand::Const(index as i64)),
                },
                value,
            );
        }
        self.define(
            def.name,
            Binding {
                kind,
                storage: Storage::SlotArray(slot, elems),
                const_value: None,
            },
            def.span,
        )
    }

    fn scalar_init(&self, kind: BindingKind, def: &Def) -> Result<Option<ExprId>, LowerError> {
        scalar_init(self.cx, kind, def)
    }

    fn array_len(&self, def: &Def, len: ExprId) -> Result<usize, LowerError> {
        let folded = self.fold(len);
        check_array_len(self.cx, def, len, folded)
    }

    fn fold(&self, expr: ExprId) -> Option<i64> {
        ConstFolder::new(self.cx.program, &self.cx.scopes, false).fold(expr)
    }
}

impl ProgramCx<'_> {
    /// Globals: no scope is active, every initializer value must already be
    /// a compile-time constant.
    pub(crate) fn lower_global_decl(&mut self, decl: &Decl) -> Result<(), LowerError> {
        for def in &decl.defs {
            match def.array_len {
                None => self.lower_global_scalar(decl.kind, def)?,
                Some(len) => self.lower_global_array(decl.kind, def, len)?,
            }
        }
        Ok(())
    }

    fn lower_global_scalar(&mut self, kind: BindingKind, def: &Def) -> Result<(), LowerError> {
        let init = scalar_init(self, kind, def)?;
        let value = match init {
            Some(expr) => self.fold_global(expr).ok_or_else(|| {
                LowerError::ConstantRequired {
                    name: self.interner.resolve(def.name).to_string(),
                    span: self.program.exprs[expr].span(),
                }
            })?,
            None => 0,
        };
        let global = self.module.add_global(Global {
            name: def.name,
            values: vec![value],
            mutable: kind == BindingKind::Var,
        });
        self.define_global(
            def.name,
            Binding {
                kind,
                storage: Storage::Global(global),
                // the initializer image is readable in later global
                // initializers, const or var
                const_value: Some(value),
            },
            def,
        )
    }

    fn lower_global_array(
        &mut self,
        kind: BindingKind,
        def: &Def,
        len: ExprId,
    ) -> Result<(), LowerError> {
        let folded = self.fold_global(len);
        let elems = check_array_len(self, def, len, folded)?;
        let inits = array_inits(self, kind, def)?;
        let mut values = vec![0; elems];
        for (index, slot) in values.iter_mut().enumerate() {
            let Some(expr) = inits.get(index) else {
                break;
            };
            *slot = self.fold_global(*expr).ok_or_else(|| {
                LowerError::ConstantRequired {
                    name: self.interner.resolve(def.name).to_string(),
                    span: self.program.exprs[*expr].span(),
                }
            })?;
        }
        let global = self.module.add_global(Global {
            name: def.name,
            values,
            mutable: kind == BindingKind::Var,
        });
        self.define_global(
            def.name,
            Binding {
                kind,
                storage: Storage::GlobalArray(global, elems),
                const_value: None,
            },
            def,
        )
    }

    fn define_global(&mut self, name: lk_intern::Symbol, binding: Binding, def: &Def) -> Result<(), LowerError> {
        self.scopes
            .define(name, binding)
            .map_err(|err| scope_error(self.interner, err, name, def.span, BindingKind::Var))
    }

    fn fold_global(&self, expr: ExprId) -> Option<i64> {
        ConstFolder::new(self.program, &self.scopes, true).fold(expr)
    }
}

/// Extracts a scalar initializer; constants require one, and a list
/// initializer on a scalar is malformed.
fn scalar_init(
    cx: &ProgramCx<'_>,
    kind: BindingKind,
    def: &Def,
) -> Result<Option<ExprId>, LowerError> {
    match &def.init {
        Some(Initializer::Single(expr)) => Ok(Some(*expr)),
        Some(Initializer::List(_)) => Err(LowerError::Structural {
            detail: format!(
                "list initializer on scalar `{}`",
                cx.interner.resolve(def.name)
            ),
            span: def.span,
        }),
        None if kind == BindingKind::Const => Err(LowerError::Structural {
            detail: format!(
                "const `{}` without an initializer",
                cx.interner.resolve(def.name)
            ),
            span: def.span,
        }),
        None => Ok(None),
    }
}

/// Extracts an array initializer list; constants require one, and a single
/// scalar initializer on an array is malformed.
fn array_inits<'d>(
    cx: &ProgramCx<'_>,
    kind: BindingKind,
    def: &'d Def,
) -> Result<&'d [ExprId], LowerError> {
    match &def.init {
        Some(Initializer::List(list)) => Ok(list),
        Some(Initializer::Single(_)) => Err(LowerError::Structural {
            detail: format!(
                "array `{}` needs a list initializer",
                cx.interner.resolve(def.name)
            ),
            span: def.span,
        }),
        None if kind == BindingKind::Const => Err(LowerError::Structural {
            detail: format!(
                "const `{}` without an initializer",
                cx.interner.resolve(def.name)
            ),
            span: def.span,
        }),
        None => Ok(&[]),
    }
}

/// A length expression must fold to a constant of at least one element.
fn check_array_len(
    cx: &ProgramCx<'_>,
    def: &Def,
    len: ExprId,
    folded: Option<i64>,
) -> Result<usize, LowerError> {
    match folded {
        Some(value) if value >= 1 => Ok(value as usize),
        _ => Err(LowerError::InvalidArraySize {
            name: cx.interner.resolve(def.name).to_string(),
            span: cx.program.exprs[len].span(),
        }),
    }
}
