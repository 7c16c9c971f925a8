//! Scope stack for tracking lexical bindings during lowering
//!
//! The stack is a plain data structure with no reference to the IR builder:
//! it maps names to [`Binding`]s and enforces the redefinition and
//! const/var rules, while the lowering code decides what loads and stores to
//! emit. Kind dispatch is a typed [`ScopeError`] result, not a runtime
//! downcast and not an exception-shaped control flow.
//!
//! The outermost, never-popped frame is the global table. With no local
//! scope active, [`ScopeStack::define`] creates a global binding; searches
//! walk local scopes innermost-to-outermost and fall back to the global
//! table last.

use lk_ast::BindingKind;
use lk_intern::Symbol;
use lk_ir::{GlobalId, SlotId, ValueId};
use rustc_hash::FxHashMap;

/// Storage backing a binding
///
/// Arrays reserve N contiguous elements behind one handle; element selection
/// happens at the use site and is never range-checked at lowering time.
/// Out-of-range access is undefined behavior deferred to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Scalar stack slot
    Slot(SlotId),
    /// Stack array of the given element count
    SlotArray(SlotId, usize),
    /// Scalar module global
    Global(GlobalId),
    /// Global array of the given element count
    GlobalArray(GlobalId, usize),
    /// Decayed array parameter: a pointer value with no known length
    Pointer(ValueId),
}

impl Storage {
    /// Whether the storage is element-indexable.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Self::SlotArray(..) | Self::GlobalArray(..) | Self::Pointer(_)
        )
    }
}

/// A name's binding: mutability kind plus storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub kind: BindingKind,
    pub storage: Storage,
    /// Folded compile-time value of a scalar binding, when one exists.
    /// Recorded for `const` scalars (and global scalars, whose initializer
    /// image is readable in global context); used by constant folding.
    pub const_value: Option<i64>,
}

/// Kind requirement at a use site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindHint {
    /// Reads accept either kind
    Any,
    Const,
    Var,
}

/// Typed failure of a scope operation; the lowering layer attaches the
/// name and span when converting to a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    /// Name already bound in the current innermost scope
    AlreadyDefined,
    /// Name not bound in any visible scope or the global table
    NotFound,
    /// Binding exists but its kind does not satisfy the use site
    KindMismatch {
        /// The binding's actual kind
        actual: BindingKind,
    },
}

/// Stack of lexical binding tables plus the global table
#[derive(Debug, Default)]
pub struct ScopeStack {
    globals: FxHashMap<Symbol, Binding>,
    scopes: Vec<FxHashMap<Symbol, Binding>>,
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a new innermost scope.
    pub fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Leaves the innermost scope, dropping its bindings.
    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Whether no local scope is active, so definitions become global.
    #[must_use]
    pub fn at_global(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Binds `name` in the innermost scope, or globally when none is active.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::AlreadyDefined`] if `name` is already bound at
    /// that level, regardless of kind; shadowing an *outer* scope is allowed.
    pub fn define(&mut self, name: Symbol, binding: Binding) -> Result<(), ScopeError> {
        let table = self.scopes.last_mut().unwrap_or(&mut self.globals);
        if table.contains_key(&name) {
            return Err(ScopeError::AlreadyDefined);
        }
        table.insert(name, binding);
        Ok(())
    }

    /// Resolves `name`, innermost scope first, global table last.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::NotFound`] if no scope binds the name, or
    /// [`ScopeError::KindMismatch`] if an explicit `hint` disagrees with the
    /// binding's kind.
    pub fn lookup(&self, name: Symbol, hint: KindHint) -> Result<&Binding, ScopeError> {
        let binding = self.find(name).ok_or(ScopeError::NotFound)?;
        match hint {
            KindHint::Any => Ok(binding),
            KindHint::Const if binding.kind == BindingKind::Const => Ok(binding),
            KindHint::Var if binding.kind == BindingKind::Var => Ok(binding),
            KindHint::Const | KindHint::Var => Err(ScopeError::KindMismatch {
                actual: binding.kind,
            }),
        }
    }

    /// Resolves `name` for the left side of an assignment: the first match
    /// in search order must be a `var`.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::KindMismatch`] when the first match is a
    /// `const` (an outer `var` of the same name does not rescue the write),
    /// or [`ScopeError::NotFound`].
    pub fn lookup_assignable(&self, name: Symbol) -> Result<&Binding, ScopeError> {
        let binding = self.find(name).ok_or(ScopeError::NotFound)?;
        if binding.kind == BindingKind::Var {
            Ok(binding)
        } else {
            Err(ScopeError::KindMismatch {
                actual: binding.kind,
            })
        }
    }

    fn find(&self, name: Symbol) -> Option<&Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|table| table.get(&name))
            .or_else(|| self.globals.get(&name))
    }
}
