//! Error types for lowering

use lk_ast::BindingKind;
use lk_span::Span;
use thiserror::Error;

/// Errors that abort a compilation
///
/// Every variant is a value propagated to the caller of
/// [`lower_program`](crate::lower_program); nothing here prints or exits.
/// The first error wins; no partial module is produced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LowerError {
    /// `break`/`continue` outside a loop, or an AST shape the grammar forbids
    #[error("{detail}")]
    Structural {
        /// Description of the malformed construct
        detail: String,
        /// Where it appeared
        span: Span,
    },

    /// Name is already bound in the same scope, or a function name is
    /// declared twice
    #[error("`{name}` is already defined in this scope")]
    Redefinition {
        /// The name that was redefined
        name: String,
        /// The second definition site
        span: Span,
    },

    /// Name not found in any visible scope or the global table
    #[error("undefined name `{name}`")]
    UndefinedName {
        /// The name that was not found
        name: String,
        /// Where the name was used
        span: Span,
    },

    /// `Const` used as `Var` or vice versa, on read or write
    #[error("`{name}` is a {actual} binding, used as {expected}")]
    KindMismatch {
        /// The offending name
        name: String,
        /// What the use site required
        expected: BindingKind,
        /// What the binding actually is
        actual: BindingKind,
        /// The use site
        span: Span,
    },

    /// Call argument count differs from the declared parameter count
    #[error("call to `{name}` passes {found} arguments, expected {expected}")]
    ArityMismatch {
        /// The callee
        name: String,
        /// Declared parameter count
        expected: usize,
        /// Actual argument count
        found: usize,
        /// The call site
        span: Span,
    },

    /// Call to a function that was never declared
    #[error("call to undeclared function `{name}`")]
    UnknownCallee {
        /// The undeclared callee
        name: String,
        /// The call site
        span: Span,
    },

    /// Global initializer does not reduce to a compile-time constant
    #[error("global initializer for `{name}` is not a compile-time constant")]
    ConstantRequired {
        /// The global being defined
        name: String,
        /// The offending initializer
        span: Span,
    },

    /// Array length is zero, negative, or not a compile-time constant
    #[error("invalid array size for `{name}`")]
    InvalidArraySize {
        /// The array being defined
        name: String,
        /// The length expression
        span: Span,
    },
}

impl LowerError {
    /// Returns the span where the error occurred.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Structural { span, .. }
            | Self::Redefinition { span, .. }
            | Self::UndefinedName { span, .. }
            | Self::KindMismatch { span, .. }
            | Self::ArityMismatch { span, .. }
            | Self::UnknownCallee { span, .. }
            | Self::ConstantRequired { span, .. }
            | Self::InvalidArraySize { span, .. } => *span,
        }
    }
}
