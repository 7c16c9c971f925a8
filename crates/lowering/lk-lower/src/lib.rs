//! Scope-aware lowering from the Lark AST to the block-structured IR
//!
//! This crate owns every semantic decision of the front-end: name
//! resolution with nested lexical scoping, const/var enforcement,
//! control-flow graph construction, declaration binding, and the calling
//! convention (scalars by value, arrays decayed to pointers).
//!
//! # Architecture
//!
//! - **Scope manager** ([`scope`]): a stack of binding tables plus the
//!   global table; kind dispatch returns typed results.
//! - **Constant folding** ([`fold`]): compile-time evaluation for array
//!   lengths and global initializers.
//! - **Expression, statement, and declaration lowering**: recursive
//!   translation into the IR through an explicit context with no ambient
//!   state, so the engine is reentrant across separate compilations.
//! - **Errors** ([`error`]): one closed taxonomy, propagated as values to
//!   the caller; lowering never prints and never exits.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lk_lower::lower_program;
//!
//! let module = lower_program(&program, &mut interner)?;
//! // hand the module to a backend, or run it in lk-interp
//! ```

pub mod error;
pub mod fold;
pub mod scope;

mod decl;
mod expr;
mod func;
mod stmt;

pub use error::LowerError;
pub use fold::ConstFolder;
pub use func::lower_program;
pub use scope::{Binding, KindHint, ScopeError, ScopeStack, Storage};
