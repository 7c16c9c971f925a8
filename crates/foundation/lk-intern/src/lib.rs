//! String interning for identifiers
//!
//! Lowering is single-threaded and synchronous, so this wraps a plain
//! [`lasso::Rodeo`] instead of a locked, thread-shared interner. The
//! transcriber interns identifiers while building the AST; the lowering
//! engine only ever resolves.

use lasso::Rodeo;
pub use lasso::Spur as Symbol;

/// Per-compilation string interner.
#[derive(Debug)]
pub struct Interner {
    inner: Rodeo,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rodeo::default(),
        }
    }

    /// Interns `text`, returning the same symbol for equal strings.
    pub fn intern(&mut self, text: &str) -> Symbol {
        self.inner.get_or_intern(text)
    }

    /// Resolves a symbol previously produced by [`Interner::intern`].
    #[must_use]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.inner.resolve(&sym)
    }

    #[must_use]
    pub fn try_resolve(&self, sym: Symbol) -> Option<&str> {
        self.inner.try_resolve(&sym)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut interner = Interner::new();
        let first = interner.intern("main");
        let second = interner.intern("main");
        assert_eq!(first, second);
        assert_eq!(interner.resolve(first), "main");
    }
}
