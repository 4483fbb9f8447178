//! String interning for signal and scope names

pub use lasso::Spur as Symbol;
use lasso::ThreadedRodeo;
use std::sync::Arc;

/// Thread-safe string interner, cheap to clone
#[derive(Clone, Debug, Default)]
pub struct Interner {
    inner: Arc<ThreadedRodeo>,
}

impl Interner {
    /// Create an empty interner
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name, returning the existing symbol if already known
    pub fn intern(&self, name: &str) -> Symbol {
        self.inner.get_or_intern(name)
    }

    /// Resolve a symbol produced by this interner
    #[must_use]
    pub fn resolve(&self, sym: &Symbol) -> &str {
        self.inner.resolve(sym)
    }
}
