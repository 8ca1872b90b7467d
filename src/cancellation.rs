//! Cooperative cancellation for long-running resolver operations. See
//! `SPEC_FULL.md` §5 "Cancellation".
//!
//! Resolvers that loop over steps (multi-step movement, BFS path
//! planning) accept a token and check it at each step boundary rather
//! than polling internally or spawning anything — the core stays
//! single-threaded and synchronous per §5. Raising the flag from another
//! thread is the only supported way to interrupt an in-progress call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};

/// A cheaply cloneable flag a caller can raise to interrupt a resolver at
/// its next step boundary. Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Call at a step boundary; returns `EngineError::Cancelled` if the
    /// token has been raised.
    pub fn check(&self) -> EngineResult<()> {
        if self.is_cancelled() {
            return Err(EngineError::cancelled("operation cancelled at step boundary"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_checks_ok() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancelling_is_visible_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(token.check().is_err());
    }
}
