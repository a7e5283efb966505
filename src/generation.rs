//! Generation tokens used to discard results from superseded navigations

use crate::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A monotonically increasing render epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Shared source of generations. Each `bump` invalidates every token handed
/// out before it.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation and return the token for it
    pub fn bump(&self) -> GenerationToken {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationToken {
            generation: Generation(id),
            current: self.current.clone(),
        }
    }

    pub fn current(&self) -> Generation {
        Generation(self.current.load(Ordering::SeqCst))
    }
}

/// Captured at launch and carried through every suspension point of a
/// pipeline run.
#[derive(Debug, Clone)]
pub struct GenerationToken {
    generation: Generation,
    current: Arc<AtomicU64>,
}

impl GenerationToken {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation.0
    }

    /// `Err(Error::Stale)` once a newer generation has started.
    pub fn check(&self) -> Result<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(Error::Stale(self.generation.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_invalidates_older_tokens() {
        let c = GenerationCounter::new();
        let a = c.bump();
        assert!(a.is_current());
        let b = c.bump();
        assert!(!a.is_current());
        assert!(b.is_current());
        assert_eq!(a.check(), Err(Error::Stale(1)));
        assert_eq!(c.current(), Generation(2));
    }
}
