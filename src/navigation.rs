//! Step navigation state machine
//!
//! Holds the current index and the render status for it. Independent of any
//! UI framework: the viewer drives it, tests drive it directly.

use crate::generation::{GenerationCounter, GenerationToken};
use crate::rendering::Bitmap;
use crate::{Error, Result};

/// Render status for the current index
#[derive(Debug, Clone, PartialEq)]
pub enum RenderStatus {
    Pending,
    Ready(Bitmap),
    Failed(String),
}

impl RenderStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, RenderStatus::Pending)
    }
}

/// Outcome of `advance` / `retreat`
#[derive(Debug, Clone)]
pub enum Transition {
    /// The index changed; the token belongs to the render it triggers
    Moved { index: usize, token: GenerationToken },
    /// Already at the boundary in that direction
    AtBoundary,
    /// A render is pending and navigation is locked
    Refused,
}

#[derive(Debug)]
pub struct Navigator {
    index: usize,
    len: usize,
    status: RenderStatus,
    lock_while_pending: bool,
    generations: GenerationCounter,
}

impl Navigator {
    /// Start at index 0. `len` must be at least 1.
    pub fn new(len: usize, lock_while_pending: bool) -> Result<Self> {
        if len == 0 {
            return Err(Error::ConfigError("cannot navigate an empty catalog".into()));
        }
        Ok(Self {
            index: 0,
            len,
            status: RenderStatus::Pending,
            lock_while_pending,
            generations: GenerationCounter::new(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn at_first(&self) -> bool {
        self.index == 0
    }

    pub fn at_last(&self) -> bool {
        self.index + 1 == self.len
    }

    pub fn status(&self) -> &RenderStatus {
        &self.status
    }

    /// Whether transitions are currently accepted
    pub fn can_navigate(&self) -> bool {
        !(self.lock_while_pending && self.status.is_pending())
    }

    pub fn advance(&mut self) -> Transition {
        let target = (self.index + 1).min(self.len - 1);
        self.move_to(target)
    }

    pub fn retreat(&mut self) -> Transition {
        let target = self.index.saturating_sub(1);
        self.move_to(target)
    }

    fn move_to(&mut self, target: usize) -> Transition {
        if !self.can_navigate() {
            log::debug!("navigation refused at index {}: render pending", self.index);
            return Transition::Refused;
        }
        if target == self.index {
            return Transition::AtBoundary;
        }
        log::debug!("navigate {} -> {}", self.index, target);
        self.index = target;
        Transition::Moved { index: target, token: self.begin_render() }
    }

    /// Reset to Pending and start a new generation for the current index.
    /// Used for the initial render and for explicit refresh.
    pub fn begin_render(&mut self) -> GenerationToken {
        self.status = RenderStatus::Pending;
        self.generations.bump()
    }

    /// Apply a pipeline outcome. Stale tokens and repeated completions are
    /// rejected with `Error::Stale` and leave the status untouched.
    pub fn complete(&mut self, token: &GenerationToken, outcome: Result<Bitmap>) -> Result<&RenderStatus> {
        token.check()?;
        if !self.status.is_pending() {
            return Err(Error::Stale(token.generation().0));
        }
        self.status = match outcome {
            Ok(bitmap) => RenderStatus::Ready(bitmap),
            Err(e) => RenderStatus::Failed(e.to_string()),
        };
        Ok(&self.status)
    }
}
