//! FIFO of pending tune commands for one adapter.
//!
//! The queue itself is not synchronized; the adapter keeps it behind its
//! mutex together with the current-target slot.

use std::collections::VecDeque;

use crate::error::Result;
use crate::target::{TargetRef, TuningTarget};

/// A request to tune to `target`. Holding the command holds one reference.
#[derive(Debug)]
pub struct TuneCommand {
    target: TargetRef,
}

impl TuneCommand {
    pub fn target(&self) -> &TargetRef {
        &self.target
    }

    /// True when the queue entry is the only holder left, meaning whoever
    /// asked for the tune has abandoned the target.
    pub fn is_stale(&self) -> bool {
        self.target.ref_count() == 1
    }

    pub(crate) fn into_target(self) -> TargetRef {
        self.target
    }
}

/// Pending tune commands in arrival order.
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: VecDeque<TuneCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command for `target`, taking a new reference.
    ///
    /// Room is reserved before the reference is taken, so a failed
    /// allocation leaves the count untouched.
    pub fn push(&mut self, target: &TargetRef) -> Result<()> {
        self.commands.try_reserve(1)?;
        self.commands.push_back(TuneCommand {
            target: target.clone(),
        });
        Ok(())
    }

    pub fn pop_front(&mut self) -> Option<TuneCommand> {
        self.commands.pop_front()
    }

    /// Remove the oldest command for `target`, if any.
    pub fn remove_first(&mut self, target: &TuningTarget) -> Option<TuneCommand> {
        let index = self.commands.iter().position(|c| c.target.is(target))?;
        self.commands.remove(index)
    }

    /// Number of queued commands for `target`.
    pub fn pending_for(&self, target: &TuningTarget) -> usize {
        self.commands.iter().filter(|c| c.target.is(target)).count()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TuningParams;

    fn target(freq: u32) -> TargetRef {
        TargetRef::new(TuningTarget::new(TuningParams::qam(freq, 6_900_000)))
    }

    #[test]
    fn test_push_takes_reference() {
        let a = target(346_000_000);
        let mut queue = CommandQueue::new();
        queue.push(&a).unwrap();
        queue.push(&a).unwrap();
        assert_eq!(a.ref_count(), 3);
        assert_eq!(queue.pending_for(&a), 2);
    }

    #[test]
    fn test_push_then_remove_restores_count() {
        let a = target(346_000_000);
        let before = a.ref_count();
        let mut queue = CommandQueue::new();
        queue.push(&a).unwrap();
        drop(queue.remove_first(&a));
        assert_eq!(a.ref_count(), before);
        assert_eq!(queue.pending_for(&a), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_missing_is_none() {
        let a = target(346_000_000);
        let b = target(354_000_000);
        let mut queue = CommandQueue::new();
        queue.push(&a).unwrap();
        assert!(queue.remove_first(&b).is_none());
        assert_eq!(queue.len(), 1);
        assert_eq!(b.ref_count(), 1);
    }

    #[test]
    fn test_fifo_order() {
        let a = target(346_000_000);
        let b = target(354_000_000);
        let mut queue = CommandQueue::new();
        queue.push(&a).unwrap();
        queue.push(&b).unwrap();
        queue.push(&a).unwrap();

        // Removing a's first entry keeps the later one in place.
        drop(queue.remove_first(&a));
        assert!(queue.pop_front().unwrap().target().is(&b));
        assert!(queue.pop_front().unwrap().target().is(&a));
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_stale_when_owner_gone() {
        let a = target(346_000_000);
        let mut queue = CommandQueue::new();
        queue.push(&a).unwrap();
        let command = queue.pop_front().unwrap();
        assert!(!command.is_stale());
        drop(a);
        assert!(command.is_stale());
    }
}
