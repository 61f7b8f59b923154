//! Post-update hook.
//!
//! The engine defers all real work to a callback that fires once after the
//! current update cycle has finished its synchronous mutations.

use std::cell::RefCell;
use std::collections::VecDeque;

/// Registration API for "after this update cycle" callbacks.
pub trait PostDigest {
    /// Run `callback` once, after the current cycle's synchronous work.
    fn post_digest(&self, callback: Box<dyn FnOnce()>);
}

/// Explicitly flushed post-update queue.
///
/// The host calls [`DigestCycle::digest`] at the end of each update cycle.
/// Callbacks registered while the flush is running are part of the same flush.
#[derive(Default)]
pub struct DigestCycle {
    queue: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}

impl std::fmt::Debug for DigestCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestCycle")
            .field("pending", &self.pending())
            .finish()
    }
}

impl DigestCycle {
    /// Create an empty cycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run every queued callback. Returns how many ran.
    pub fn digest(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            match next {
                Some(callback) => {
                    callback();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl PostDigest for DigestCycle {
    fn post_digest(&self, callback: Box<dyn FnOnce()>) {
        self.queue.borrow_mut().push_back(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_digest_runs_each_callback_once() {
        let cycle = DigestCycle::new();
        let hits = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let h = hits.clone();
            cycle.post_digest(Box::new(move || h.set(h.get() + 1)));
        }
        assert_eq!(cycle.pending(), 3);
        assert_eq!(cycle.digest(), 3);
        assert_eq!(cycle.digest(), 0);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn test_callbacks_queued_during_flush_run_in_same_flush() {
        let cycle = Rc::new(DigestCycle::new());
        let hits = Rc::new(Cell::new(0));
        let (c, h) = (cycle.clone(), hits.clone());
        cycle.post_digest(Box::new(move || {
            let h2 = h.clone();
            c.post_digest(Box::new(move || h2.set(h2.get() + 10)));
            h.set(h.get() + 1);
        }));
        assert_eq!(cycle.digest(), 2);
        assert_eq!(hits.get(), 11);
    }
}
