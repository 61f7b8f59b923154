//! Animation-frame batching.
//!
//! Levels are lists of zero-argument tasks. All tasks of one level run within a
//! single frame, strictly before any task of the next level. The first level of
//! a batch runs as soon as it is scheduled when no earlier level is waiting;
//! every following level waits for the next frame.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// A single deferred task.
pub type FrameTask = Box<dyn FnOnce()>;

/// Tasks dispatched together in one frame.
pub type Level = Vec<FrameTask>;

/// Consumer of leveled task batches.
pub trait FrameScheduler {
    /// Queue `levels` for level-by-level execution across frames.
    fn schedule(&self, levels: Vec<Level>);
}

/// Frame scheduler driven by explicit [`RafScheduler::tick`] calls, one per
/// animation frame.
#[derive(Default)]
pub struct RafScheduler {
    queue: RefCell<VecDeque<Level>>,
    quiet: RefCell<Option<FrameTask>>,
    frame_requested: Cell<bool>,
    running: Cell<bool>,
    frames: Cell<u64>,
}

impl std::fmt::Debug for RafScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RafScheduler")
            .field("pending_levels", &self.pending_levels())
            .field("frame_requested", &self.frame_requested.get())
            .field("frames", &self.frames.get())
            .finish()
    }
}

impl RafScheduler {
    /// Create an idle scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Levels still waiting for a frame.
    pub fn pending_levels(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Whether a frame callback is outstanding.
    pub fn frame_requested(&self) -> bool {
        self.frame_requested.get()
    }

    /// Frames ticked so far.
    pub fn frames(&self) -> u64 {
        self.frames.get()
    }

    /// Nothing queued and no quiet callback pending.
    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty() && self.quiet.borrow().is_none()
    }

    /// Run `callback` on the next frame, before that frame's level. A later call
    /// replaces a callback that has not run yet.
    pub fn wait_until_quiet(&self, callback: impl FnOnce() + 'static) {
        *self.quiet.borrow_mut() = Some(Box::new(callback));
        self.frame_requested.set(true);
    }

    /// Advance one animation frame. Returns how many tasks ran.
    pub fn tick(&self) -> usize {
        if !self.frame_requested.replace(false) {
            return 0;
        }
        self.frames.set(self.frames.get() + 1);

        let quiet = self.quiet.borrow_mut().take();
        if let Some(callback) = quiet {
            callback();
        }
        self.run_next_level()
    }

    /// Tick until idle, at most `max_frames` times. Returns frames ticked.
    pub fn run_until_idle(&self, max_frames: usize) -> usize {
        let mut ticked = 0;
        while ticked < max_frames && self.frame_requested.get() {
            self.tick();
            ticked += 1;
        }
        ticked
    }

    fn run_next_level(&self) -> usize {
        let level = self.queue.borrow_mut().pop_front();
        let Some(level) = level else {
            return 0;
        };

        let count = level.len();
        self.running.set(true);
        for task in level {
            task();
        }
        self.running.set(false);

        if !self.queue.borrow().is_empty() {
            self.frame_requested.set(true);
        }
        count
    }
}

impl FrameScheduler for RafScheduler {
    fn schedule(&self, levels: Vec<Level>) {
        let levels: Vec<Level> = levels.into_iter().filter(|l| !l.is_empty()).collect();
        if levels.is_empty() {
            return;
        }

        let waiting = !self.queue.borrow().is_empty() || self.running.get();
        self.queue.borrow_mut().extend(levels);
        if waiting {
            self.frame_requested.set(true);
        } else {
            self.run_next_level();
        }
    }
}
