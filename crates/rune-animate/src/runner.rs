//! Cancellable animation handles.
//!
//! A `Runner` represents one in-flight (or already resolved) animation. It is
//! returned synchronously by `animate` long before any driver runs, so its
//! `end`/`cancel` are forwarded to a *host* that changes over the lifetime of
//! the request:
//!
//! ```text
//! animate()           post-digest / frame          driver start
//! Runner ── host ──▶ request close hooks ──────▶ driver Runner ──▶ driver cleanup
//! ```
//!
//! State machine: `Pending → Started → Completed | Cancelled`. Resolution
//! happens once; later `end`/`cancel`/`complete` calls are no-ops and never
//! reach the host again.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receiver of a runner's control calls.
pub trait RunnerHost {
    /// Finish the animation successfully.
    fn end(&self);
    /// Abort the animation.
    fn cancel(&self);
    /// Pause, if supported.
    fn pause(&self) {}
    /// Resume, if supported.
    fn resume(&self) {}
}

/// Lifecycle state of a [`Runner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    /// Created; no driver animation attached yet.
    Pending,
    /// A driver animation (or a newer runner) is driving completion.
    Started,
    /// Resolved successfully.
    Completed,
    /// Resolved by cancellation.
    Cancelled,
}

impl RunnerState {
    /// Whether the runner has resolved.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Completion observer; receives `true` on success.
pub type DoneCallback = Box<dyn FnOnce(bool)>;

/// One step of [`Runner::chain`]: receives the continuation to call when done.
pub type ChainStep = Box<dyn FnOnce(DoneCallback)>;

struct RunnerInner {
    id: u64,
    state: RunnerState,
    host: Option<Rc<dyn RunnerHost>>,
    /// Completion is driven by the host runner, not by `complete`.
    superseded: bool,
    done: Vec<DoneCallback>,
}

/// Cloneable handle to a single animation's lifecycle.
#[derive(Clone)]
pub struct Runner {
    inner: Rc<RefCell<RunnerInner>>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Runner")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .field("superseded", &inner.superseded)
            .field("observers", &inner.done.len())
            .finish()
    }
}

impl PartialEq for Runner {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Runner {}

impl Runner {
    /// Create a pending runner without a host.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self {
            inner: Rc::new(RefCell::new(RunnerInner {
                id: COUNTER.fetch_add(1, Ordering::Relaxed),
                state: RunnerState::Pending,
                host: None,
                superseded: false,
                done: Vec::new(),
            })),
        }
    }

    /// Create a pending runner controlled by `host`.
    pub fn with_host(host: Rc<dyn RunnerHost>) -> Self {
        let runner = Self::new();
        runner.inner.borrow_mut().host = Some(host);
        runner
    }

    /// Create a runner that is already resolved.
    pub fn resolved(ok: bool) -> Self {
        let runner = Self::new();
        runner.finish(ok);
        runner
    }

    /// Process-unique id, handy in logs.
    pub fn id(&self) -> u64 {
        self.inner.borrow().id
    }

    /// Current state.
    pub fn state(&self) -> RunnerState {
        self.inner.borrow().state
    }

    /// Whether the runner has resolved.
    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// `Some(true)` when completed, `Some(false)` when cancelled.
    pub fn outcome(&self) -> Option<bool> {
        match self.state() {
            RunnerState::Completed => Some(true),
            RunnerState::Cancelled => Some(false),
            _ => None,
        }
    }

    /// Whether completion is driven by a newer runner.
    pub fn is_superseded(&self) -> bool {
        self.inner.borrow().superseded
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Runner) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Replace the host receiving `end`/`cancel`/`pause`/`resume`.
    pub fn set_host(&self, host: Rc<dyn RunnerHost>) {
        let mut inner = self.inner.borrow_mut();
        if !inner.state.is_finished() {
            inner.host = Some(host);
        }
    }

    /// Attach a started driver runner as host and mark this runner started.
    pub fn host_on(&self, driver: &Runner) {
        if self.ptr_eq(driver) {
            return;
        }
        let mut inner = self.inner.borrow_mut();
        if inner.state.is_finished() {
            return;
        }
        inner.host = Some(Rc::new(driver.clone()));
        inner.state = RunnerState::Started;
    }

    /// Hand control of this runner to `newer`: control calls are forwarded to
    /// it and this runner resolves with it. Its own `complete` is ignored.
    pub fn supersede_with(&self, newer: &Runner) {
        if self.ptr_eq(newer) || self.is_finished() {
            return;
        }
        {
            let mut inner = self.inner.borrow_mut();
            inner.host = Some(Rc::new(newer.clone()));
            inner.superseded = true;
            inner.state = RunnerState::Started;
        }
        let this = self.clone();
        newer.done(move |ok| this.finish(ok));
    }

    /// Register a completion observer. Runs immediately when already resolved.
    pub fn done(&self, callback: impl FnOnce(bool) + 'static) {
        let outcome = {
            let mut inner = self.inner.borrow_mut();
            match inner.state {
                RunnerState::Completed => Some(true),
                RunnerState::Cancelled => Some(false),
                _ => {
                    inner.done.push(Box::new(callback));
                    return;
                }
            }
        };
        if let Some(ok) = outcome {
            callback(ok);
        }
    }

    /// Force successful completion.
    pub fn end(&self) {
        if let Some(host) = self.live_host() {
            host.end();
        } else if self.is_finished() {
            return;
        }
        self.finish(true);
    }

    /// Force rejection.
    pub fn cancel(&self) {
        if let Some(host) = self.live_host() {
            host.cancel();
        } else if self.is_finished() {
            return;
        }
        self.finish(false);
    }

    /// Forward a pause to the host.
    pub fn pause(&self) {
        if let Some(host) = self.live_host() {
            host.pause();
        }
    }

    /// Forward a resume to the host.
    pub fn resume(&self) {
        if let Some(host) = self.live_host() {
            host.resume();
        }
    }

    /// Resolve from the owning side. Ignored when superseded or resolved.
    pub fn complete(&self, ok: bool) {
        if self.is_superseded() {
            return;
        }
        self.finish(ok);
    }

    fn live_host(&self) -> Option<Rc<dyn RunnerHost>> {
        let inner = self.inner.borrow();
        if inner.state.is_finished() {
            None
        } else {
            inner.host.clone()
        }
    }

    fn finish(&self, ok: bool) {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.is_finished() {
                return;
            }
            inner.state = if ok {
                RunnerState::Completed
            } else {
                RunnerState::Cancelled
            };
            inner.host = None;
            std::mem::take(&mut inner.done)
        };
        for callback in callbacks {
            callback(ok);
        }
    }

    /// Call `callback` once every runner has resolved, with `true` only if all
    /// of them succeeded. An empty list resolves immediately.
    pub fn all(runners: &[Runner], callback: impl FnOnce(bool) + 'static) {
        if runners.is_empty() {
            callback(true);
            return;
        }

        struct Join {
            remaining: usize,
            status: bool,
            callback: Option<DoneCallback>,
        }

        let join = Rc::new(RefCell::new(Join {
            remaining: runners.len(),
            status: true,
            callback: Some(Box::new(callback)),
        }));
        for runner in runners {
            let join = join.clone();
            runner.done(move |ok| {
                let ready = {
                    let mut j = join.borrow_mut();
                    j.status &= ok;
                    j.remaining -= 1;
                    if j.remaining == 0 {
                        j.callback.take().map(|cb| (cb, j.status))
                    } else {
                        None
                    }
                };
                if let Some((cb, status)) = ready {
                    cb(status);
                }
            });
        }
    }

    /// Run `steps` one after another, stopping at the first failure. `callback`
    /// receives `true` only when every step succeeded.
    pub fn chain(steps: Vec<ChainStep>, callback: impl FnOnce(bool) + 'static) {
        fn next(steps: Rc<RefCell<VecDeque<ChainStep>>>, callback: DoneCallback) {
            let step = steps.borrow_mut().pop_front();
            match step {
                None => callback(true),
                Some(step) => step(Box::new(move |ok| {
                    if ok {
                        next(steps, callback);
                    } else {
                        callback(false);
                    }
                })),
            }
        }

        next(
            Rc::new(RefCell::new(steps.into_iter().collect())),
            Box::new(callback),
        );
    }
}

impl RunnerHost for Runner {
    fn end(&self) {
        Runner::end(self);
    }

    fn cancel(&self) {
        Runner::cancel(self);
    }

    fn pause(&self) {
        Runner::pause(self);
    }

    fn resume(&self) {
        Runner::resume(self);
    }
}

/// Host built from closures, for drivers that keep their cleanup inline.
pub struct FnHost {
    on_end: Box<dyn Fn()>,
    on_cancel: Box<dyn Fn()>,
}

impl FnHost {
    /// Create a host from end and cancel callbacks.
    pub fn new(on_end: impl Fn() + 'static, on_cancel: impl Fn() + 'static) -> Rc<Self> {
        Rc::new(Self {
            on_end: Box::new(on_end),
            on_cancel: Box::new(on_cancel),
        })
    }
}

impl RunnerHost for FnHost {
    fn end(&self) {
        (self.on_end)();
    }

    fn cancel(&self) {
        (self.on_cancel)();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counting_host() -> (Rc<FnHost>, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let ends = Rc::new(Cell::new(0));
        let cancels = Rc::new(Cell::new(0));
        let (e, c) = (ends.clone(), cancels.clone());
        let host = FnHost::new(move || e.set(e.get() + 1), move || c.set(c.get() + 1));
        (host, ends, cancels)
    }

    #[test]
    fn test_end_resolves_once() {
        let (host, ends, _) = counting_host();
        let runner = Runner::with_host(host);
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let o = outcomes.clone();
        runner.done(move |ok| o.borrow_mut().push(ok));

        runner.end();
        runner.end();
        runner.cancel();

        assert_eq!(ends.get(), 1);
        assert_eq!(runner.state(), RunnerState::Completed);
        assert_eq!(*outcomes.borrow(), vec![true]);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (host, _, cancels) = counting_host();
        let runner = Runner::with_host(host);
        runner.cancel();
        runner.cancel();
        assert_eq!(cancels.get(), 1);
        assert_eq!(runner.outcome(), Some(false));
    }

    #[test]
    fn test_done_after_resolution_runs_immediately() {
        let runner = Runner::resolved(true);
        let hit = Rc::new(Cell::new(false));
        let h = hit.clone();
        runner.done(move |ok| h.set(ok));
        assert!(hit.get());
    }

    #[test]
    fn test_host_on_forwards_to_driver_runner() {
        let (host, _, cancels) = counting_host();
        let driver = Runner::with_host(host);
        let caller = Runner::new();
        caller.host_on(&driver);
        assert_eq!(caller.state(), RunnerState::Started);

        // Driver completion wired back the way the engine does it
        let c = caller.clone();
        driver.done(move |ok| c.complete(ok));

        caller.cancel();
        caller.cancel();
        assert_eq!(cancels.get(), 1);
        assert_eq!(driver.state(), RunnerState::Cancelled);
        assert_eq!(caller.state(), RunnerState::Cancelled);
    }

    #[test]
    fn test_superseded_runner_follows_newer() {
        let old = Runner::new();
        let newer = Runner::new();
        old.supersede_with(&newer);

        old.complete(true);
        assert!(!old.is_finished());

        newer.complete(false);
        assert_eq!(old.outcome(), Some(false));
    }

    #[test]
    fn test_superseded_end_reaches_newer() {
        let (host, ends, _) = counting_host();
        let old = Runner::new();
        let newer = Runner::with_host(host);
        old.supersede_with(&newer);

        old.end();
        assert_eq!(ends.get(), 1);
        assert!(newer.is_finished());
        assert_eq!(old.outcome(), Some(true));
    }

    #[test]
    fn test_all_waits_for_every_runner() {
        let a = Runner::new();
        let b = Runner::new();
        let result = Rc::new(Cell::new(None));
        let r = result.clone();
        Runner::all(&[a.clone(), b.clone()], move |ok| r.set(Some(ok)));

        a.complete(true);
        assert_eq!(result.get(), None);
        b.complete(false);
        assert_eq!(result.get(), Some(false));
    }

    #[test]
    fn test_all_empty_resolves() {
        let result = Rc::new(Cell::new(None));
        let r = result.clone();
        Runner::all(&[], move |ok| r.set(Some(ok)));
        assert_eq!(result.get(), Some(true));
    }

    #[test]
    fn test_chain_stops_at_failure() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let step = |name: &'static str, ok: bool, log: Rc<RefCell<Vec<&'static str>>>| -> ChainStep {
            Box::new(move |next: DoneCallback| {
                log.borrow_mut().push(name);
                next(ok);
            })
        };
        let result = Rc::new(Cell::new(None));
        let r = result.clone();
        Runner::chain(
            vec![
                step("a", true, log.clone()),
                step("b", false, log.clone()),
                step("c", true, log.clone()),
            ],
            move |ok| r.set(Some(ok)),
        );
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        assert_eq!(result.get(), Some(false));
    }

    #[test]
    fn test_pause_and_resume_forward() {
        struct PauseHost(Rc<RefCell<Vec<&'static str>>>);
        impl RunnerHost for PauseHost {
            fn end(&self) {}
            fn cancel(&self) {}
            fn pause(&self) {
                self.0.borrow_mut().push("pause");
            }
            fn resume(&self) {
                self.0.borrow_mut().push("resume");
            }
        }
        let log = Rc::new(RefCell::new(Vec::new()));
        let runner = Runner::with_host(Rc::new(PauseHost(log.clone())));
        runner.pause();
        runner.resume();
        runner.end();
        runner.pause();
        assert_eq!(*log.borrow(), vec!["pause", "resume"]);
    }
}
