//! Animation drivers and the registry that selects one per unit.
//!
//! A driver inspects the details of a unit and either declines (`None`) or
//! returns a [`StartHandle`]. Starting the handle produces the driver's own
//! [`Runner`], which the engine hosts the caller's runner on.
//!
//! Drivers are tried newest first: the last registered driver gets the first
//! chance to claim a unit.
//!
//! # Usage
//!
//! ```ignore
//! engine.register_driver("instant", |details: &AnimationDetails| {
//!     Some(StartHandle::new(|| Runner::resolved(true)))
//! });
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::classes::ClassList;
use crate::document::ElementId;
use crate::event::AnimationEvent;
use crate::options::AnimateOptions;
use crate::runner::{FnHost, Runner};

/// Snapshot of one request as seen by a driver.
#[derive(Debug, Clone)]
pub struct RequestDetails {
    pub element: ElementId,
    pub event: AnimationEvent,
    pub structural: bool,
    /// Marker classes: current classes plus the pending class deltas.
    pub classes: ClassList,
    pub options: AnimateOptions,
    /// Key the engine checks for cached zero-duration animations.
    pub cache_key: Option<String>,
}

/// Two elements sharing an anchor key across an anchored transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPair {
    /// Anchor inside the leaving element.
    pub out: ElementId,
    /// Anchor inside the entering element.
    pub in_: ElementId,
}

/// What a driver is asked to animate.
#[derive(Debug, Clone)]
pub enum AnimationDetails {
    /// One request animating on its own.
    Single(RequestDetails),
    /// A leave/enter pair joined through shared anchors.
    Anchored {
        from: RequestDetails,
        to: RequestDetails,
        /// Non-reserved classes shared by both sides.
        classes: ClassList,
        anchors: Vec<AnchorPair>,
    },
}

impl AnimationDetails {
    /// Whether this unit is an anchored pair.
    pub fn is_anchored(&self) -> bool {
        matches!(self, Self::Anchored { .. })
    }

    /// The event driving the unit. Anchored pairs report the incoming side.
    pub fn event(&self) -> &AnimationEvent {
        match self {
            Self::Single(request) => &request.event,
            Self::Anchored { to, .. } => &to.event,
        }
    }

    /// Whether the unit is structural.
    pub fn structural(&self) -> bool {
        match self {
            Self::Single(request) => request.structural,
            Self::Anchored { .. } => true,
        }
    }

    /// Marker classes of the unit.
    pub fn classes(&self) -> &ClassList {
        match self {
            Self::Single(request) => &request.classes,
            Self::Anchored { classes, .. } => classes,
        }
    }

    /// Elements animated by the unit, "from" before "to".
    pub fn elements(&self) -> Vec<ElementId> {
        match self {
            Self::Single(request) => vec![request.element],
            Self::Anchored { from, to, .. } => vec![from.element, to.element],
        }
    }

    /// Cache key of the unit ("from" side for anchored pairs).
    pub fn cache_key(&self) -> Option<&str> {
        match self {
            Self::Single(request) => request.cache_key.as_deref(),
            Self::Anchored { from, .. } => from.cache_key.as_deref(),
        }
    }

    /// Anchor pairs; empty for single units.
    pub fn anchors(&self) -> &[AnchorPair] {
        match self {
            Self::Single(_) => &[],
            Self::Anchored { anchors, .. } => anchors,
        }
    }
}

/// Deferred start of a driver animation.
pub struct StartHandle {
    start: Box<dyn FnOnce() -> Runner>,
}

impl StartHandle {
    /// Wrap a start function.
    pub fn new(start: impl FnOnce() -> Runner + 'static) -> Self {
        Self {
            start: Box::new(start),
        }
    }

    /// Start the animation.
    pub fn start(self) -> Runner {
        (self.start)()
    }
}

impl std::fmt::Debug for StartHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartHandle").finish_non_exhaustive()
    }
}

/// Something that can animate units.
pub trait AnimationDriver {
    /// Claim the unit by returning a start handle, or decline with `None`.
    fn invoke(&self, details: &AnimationDetails) -> Option<StartHandle>;
}

impl<F> AnimationDriver for F
where
    F: Fn(&AnimationDetails) -> Option<StartHandle>,
{
    fn invoke(&self, details: &AnimationDetails) -> Option<StartHandle> {
        self(details)
    }
}

/// Ordered set of registered drivers.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RefCell<Vec<(String, Rc<dyn AnimationDriver>)>>,
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a driver. Later registrations are tried first.
    pub fn register(&self, name: impl Into<String>, driver: Rc<dyn AnimationDriver>) {
        self.drivers.borrow_mut().push((name.into(), driver));
    }

    pub fn len(&self) -> usize {
        self.drivers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.borrow().is_empty()
    }

    /// Driver names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.drivers
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Ask drivers newest first; the first handle wins. Returns the winning
    /// driver's name with its handle.
    pub fn invoke(&self, details: &AnimationDetails) -> Option<(String, StartHandle)> {
        // Drivers may register further drivers while being asked.
        let drivers: Vec<_> = self.drivers.borrow().iter().rev().cloned().collect();
        drivers
            .into_iter()
            .find_map(|(name, driver)| driver.invoke(details).map(|handle| (name, handle)))
    }
}

/// Run the `out` anchor animation, then the `in_` animation once `out` has
/// ended successfully. Ending or cancelling the combined runner reaches the
/// step that is currently running; a stopped sequence never starts `in_`.
pub fn anchor_sequence(out: StartHandle, in_: StartHandle) -> StartHandle {
    StartHandle::new(move || {
        let active: Rc<RefCell<Option<Runner>>> = Rc::new(RefCell::new(None));
        let stopped = Rc::new(Cell::new(false));

        let (a_end, s_end) = (active.clone(), stopped.clone());
        let (a_cancel, s_cancel) = (active.clone(), stopped.clone());
        let combined = Runner::with_host(FnHost::new(
            move || {
                s_end.set(true);
                let current = a_end.borrow().clone();
                if let Some(runner) = current {
                    runner.end();
                }
            },
            move || {
                s_cancel.set(true);
                let current = a_cancel.borrow().clone();
                if let Some(runner) = current {
                    runner.cancel();
                }
            },
        ));

        let first = out.start();
        *active.borrow_mut() = Some(first.clone());

        let (c, a) = (combined.clone(), active.clone());
        first.done(move |ok| {
            a.borrow_mut().take();
            if !ok || stopped.get() {
                c.complete(ok);
                return;
            }
            let second = in_.start();
            *a.borrow_mut() = Some(second.clone());
            second.done(move |ok| {
                a.borrow_mut().take();
                c.complete(ok);
            });
        });

        combined
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn details(doc: &Document) -> AnimationDetails {
        let el = doc.element(doc.root(), "div").unwrap();
        AnimationDetails::Single(RequestDetails {
            element: el,
            event: AnimationEvent::Enter,
            structural: true,
            classes: ClassList::parse("item"),
            options: AnimateOptions::new(),
            cache_key: None,
        })
    }

    #[test]
    fn test_newest_driver_wins() {
        let doc = Document::new();
        let registry = DriverRegistry::new();
        registry.register(
            "old",
            Rc::new(|_: &AnimationDetails| Some(StartHandle::new(|| Runner::resolved(true)))),
        );
        registry.register(
            "new",
            Rc::new(|_: &AnimationDetails| Some(StartHandle::new(|| Runner::resolved(false)))),
        );

        let (name, handle) = registry.invoke(&details(&doc)).unwrap();
        assert_eq!(name, "new");
        assert_eq!(handle.start().outcome(), Some(false));
        assert_eq!(registry.names(), vec!["old", "new"]);
    }

    #[test]
    fn test_declining_driver_falls_through() {
        let doc = Document::new();
        let registry = DriverRegistry::new();
        registry.register(
            "css",
            Rc::new(|_: &AnimationDetails| Some(StartHandle::new(Runner::new))),
        );
        registry.register(
            "js",
            Rc::new(|_: &AnimationDetails| -> Option<StartHandle> { None }),
        );

        let (name, _) = registry.invoke(&details(&doc)).unwrap();
        assert_eq!(name, "css");
    }

    #[test]
    fn test_no_driver_claims() {
        let doc = Document::new();
        let registry = DriverRegistry::new();
        assert!(registry.invoke(&details(&doc)).is_none());
        registry.register(
            "never",
            Rc::new(|_: &AnimationDetails| -> Option<StartHandle> { None }),
        );
        assert!(registry.invoke(&details(&doc)).is_none());
    }

    #[test]
    fn test_anchor_sequence_runs_in_after_out() {
        let out = Runner::new();
        let in_ = Runner::new();
        let started = Rc::new(RefCell::new(Vec::new()));

        let (o, s1) = (out.clone(), started.clone());
        let (i, s2) = (in_.clone(), started.clone());
        let combined = anchor_sequence(
            StartHandle::new(move || {
                s1.borrow_mut().push("out");
                o
            }),
            StartHandle::new(move || {
                s2.borrow_mut().push("in");
                i
            }),
        )
        .start();

        assert_eq!(*started.borrow(), vec!["out"]);
        out.complete(true);
        assert_eq!(*started.borrow(), vec!["out", "in"]);
        assert!(!combined.is_finished());

        in_.complete(true);
        assert_eq!(combined.outcome(), Some(true));
    }

    #[test]
    fn test_anchor_sequence_cancel_stops_before_in() {
        let out = Runner::new();
        let started_in = Rc::new(Cell::new(false));
        let o = out.clone();
        let s = started_in.clone();
        let combined = anchor_sequence(
            StartHandle::new(move || o),
            StartHandle::new(move || {
                s.set(true);
                Runner::new()
            }),
        )
        .start();

        combined.cancel();
        assert_eq!(out.outcome(), Some(false));
        assert_eq!(combined.outcome(), Some(false));
        assert!(!started_in.get());

        combined.end();
        assert_eq!(combined.outcome(), Some(false));
    }
}
