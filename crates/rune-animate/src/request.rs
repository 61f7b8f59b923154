//! Queued animation requests and the per-element runner table.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::classes::ClassList;
use crate::document::{Document, ElementId, ListenerId};
use crate::driver::RequestDetails;
use crate::event::AnimationEvent;
use crate::options::AnimateOptions;
use crate::runner::{Runner, RunnerHost};

/// An element's caller runner and, once started, the driver animation it follows.
#[derive(Debug, Clone)]
pub(crate) struct RunnerEntry {
    pub runner: Runner,
    pub driver: Option<Runner>,
}

/// The live runner of each animating element.
#[derive(Debug, Default)]
pub(crate) struct RunnerTable {
    runners: RefCell<HashMap<ElementId, RunnerEntry>>,
}

impl RunnerTable {
    pub fn get(&self, element: ElementId) -> Option<Runner> {
        self.runners
            .borrow()
            .get(&element)
            .map(|entry| entry.runner.clone())
    }

    /// Store `runner`, returning the entry it replaced.
    pub fn set(&self, element: ElementId, runner: Runner) -> Option<RunnerEntry> {
        self.runners
            .borrow_mut()
            .insert(element, RunnerEntry { runner, driver: None })
    }

    /// Record the driver animation `runner` now follows.
    pub fn attach_driver(&self, element: ElementId, runner: &Runner, driver: &Runner) {
        if let Some(entry) = self.runners.borrow_mut().get_mut(&element) {
            if entry.runner.ptr_eq(runner) {
                entry.driver = Some(driver.clone());
            }
        }
    }

    /// Remove the entry only while it still points at `runner`.
    pub fn remove_if_same(&self, element: ElementId, runner: &Runner) {
        let mut runners = self.runners.borrow_mut();
        if runners.get(&element).is_some_and(|e| e.runner.ptr_eq(runner)) {
            runners.remove(&element);
        }
    }

    pub fn is_current(&self, element: ElementId, runner: &Runner) -> bool {
        self.runners
            .borrow()
            .get(&element)
            .is_some_and(|e| e.runner.ptr_eq(runner))
    }

    pub fn len(&self) -> usize {
        self.runners.borrow().len()
    }
}

/// Class names the engine itself toggles on animating elements.
#[derive(Debug, Clone)]
pub(crate) struct MarkerClasses {
    /// Present from dispatch until close.
    pub animate: String,
    /// Structural hint applied to elements waiting for a later frame.
    pub prepare: Option<String>,
}

/// One `animate` call, from queueing until close.
pub(crate) struct AnimationRequest {
    pub element: ElementId,
    pub event: AnimationEvent,
    /// Element classes merged with the pending class deltas and temporary classes.
    pub classes: ClassList,
    pub runner: Runner,
    options: RefCell<AnimateOptions>,
    temp_classes: Option<String>,
    animate_class: String,
    prepare_class: RefCell<Option<String>>,
    cache_key: RefCell<Option<String>>,
    listener: Cell<Option<ListenerId>>,
    closed: Cell<bool>,
    doc: Document,
    runners: Rc<RunnerTable>,
}

impl std::fmt::Debug for AnimationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationRequest")
            .field("element", &self.element)
            .field("event", &self.event)
            .field("classes", &self.classes)
            .field("runner", &self.runner.id())
            .field("closed", &self.closed.get())
            .finish()
    }
}

/// Routes a pending runner's `end`/`cancel` to its request's close.
struct RequestHost {
    request: Weak<AnimationRequest>,
}

impl RunnerHost for RequestHost {
    fn end(&self) {
        if let Some(request) = self.request.upgrade() {
            request.close(false);
        }
    }

    fn cancel(&self) {
        if let Some(request) = self.request.upgrade() {
            request.close(true);
        }
    }
}

impl AnimationRequest {
    /// Build a request and its runner. Temporary classes move out of `options`.
    pub fn new(
        doc: &Document,
        runners: Rc<RunnerTable>,
        element: ElementId,
        event: AnimationEvent,
        mut options: AnimateOptions,
        markers: MarkerClasses,
    ) -> Rc<Self> {
        let mut classes = doc.classes(element);
        for delta in [&options.add_class, &options.remove_class].into_iter().flatten() {
            classes.extend_str(delta);
        }
        let temp_classes = options.temp_classes.take();
        if let Some(temp) = &temp_classes {
            classes = classes.merge(&ClassList::parse(temp));
        }
        let prepare_class = markers.prepare.filter(|_| event.is_structural());

        Rc::new_cyclic(|weak| Self {
            element,
            event,
            classes,
            runner: Runner::with_host(Rc::new(RequestHost {
                request: weak.clone(),
            })),
            options: RefCell::new(options),
            temp_classes,
            animate_class: markers.animate,
            prepare_class: RefCell::new(prepare_class),
            cache_key: RefCell::new(None),
            listener: Cell::new(None),
            closed: Cell::new(false),
            doc: doc.clone(),
            runners,
        })
    }

    pub fn structural(&self) -> bool {
        self.event.is_structural()
    }

    pub fn set_listener(&self, listener: ListenerId) {
        self.listener.set(Some(listener));
    }

    /// Pending `(add_class, remove_class)` deltas.
    pub fn class_deltas(&self) -> (Option<String>, Option<String>) {
        let options = self.options.borrow();
        (options.add_class.clone(), options.remove_class.clone())
    }

    pub fn set_cache_key(&self, key: String) {
        *self.cache_key.borrow_mut() = Some(key);
    }

    pub fn cache_key(&self) -> Option<String> {
        self.cache_key.borrow().clone()
    }

    pub fn dom_operation_fired(&self) -> bool {
        self.options.borrow().dom_operation_fired()
    }

    /// Whether the element's table entry still points at this request's runner.
    pub fn is_live(&self) -> bool {
        !self.doc.is_destroyed(self.element) && self.runners.is_current(self.element, &self.runner)
    }

    pub fn details(&self) -> RequestDetails {
        RequestDetails {
            element: self.element,
            event: self.event.clone(),
            structural: self.structural(),
            classes: self.classes.clone(),
            options: self.options.borrow().clone(),
            cache_key: self.cache_key(),
        }
    }

    /// Put the prepare class on the element until dispatch.
    pub fn apply_prepare_class(&self) {
        if self.closed.get() {
            return;
        }
        if let Some(class) = self.prepare_class.borrow().as_deref() {
            self.doc.add_class(self.element, class);
        }
    }

    /// Forget the prepare class without touching the element.
    pub fn drop_prepare_class(&self) {
        self.prepare_class.borrow_mut().take();
    }

    /// Swap the prepare class for the in-flight classes.
    pub fn before_start(&self) {
        if self.closed.get() {
            return;
        }
        self.doc.add_class(self.element, &self.animate_class);
        if let Some(temp) = &self.temp_classes {
            self.doc.add_class(self.element, temp);
        }
        let prepare = self.prepare_class.borrow_mut().take();
        if let Some(class) = prepare {
            self.doc.remove_class(self.element, &class);
        }
    }

    /// Apply the final classes, styles and DOM operation, then resolve the
    /// runner. Runs at most once.
    pub fn close(&self, rejected: bool) {
        if self.closed.replace(true) {
            return;
        }

        if let Some(listener) = self.listener.take() {
            self.doc.off_destroy(self.element, listener);
        }
        self.runners.remove_if_same(self.element, &self.runner);

        let dom_operation = {
            let mut options = self.options.borrow_mut();
            options.apply_classes(&self.doc, self.element);
            options.apply_styles(&self.doc, self.element);
            options.dom_operation.clone()
        };
        if let Some(op) = dom_operation {
            op.run();
        }

        if let Some(temp) = &self.temp_classes {
            self.doc.remove_class(self.element, temp);
        }
        self.doc.remove_class(self.element, &self.animate_class);
        let prepare = self.prepare_class.borrow_mut().take();
        if let Some(class) = prepare {
            self.doc.remove_class(self.element, &class);
        }

        self.runner.complete(!rejected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> MarkerClasses {
        MarkerClasses {
            animate: "ng-animate".into(),
            prepare: Some("ng-enter-prepare".into()),
        }
    }

    #[test]
    fn test_request_merges_classes_and_takes_temp() {
        let doc = Document::new();
        let el = doc.element(doc.root(), "div").unwrap();
        doc.add_class(el, "base");
        let runners = Rc::new(RunnerTable::default());

        let request = AnimationRequest::new(
            &doc,
            runners,
            el,
            AnimationEvent::AddClass,
            AnimateOptions::new()
                .with_add_class("on")
                .with_remove_class("off")
                .with_temp_classes("busy"),
            markers(),
        );

        assert_eq!(request.classes.to_string(), "base on off busy");
        assert!(request.details().options.temp_classes.is_none());
        // Non-structural events never get a prepare class
        request.apply_prepare_class();
        assert!(!doc.has_class(el, "ng-enter-prepare"));
    }

    #[test]
    fn test_before_start_and_close_toggle_classes() {
        let doc = Document::new();
        let el = doc.element(doc.root(), "div").unwrap();
        let runners = Rc::new(RunnerTable::default());
        let request = AnimationRequest::new(
            &doc,
            runners.clone(),
            el,
            AnimationEvent::Enter,
            AnimateOptions::new()
                .with_add_class("done")
                .with_temp_classes("busy"),
            markers(),
        );
        runners.set(el, request.runner.clone());

        request.apply_prepare_class();
        assert!(doc.has_class(el, "ng-enter-prepare"));

        request.before_start();
        assert!(!doc.has_class(el, "ng-enter-prepare"));
        assert!(doc.has_class(el, "ng-animate"));
        assert!(doc.has_class(el, "busy"));

        request.close(false);
        assert!(!doc.has_class(el, "ng-animate"));
        assert!(!doc.has_class(el, "busy"));
        assert!(doc.has_class(el, "done"));
        assert_eq!(request.runner.outcome(), Some(true));
        assert_eq!(runners.len(), 0);
    }

    #[test]
    fn test_runner_end_closes_request_once() {
        let doc = Document::new();
        let el = doc.element(doc.root(), "div").unwrap();
        let runners = Rc::new(RunnerTable::default());
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let request = AnimationRequest::new(
            &doc,
            runners,
            el,
            AnimationEvent::Leave,
            AnimateOptions::new().with_dom_operation(move || h.set(h.get() + 1)),
            markers(),
        );

        request.runner.cancel();
        request.runner.end();
        request.close(false);

        assert!(request.closed.get());
        assert!(request.dom_operation_fired());
        assert_eq!(hits.get(), 1);
        assert_eq!(request.runner.outcome(), Some(false));
    }

    #[test]
    fn test_remove_if_same_keeps_newer_runner() {
        let doc = Document::new();
        let el = doc.element(doc.root(), "div").unwrap();
        let table = RunnerTable::default();
        let old = Runner::new();
        let newer = Runner::new();
        table.set(el, old.clone());
        table.set(el, newer.clone());

        table.remove_if_same(el, &old);
        assert!(table.is_current(el, &newer));
        table.remove_if_same(el, &newer);
        assert!(table.get(el).is_none());
    }

    #[test]
    fn test_closed_request_ignores_before_start() {
        let doc = Document::new();
        let el = doc.element(doc.root(), "div").unwrap();
        let request = AnimationRequest::new(
            &doc,
            Rc::new(RunnerTable::default()),
            el,
            AnimationEvent::Enter,
            AnimateOptions::new().with_temp_classes("busy"),
            markers(),
        );

        request.close(false);
        request.apply_prepare_class();
        request.before_start();
        assert_eq!(doc.classes(el).to_string(), "");
    }

    #[test]
    fn test_attach_driver_follows_current_runner_only() {
        let doc = Document::new();
        let el = doc.element(doc.root(), "div").unwrap();
        let table = RunnerTable::default();
        let old = Runner::new();
        let newer = Runner::new();
        let driver = Runner::new();
        table.set(el, newer.clone());

        table.attach_driver(el, &old, &driver);
        assert!(table.set(el, newer.clone()).is_some_and(|e| e.driver.is_none()));

        table.attach_driver(el, &newer, &driver);
        let replaced = table.set(el, old.clone()).unwrap();
        assert!(replaced.runner.ptr_eq(&newer));
        assert!(replaced.driver.is_some_and(|d| d.ptr_eq(&driver)));
    }
}
