//! Animation engine: request collection and hierarchical dispatch.
//!
//! The `AnimationEngine` is the entry point for all animations on a document.
//! It handles:
//! - Returning a [`Runner`] synchronously from every `animate` call
//! - Collecting requests until the end of the current update cycle
//! - Grouping anchored leave/enter pairs into joint units
//! - Ordering units by element ancestry, one frame per ancestry level
//! - Handing each unit to the newest driver willing to animate it
//! - Superseding an element's unfinished runner when it animates again
//!
//! # Usage
//!
//! ```ignore
//! let doc = Document::new();
//! let digest = Rc::new(DigestCycle::new());
//! let frames = Rc::new(RafScheduler::new());
//! let engine = AnimationEngine::new(doc.clone(), digest.clone(), frames.clone());
//!
//! engine.register_driver("css", |details: &AnimationDetails| {
//!     Some(StartHandle::new(|| Runner::resolved(true)))
//! });
//!
//! let runner = engine.animate(item, AnimationEvent::Enter, AnimateOptions::new());
//! digest.digest(); // post-update pass, level 0 starts immediately
//! frames.tick();   // level 1
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rune_config::AnimateConfig;
use tracing::{debug, trace};

use crate::cache::{AnimateCache, AnimationCache};
use crate::digest::PostDigest;
use crate::document::{Document, ElementId};
use crate::driver::{AnimationDriver, DriverRegistry};
use crate::event::AnimationEvent;
use crate::frames::{FrameScheduler, FrameTask, Level};
use crate::grouping::{self, AnimationUnit};
use crate::options::AnimateOptions;
use crate::request::{AnimationRequest, MarkerClasses, RunnerTable};
use crate::runner::Runner;
use crate::sorter;

struct EngineInner {
    document: Document,
    digest: Rc<dyn PostDigest>,
    frames: Rc<dyn FrameScheduler>,
    cache: RefCell<Rc<dyn AnimationCache>>,
    config: RefCell<AnimateConfig>,
    drivers: DriverRegistry,
    runners: Rc<RunnerTable>,
    queue: RefCell<Vec<Rc<AnimationRequest>>>,
    /// Post-update hook registered for the current batch.
    hook_pending: Cell<bool>,
}

/// Schedules animations for one document.
#[derive(Clone)]
pub struct AnimationEngine {
    inner: Rc<EngineInner>,
}

impl std::fmt::Debug for AnimationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationEngine")
            .field("drivers", &self.inner.drivers)
            .field("pending_requests", &self.pending_requests())
            .field("active_runners", &self.inner.runners.len())
            .finish()
    }
}

impl AnimationEngine {
    /// Create an engine with the default cache and configuration.
    pub fn new(
        document: Document,
        digest: Rc<dyn PostDigest>,
        frames: Rc<dyn FrameScheduler>,
    ) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                document,
                digest,
                frames,
                cache: RefCell::new(Rc::new(AnimateCache::new())),
                config: RefCell::new(AnimateConfig::default()),
                drivers: DriverRegistry::new(),
                runners: Rc::new(RunnerTable::default()),
                queue: RefCell::new(Vec::new()),
                hook_pending: Cell::new(false),
            }),
        }
    }

    /// Use `cache` for zero-duration lookups.
    pub fn with_cache(self, cache: Rc<dyn AnimationCache>) -> Self {
        *self.inner.cache.borrow_mut() = cache;
        self
    }

    /// Replace the configuration.
    pub fn with_config(self, config: AnimateConfig) -> Self {
        self.set_config(config);
        self
    }

    pub fn set_config(&self, config: AnimateConfig) {
        *self.inner.config.borrow_mut() = config;
    }

    pub fn config(&self) -> AnimateConfig {
        self.inner.config.borrow().clone()
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// Register a driver. Drivers registered later are asked first.
    pub fn register_driver(&self, name: impl Into<String>, driver: impl AnimationDriver + 'static) {
        self.inner.drivers.register(name, Rc::new(driver));
    }

    /// Names of registered drivers, in registration order.
    pub fn drivers(&self) -> Vec<String> {
        self.inner.drivers.names()
    }

    /// Requests queued for the next post-update pass.
    pub fn pending_requests(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// The unfinished runner currently owning `element`, if any.
    pub fn active_runner(&self, element: ElementId) -> Option<Runner> {
        self.inner.runners.get(element)
    }

    /// Request an animation. Never fails: anything that cannot be animated
    /// resolves the returned runner successfully.
    pub fn animate(&self, element: ElementId, event: AnimationEvent, options: AnimateOptions) -> Runner {
        let inner = &self.inner;
        let config = inner.config.borrow().clone();
        let markers = MarkerClasses {
            animate: config.animate_class.clone(),
            prepare: Some(config.prepare_class(event.as_str())),
        };
        let request = AnimationRequest::new(
            &inner.document,
            inner.runners.clone(),
            element,
            event,
            options,
            markers,
        );
        let runner = request.runner.clone();

        if !config.enabled || inner.drivers.is_empty() {
            trace!(runner = runner.id(), event = %request.event, "no drivers, closing immediately");
            request.close(false);
            return runner;
        }

        if let Some(previous) = inner.runners.set(element, runner.clone()) {
            if !previous.runner.is_finished() {
                trace!(old = previous.runner.id(), new = runner.id(), "superseding runner");
                previous.runner.supersede_with(&runner);
            }
            // The old driver animation settles now so its final state lands
            // before the newer request closes.
            if let Some(driver) = previous.driver.filter(|d| !d.is_finished()) {
                trace!(driver = driver.id(), "ending superseded driver animation");
                driver.end();
            }
        }

        let listener = {
            let runners = inner.runners.clone();
            let weak = Rc::downgrade(&request);
            inner.document.on_destroy(
                element,
                Rc::new(move |el: ElementId| {
                    let Some(request) = weak.upgrade() else {
                        return;
                    };
                    if request.event == AnimationEvent::Leave && request.dom_operation_fired() {
                        return;
                    }
                    if let Some(runner) = runners.get(el) {
                        runner.end();
                    }
                }),
            )
        };
        request.set_listener(listener);

        trace!(
            runner = runner.id(),
            event = %request.event,
            classes = %request.classes,
            "queued animation"
        );
        inner.queue.borrow_mut().push(request);

        if !inner.hook_pending.replace(true) {
            let engine = self.inner.clone();
            inner
                .digest
                .post_digest(Box::new(move || EngineInner::post_digest_pass(&engine)));
        }

        runner
    }
}

impl EngineInner {
    fn post_digest_pass(self: &Rc<Self>) {
        self.hook_pending.set(false);
        let requests = std::mem::take(&mut *self.queue.borrow_mut());
        let config = self.config.borrow().clone();

        let mut live = Vec::with_capacity(requests.len());
        for request in requests {
            if request.is_live() {
                live.push(request);
            } else {
                trace!(runner = request.runner.id(), "dropping stale request");
                request.close(false);
            }
        }
        let request_count = live.len();

        let units = grouping::group(
            live,
            &self.document,
            &config.anchor_attribute,
            &config.reserved_prefix,
        );
        let unit_count = units.len();

        // Keys are taken before any prepare class lands on an element.
        let cache = self.cache.borrow().clone();
        let entries: Vec<(ElementId, Rc<AnimationUnit>)> = units
            .into_iter()
            .map(|unit| {
                let primary = unit.primary();
                let element = primary.element;
                let (add, remove) = primary.class_deltas();
                let extra = match add.as_deref() {
                    Some(add) if !add.is_empty() => format!("{add} {}", config.animate_class),
                    _ => config.animate_class.clone(),
                };
                let key = cache.cache_key(
                    &self.document,
                    element,
                    primary.event.as_str(),
                    Some(&extra),
                    remove.as_deref(),
                );
                primary.set_cache_key(key);
                (element, Rc::new(unit))
            })
            .collect();
        let document = self.document.clone();
        let levels = sorter::sort(entries, |element| document.parent(*element));

        let mut scheduled: Vec<Level> = Vec::with_capacity(levels.len());
        for (depth, level) in levels.into_iter().enumerate() {
            let mut tasks: Vec<FrameTask> = Vec::with_capacity(level.len());
            for unit in level {
                if depth == 0 {
                    unit.drop_prepare_class();
                } else {
                    unit.apply_prepare_class();
                }
                let engine = self.clone();
                tasks.push(Box::new(move || engine.dispatch(&unit)));
            }
            scheduled.push(tasks);
        }

        debug!(
            requests = request_count,
            units = unit_count,
            levels = scheduled.len(),
            "post-digest pass"
        );
        self.frames.schedule(scheduled);
    }

    /// Start one unit: the body of every scheduled frame task.
    fn dispatch(&self, unit: &Rc<AnimationUnit>) {
        let cache = self.cache.borrow().clone();
        if let Some(key) = unit.primary().cache_key() {
            if cache.contains_cached_animation_without_duration(&key) {
                debug!(key = %key, "cached zero-duration animation, skipping drivers");
                unit.close(false);
                return;
            }
        }

        unit.before_start();

        let primary = unit.primary();
        if !unit.is_live() {
            trace!(runner = primary.runner.id(), "unit no longer live at dispatch");
            unit.close(false);
            return;
        }

        let details = unit.details();
        let Some((driver, handle)) = self.drivers.invoke(&details) else {
            debug!(event = %details.event(), "no driver claimed the animation");
            unit.close(false);
            return;
        };

        trace!(driver = %driver, runner = primary.runner.id(), event = %details.event(), "starting driver");
        let driver_runner = handle.start();
        let closing = unit.clone();
        driver_runner.done(move |ok| closing.close(!ok));

        for element in unit.hosted_elements() {
            if let Some(runner) = self.runners.get(element) {
                runner.host_on(&driver_runner);
                self.runners.attach_driver(element, &runner, &driver_runner);
            }
        }
    }
}
