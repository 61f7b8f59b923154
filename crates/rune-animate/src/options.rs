//! Caller supplied animation options.
//!
//! Options travel with a request from `animate` to the driver. The engine only
//! interprets the class deltas, temporary classes, style snapshots and the DOM
//! operation; everything under `extra` is handed to drivers untouched.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::document::{Document, ElementId};

/// Inline style snapshot, property name to value.
pub type StyleMap = BTreeMap<String, String>;

struct DomOperationInner {
    fired: Cell<bool>,
    op: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// A DOM mutation run when the animation closes. Runs at most once even when
/// shared between option snapshots.
#[derive(Clone)]
pub struct DomOperation {
    inner: Rc<DomOperationInner>,
}

impl DomOperation {
    /// Wrap a callback.
    pub fn new(op: impl FnOnce() + 'static) -> Self {
        Self {
            inner: Rc::new(DomOperationInner {
                fired: Cell::new(false),
                op: RefCell::new(Some(Box::new(op))),
            }),
        }
    }

    /// Run the operation unless it already ran.
    pub fn run(&self) {
        if self.inner.fired.replace(true) {
            return;
        }
        let op = self.inner.op.borrow_mut().take();
        if let Some(op) = op {
            op();
        }
    }

    /// Whether [`DomOperation::run`] has been called.
    pub fn has_fired(&self) -> bool {
        self.inner.fired.get()
    }
}

impl std::fmt::Debug for DomOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomOperation")
            .field("fired", &self.has_fired())
            .finish()
    }
}

/// Options accepted by [`crate::AnimationEngine::animate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimateOptions {
    /// Classes added when the animation closes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_class: Option<String>,
    /// Classes removed when the animation closes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_class: Option<String>,
    /// Classes present only while the animation runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_classes: Option<String>,
    /// Styles applied first when the animation closes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<StyleMap>,
    /// Styles applied last when the animation closes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<StyleMap>,
    /// DOM mutation run when the animation closes.
    #[serde(skip)]
    pub dom_operation: Option<DomOperation>,
    /// Driver specific settings, passed through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AnimateOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `add_class`.
    pub fn with_add_class(mut self, classes: impl Into<String>) -> Self {
        self.add_class = Some(classes.into());
        self
    }

    /// Set `remove_class`.
    pub fn with_remove_class(mut self, classes: impl Into<String>) -> Self {
        self.remove_class = Some(classes.into());
        self
    }

    /// Set `temp_classes`.
    pub fn with_temp_classes(mut self, classes: impl Into<String>) -> Self {
        self.temp_classes = Some(classes.into());
        self
    }

    /// Set a `from` style.
    pub fn with_from_style(mut self, property: &str, value: &str) -> Self {
        self.from
            .get_or_insert_with(StyleMap::new)
            .insert(property.to_string(), value.to_string());
        self
    }

    /// Set a `to` style.
    pub fn with_to_style(mut self, property: &str, value: &str) -> Self {
        self.to
            .get_or_insert_with(StyleMap::new)
            .insert(property.to_string(), value.to_string());
        self
    }

    /// Attach a DOM operation.
    pub fn with_dom_operation(mut self, op: impl FnOnce() + 'static) -> Self {
        self.dom_operation = Some(DomOperation::new(op));
        self
    }

    /// Whether the DOM operation already ran.
    pub fn dom_operation_fired(&self) -> bool {
        self.dom_operation
            .as_ref()
            .is_some_and(DomOperation::has_fired)
    }

    /// Apply and clear the pending class deltas.
    pub(crate) fn apply_classes(&mut self, doc: &Document, element: ElementId) {
        if let Some(add) = self.add_class.take() {
            doc.add_class(element, &add);
        }
        if let Some(remove) = self.remove_class.take() {
            doc.remove_class(element, &remove);
        }
    }

    /// Apply and clear the `from` then `to` style snapshots.
    pub(crate) fn apply_styles(&mut self, doc: &Document, element: ElementId) {
        for styles in [self.from.take(), self.to.take()].into_iter().flatten() {
            for (property, value) in &styles {
                doc.set_style(element, property, value);
            }
        }
    }
}
