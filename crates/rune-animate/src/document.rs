//! Element tree consumed by the animation engine.
//!
//! `Document` is a cheap, cloneable handle over an `ego_tree::Tree` of elements.
//! The engine only needs a narrow surface from it:
//! - parent lookup (ancestry sorting) and descendant search (anchor discovery)
//! - attribute reads, class add/remove and inline style writes
//! - destroy notifications when an element leaves the tree
//!
//! Destroy listeners run after the internal borrow is released, so a listener
//! may freely read or mutate the document again.
//!
//! # Usage
//!
//! ```ignore
//! let doc = Document::new();
//! let list = doc.element(doc.root(), "ul")?;
//! let item = doc.element(list, "li")?;
//! doc.add_class(item, "active");
//! assert_eq!(doc.parent(item), Some(list));
//! doc.remove(list)?; // fires destroy listeners for `list` and `item`
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use ego_tree::{NodeId, Tree};

use crate::classes::ClassList;
use crate::error::{AnimateError, Result};

/// Handle to one element of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(NodeId);

/// Identifier returned by [`Document::on_destroy`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback invoked with the id of the destroyed element.
pub type DestroyListener = Rc<dyn Fn(ElementId)>;

/// Per-element state stored in the tree.
#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    classes: ClassList,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    /// Stable, document-unique number (used in cache keys).
    serial: u64,
    destroyed: bool,
}

impl ElementData {
    fn new(tag: &str, serial: u64) -> Self {
        Self {
            tag: tag.to_string(),
            classes: ClassList::new(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            serial,
            destroyed: false,
        }
    }
}

struct DocumentInner {
    tree: Tree<ElementData>,
    next_serial: u64,
    next_listener: u64,
    listeners: HashMap<ElementId, Vec<(ListenerId, DestroyListener)>>,
}

/// Shared element tree.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Document")
            .field("elements", &inner.tree.nodes().count())
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl Document {
    /// Create a document holding a single `#root` element.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(DocumentInner {
                tree: Tree::new(ElementData::new("#root", 0)),
                next_serial: 1,
                next_listener: 1,
                listeners: HashMap::new(),
            })),
        }
    }

    /// The root element. It has no parent and cannot be removed.
    pub fn root(&self) -> ElementId {
        ElementId(self.inner.borrow().tree.root().id())
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> ElementId {
        let mut inner = self.inner.borrow_mut();
        let serial = inner.next_serial;
        inner.next_serial += 1;
        ElementId(inner.tree.orphan(ElementData::new(tag, serial)).id())
    }

    /// Create an element and append it to `parent`.
    pub fn element(&self, parent: ElementId, tag: &str) -> Result<ElementId> {
        let id = self.create_element(tag);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append_child(&self, parent: ElementId, child: ElementId) -> Result<()> {
        self.ensure_live(parent)?;
        self.ensure_live(child)?;
        if child == self.root() {
            return Err(AnimateError::InvalidTree("the root cannot be moved".into()));
        }
        if parent == child || self.ancestors(parent).contains(&child) {
            return Err(AnimateError::InvalidTree(format!(
                "{child:?} is an ancestor of {parent:?}"
            )));
        }

        let mut inner = self.inner.borrow_mut();
        if let Some(mut node) = inner.tree.get_mut(child.0) {
            node.detach();
        }
        let mut parent_node = inner
            .tree
            .get_mut(parent.0)
            .ok_or(AnimateError::UnknownElement(parent))?;
        parent_node.append_id(child.0);
        Ok(())
    }

    /// Move `child` under `new_parent` (a structural "move").
    pub fn move_to(&self, child: ElementId, new_parent: ElementId) -> Result<()> {
        self.append_child(new_parent, child)
    }

    /// Remove an element and its subtree, firing destroy listeners for every
    /// removed element (the element itself first, then descendants in tree order).
    pub fn remove(&self, id: ElementId) -> Result<()> {
        self.ensure_live(id)?;
        if id == self.root() {
            return Err(AnimateError::InvalidTree("the root cannot be removed".into()));
        }

        let mut fired: Vec<(ElementId, DestroyListener)> = Vec::new();
        {
            let mut inner = self.inner.borrow_mut();
            let removed: Vec<ElementId> = match inner.tree.get(id.0) {
                Some(node) => node.descendants().map(|n| ElementId(n.id())).collect(),
                None => return Err(AnimateError::UnknownElement(id)),
            };
            for element in &removed {
                if let Some(mut node) = inner.tree.get_mut(element.0) {
                    node.value().destroyed = true;
                }
                if let Some(listeners) = inner.listeners.remove(element) {
                    fired.extend(listeners.into_iter().map(|(_, l)| (*element, l)));
                }
            }
            if let Some(mut node) = inner.tree.get_mut(id.0) {
                node.detach();
            }
        }

        for (element, listener) in fired {
            listener(element);
        }
        Ok(())
    }

    /// Register a destroy listener for `id`.
    pub fn on_destroy(&self, id: ElementId, listener: DestroyListener) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let listener_id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner
            .listeners
            .entry(id)
            .or_default()
            .push((listener_id, listener));
        listener_id
    }

    /// Unregister a destroy listener. Unknown ids are ignored.
    pub fn off_destroy(&self, id: ElementId, listener: ListenerId) {
        let mut inner = self.inner.borrow_mut();
        if let Some(list) = inner.listeners.get_mut(&id) {
            list.retain(|(lid, _)| *lid != listener);
            if list.is_empty() {
                inner.listeners.remove(&id);
            }
        }
    }

    /// Number of destroy listeners currently registered for `id`.
    pub fn listener_count(&self, id: ElementId) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(&id)
            .map_or(0, |list| list.len())
    }

    /// Direct parent, if the element is attached to one.
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        let inner = self.inner.borrow();
        inner
            .tree
            .get(id.0)
            .and_then(|node| node.parent())
            .map(|p| ElementId(p.id()))
    }

    /// All ancestors, nearest first.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let inner = self.inner.borrow();
        match inner.tree.get(id.0) {
            Some(node) => node.ancestors().map(|n| ElementId(n.id())).collect(),
            None => Vec::new(),
        }
    }

    /// All descendants in tree order, excluding `id` itself.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let inner = self.inner.borrow();
        match inner.tree.get(id.0) {
            Some(node) => node
                .descendants()
                .skip(1)
                .map(|n| ElementId(n.id()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Whether the element is reachable from the root.
    pub fn is_attached(&self, id: ElementId) -> bool {
        let root = self.root();
        id == root || self.ancestors(id).last() == Some(&root)
    }

    /// Whether the element was removed with [`Document::remove`].
    pub fn is_destroyed(&self, id: ElementId) -> bool {
        self.with_data(id, |data| data.destroyed).unwrap_or(true)
    }

    /// Tag name of the element.
    pub fn tag(&self, id: ElementId) -> Option<String> {
        self.with_data(id, |data| data.tag.clone())
    }

    /// Stable serial number of the element.
    pub fn serial(&self, id: ElementId) -> Option<u64> {
        self.with_data(id, |data| data.serial)
    }

    /// Read an attribute. `class` is served from the class list.
    pub fn attr(&self, id: ElementId, name: &str) -> Option<String> {
        self.with_data(id, |data| {
            if name == "class" {
                Some(data.classes.to_string())
            } else {
                data.attributes.get(name).cloned()
            }
        })
        .flatten()
    }

    /// Write an attribute. `class` replaces the class list.
    pub fn set_attr(&self, id: ElementId, name: &str, value: &str) -> Result<()> {
        self.ensure_live(id)?;
        self.with_data_mut(id, |data| {
            if name == "class" {
                data.classes = ClassList::parse(value);
            } else {
                data.attributes.insert(name.to_string(), value.to_string());
            }
        });
        Ok(())
    }

    /// Remove an attribute.
    pub fn remove_attr(&self, id: ElementId, name: &str) {
        self.with_data_mut(id, |data| {
            data.attributes.remove(name);
        });
    }

    /// Current class list.
    pub fn classes(&self, id: ElementId) -> ClassList {
        self.with_data(id, |data| data.classes.clone())
            .unwrap_or_default()
    }

    /// Check for a single class.
    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.with_data(id, |data| data.classes.contains(class))
            .unwrap_or(false)
    }

    /// Add every class of the space separated `classes`. Unknown ids are ignored.
    pub fn add_class(&self, id: ElementId, classes: &str) {
        self.with_data_mut(id, |data| data.classes.extend_str(classes));
    }

    /// Remove every class of the space separated `classes`. Unknown ids are ignored.
    pub fn remove_class(&self, id: ElementId, classes: &str) {
        self.with_data_mut(id, |data| {
            for class in classes.split_whitespace() {
                data.classes.remove(class);
            }
        });
    }

    /// Set an inline style property.
    pub fn set_style(&self, id: ElementId, property: &str, value: &str) {
        self.with_data_mut(id, |data| {
            data.styles.insert(property.to_string(), value.to_string());
        });
    }

    /// Read an inline style property.
    pub fn style(&self, id: ElementId, property: &str) -> Option<String> {
        self.with_data(id, |data| data.styles.get(property).cloned())
            .flatten()
    }

    fn ensure_live(&self, id: ElementId) -> Result<()> {
        match self.with_data(id, |data| data.destroyed) {
            None => Err(AnimateError::UnknownElement(id)),
            Some(true) => Err(AnimateError::Destroyed(id)),
            Some(false) => Ok(()),
        }
    }

    fn with_data<R>(&self, id: ElementId, f: impl FnOnce(&ElementData) -> R) -> Option<R> {
        let inner = self.inner.borrow();
        inner.tree.get(id.0).map(|node| f(node.value()))
    }

    fn with_data_mut(&self, id: ElementId, f: impl FnOnce(&mut ElementData)) {
        let mut inner = self.inner.borrow_mut();
        if let Some(mut node) = inner.tree.get_mut(id.0) {
            f(node.value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_build_tree_and_parents() {
        let doc = Document::new();
        let list = doc.element(doc.root(), "ul").unwrap();
        let item = doc.element(list, "li").unwrap();

        assert_eq!(doc.parent(item), Some(list));
        assert_eq!(doc.parent(list), Some(doc.root()));
        assert_eq!(doc.parent(doc.root()), None);
        assert_eq!(doc.ancestors(item), vec![list, doc.root()]);
        assert_eq!(doc.descendants(list), vec![item]);
        assert!(doc.is_attached(item));
        assert_eq!(doc.tag(item).as_deref(), Some("li"));
    }

    #[test]
    fn test_detached_element() {
        let doc = Document::new();
        let orphan = doc.create_element("div");
        assert_eq!(doc.parent(orphan), None);
        assert!(!doc.is_attached(orphan));
        assert!(!doc.is_destroyed(orphan));
    }

    #[test]
    fn test_move_rejects_cycles() {
        let doc = Document::new();
        let a = doc.element(doc.root(), "div").unwrap();
        let b = doc.element(a, "div").unwrap();

        assert!(matches!(
            doc.append_child(b, a),
            Err(AnimateError::InvalidTree(_))
        ));
        assert!(doc.append_child(a, a).is_err());

        let c = doc.element(doc.root(), "section").unwrap();
        doc.move_to(b, c).unwrap();
        assert_eq!(doc.parent(b), Some(c));
        assert!(doc.descendants(a).is_empty());
    }

    #[test]
    fn test_classes_and_attributes() {
        let doc = Document::new();
        let el = doc.element(doc.root(), "div").unwrap();
        doc.set_attr(el, "class", "red  green").unwrap();
        doc.add_class(el, "blue red");
        doc.remove_class(el, "green");
        assert_eq!(doc.attr(el, "class").as_deref(), Some("red blue"));
        assert!(doc.has_class(el, "blue"));

        doc.set_attr(el, "ng-animate-ref", "hero").unwrap();
        assert_eq!(doc.attr(el, "ng-animate-ref").as_deref(), Some("hero"));
        doc.remove_attr(el, "ng-animate-ref");
        assert_eq!(doc.attr(el, "ng-animate-ref"), None);

        doc.set_style(el, "opacity", "0");
        assert_eq!(doc.style(el, "opacity").as_deref(), Some("0"));
    }

    #[test]
    fn test_remove_fires_listeners_for_subtree() {
        let doc = Document::new();
        let parent = doc.element(doc.root(), "div").unwrap();
        let child = doc.element(parent, "span").unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        for id in [parent, child] {
            let seen = seen.clone();
            doc.on_destroy(id, Rc::new(move |el| seen.borrow_mut().push(el)));
        }

        doc.remove(parent).unwrap();
        assert_eq!(*seen.borrow(), vec![parent, child]);
        assert!(doc.is_destroyed(child));
        assert!(!doc.is_attached(parent));
        assert_eq!(doc.listener_count(parent), 0);

        // Removing twice is an error
        assert!(matches!(doc.remove(parent), Err(AnimateError::Destroyed(_))));
    }

    #[test]
    fn test_off_destroy() {
        let doc = Document::new();
        let el = doc.element(doc.root(), "div").unwrap();
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let id = doc.on_destroy(el, Rc::new(move |_| *h.borrow_mut() += 1));
        doc.off_destroy(el, id);
        doc.remove(el).unwrap();
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn test_listener_may_reenter_document() {
        let doc = Document::new();
        let el = doc.element(doc.root(), "div").unwrap();
        let handle = doc.clone();
        doc.on_destroy(
            el,
            Rc::new(move |id| {
                handle.add_class(id, "gone");
                let _ = handle.element(handle.root(), "p");
            }),
        );
        doc.remove(el).unwrap();
        assert!(doc.has_class(el, "gone"));
        assert_eq!(doc.descendants(doc.root()).len(), 1);
    }

    #[test]
    fn test_serials_are_unique() {
        let doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        assert_ne!(doc.serial(a), doc.serial(b));
        assert_eq!(doc.serial(doc.root()), Some(0));
    }
}
