//! Anchor grouping.
//!
//! Structural requests whose elements carry (or contain) the anchor attribute
//! are matched by attribute value: a `leave` request provides the "from" side,
//! an `enter` or `move` request the "to" side. A matched pair sharing at least
//! one non-reserved marker class becomes a single anchored unit; everything
//! else passes through as single units.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::classes::ClassList;
use crate::document::{Document, ElementId};
use crate::driver::{AnchorPair, AnimationDetails};
use crate::request::AnimationRequest;

/// What the sorter and the frame scheduler move around.
#[derive(Debug, Clone)]
pub(crate) enum AnimationUnit {
    Single(Rc<AnimationRequest>),
    Anchored {
        from: Rc<AnimationRequest>,
        to: Rc<AnimationRequest>,
        classes: ClassList,
        anchors: Vec<AnchorPair>,
    },
}

impl AnimationUnit {
    /// The request that stands for the unit in ordering, caching and liveness.
    pub fn primary(&self) -> &Rc<AnimationRequest> {
        match self {
            Self::Single(request) => request,
            Self::Anchored { from, .. } => from,
        }
    }

    pub fn requests(&self) -> Vec<&Rc<AnimationRequest>> {
        match self {
            Self::Single(request) => vec![request],
            Self::Anchored { from, to, .. } => vec![from, to],
        }
    }

    /// Elements whose runners follow the driver once it starts.
    pub fn hosted_elements(&self) -> Vec<ElementId> {
        match self {
            Self::Single(request) => vec![request.element],
            Self::Anchored {
                from, to, anchors, ..
            } => {
                let mut elements = vec![from.element, to.element];
                for pair in anchors {
                    elements.push(pair.out);
                    elements.push(pair.in_);
                }
                elements
            }
        }
    }

    pub fn details(&self) -> AnimationDetails {
        match self {
            Self::Single(request) => AnimationDetails::Single(request.details()),
            Self::Anchored {
                from,
                to,
                classes,
                anchors,
            } => AnimationDetails::Anchored {
                from: from.details(),
                to: to.details(),
                classes: classes.clone(),
                anchors: anchors.clone(),
            },
        }
    }

    /// Every request of the unit is still current and attached.
    pub fn is_live(&self) -> bool {
        self.requests().into_iter().all(|r| r.is_live())
    }

    pub fn apply_prepare_class(&self) {
        self.requests().into_iter().for_each(|r| r.apply_prepare_class());
    }

    pub fn drop_prepare_class(&self) {
        self.requests().into_iter().for_each(|r| r.drop_prepare_class());
    }

    pub fn before_start(&self) {
        self.requests().into_iter().for_each(|r| r.before_start());
    }

    pub fn close(&self, rejected: bool) {
        self.requests().into_iter().for_each(|r| r.close(rejected));
    }
}

/// Elements under `element` (or `element` itself) with a non-empty anchor key.
fn anchor_nodes(doc: &Document, element: ElementId, attribute: &str) -> Vec<(String, ElementId)> {
    let keyed = |id: ElementId| {
        doc.attr(id, attribute)
            .filter(|key| !key.is_empty())
            .map(|key| (key, id))
    };

    if doc.attr(element, attribute).is_some() {
        keyed(element).into_iter().collect()
    } else {
        doc.descendants(element).into_iter().filter_map(keyed).collect()
    }
}

#[derive(Default)]
struct AnchorSides {
    from: Option<(usize, ElementId)>,
    to: Option<(usize, ElementId)>,
}

/// Merge anchored leave/enter pairs. Every request is emitted exactly once,
/// either on its own or inside one anchored unit. Requests without anchors
/// come first in input order, followed by anchored requests in the order their
/// anchor keys were first seen, then any anchored request that lost its side
/// of every key to a later request.
pub(crate) fn group(
    requests: Vec<Rc<AnimationRequest>>,
    doc: &Document,
    anchor_attribute: &str,
    reserved_prefix: &str,
) -> Vec<AnimationUnit> {
    let mut units = Vec::with_capacity(requests.len());
    let mut key_order: Vec<String> = Vec::new();
    let mut lookup: HashMap<String, AnchorSides> = HashMap::new();
    let mut anchored: Vec<usize> = Vec::new();

    for (index, request) in requests.iter().enumerate() {
        let anchors = if request.structural() {
            anchor_nodes(doc, request.element, anchor_attribute)
        } else {
            Vec::new()
        };
        if anchors.is_empty() {
            units.push(AnimationUnit::Single(request.clone()));
            continue;
        }

        anchored.push(index);
        for (key, anchor) in anchors {
            let sides = lookup.entry(key.clone()).or_insert_with(|| {
                key_order.push(key);
                AnchorSides::default()
            });
            if request.event.is_incoming() {
                sides.to = Some((index, anchor));
            } else {
                sides.from = Some((index, anchor));
            }
        }
    }

    let mut emitted: HashSet<usize> = HashSet::new();
    // (from, to) request indices -> position in `units`
    let mut groups: HashMap<(usize, usize), usize> = HashMap::new();

    for key in key_order {
        let Some(sides) = lookup.remove(&key) else {
            continue;
        };
        let ((from_idx, out), (to_idx, in_)) = match (sides.from, sides.to) {
            (Some(from), Some(to)) => (from, to),
            (from, to) => {
                for (index, _) in from.into_iter().chain(to) {
                    if emitted.insert(index) {
                        units.push(AnimationUnit::Single(requests[index].clone()));
                    }
                }
                continue;
            }
        };

        if let Some(&position) = groups.get(&(from_idx, to_idx)) {
            if let Some(AnimationUnit::Anchored { anchors, .. }) = units.get_mut(position) {
                anchors.push(AnchorPair { out, in_ });
            }
            continue;
        }

        let (from, to) = (&requests[from_idx], &requests[to_idx]);
        let classes = from.classes.shared_with(&to.classes, reserved_prefix);
        let free = !emitted.contains(&from_idx) && !emitted.contains(&to_idx);
        if free && from_idx != to_idx && !classes.is_empty() {
            emitted.insert(from_idx);
            emitted.insert(to_idx);
            groups.insert((from_idx, to_idx), units.len());
            units.push(AnimationUnit::Anchored {
                from: from.clone(),
                to: to.clone(),
                classes,
                anchors: vec![AnchorPair { out, in_ }],
            });
        } else {
            for index in [from_idx, to_idx] {
                if emitted.insert(index) {
                    units.push(AnimationUnit::Single(requests[index].clone()));
                }
            }
        }
    }

    // A side overwritten by a later request under the same key.
    for index in anchored {
        if emitted.insert(index) {
            units.push(AnimationUnit::Single(requests[index].clone()));
        }
    }

    units
}
