//! Scripted engine runs.
//!
//! A scenario is a JSON document describing an element tree, the drivers to
//! register and a sequence of steps (animate calls, digests, frames, runner
//! control). [`run_scenario`] plays it against a fresh engine and records what
//! the drivers were asked to start and how every runner resolved.
//!
//! # Usage
//!
//! ```ignore
//! let scenario = Scenario::from_json(r#"{
//!     "elements": [{ "id": "list", "tag": "ul" }, { "id": "item", "parent": "list" }],
//!     "drivers": [{ "name": "css", "behavior": "instant" }],
//!     "steps": [
//!         { "animate": { "label": "a", "element": "item", "event": "enter" } },
//!         "digest"
//!     ]
//! }"#)?;
//! let trace = run_scenario(&scenario, &AnimateConfig::default())?;
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::rc::Rc;

use rune_config::AnimateConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::AnimateCache;
use crate::digest::DigestCycle;
use crate::document::{Document, ElementId};
use crate::driver::{AnimationDetails, StartHandle};
use crate::engine::AnimationEngine;
use crate::error::{AnimateError, Result};
use crate::event::AnimationEvent;
use crate::frames::RafScheduler;
use crate::options::AnimateOptions;
use crate::runner::{Runner, RunnerState};

/// Frames ticked by a `flush` step before giving up.
const MAX_FLUSH_FRAMES: usize = 256;

/// Element of the initial tree. Elements without a parent hang off the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioElement {
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub classes: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

fn default_tag() -> String {
    "div".to_string()
}

/// How a scripted driver treats the animations it claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverBehavior {
    /// Finish successfully as soon as started.
    #[default]
    Instant,
    /// Stay running until the caller ends or cancels.
    Hold,
    /// Finish unsuccessfully as soon as started.
    Fail,
    /// Never claim anything.
    Decline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDriver {
    pub name: String,
    #[serde(default)]
    pub behavior: DriverBehavior,
    /// Events this driver claims; empty claims every event.
    #[serde(default)]
    pub events: Vec<AnimationEvent>,
    /// Record every started animation as zero-duration in the cache.
    #[serde(default)]
    pub zero_duration: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimateCall {
    /// Name the runner is reported under.
    pub label: String,
    pub element: String,
    pub event: AnimationEvent,
    #[serde(default)]
    pub options: AnimateOptions,
}

/// One scripted action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Animate(AnimateCall),
    /// Remove an element (and its subtree) from the document.
    Remove(String),
    /// Run the post-update hook.
    Digest,
    /// Advance this many frames.
    Tick(usize),
    /// Tick until no level is waiting.
    Flush,
    End(String),
    Cancel(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub elements: Vec<ScenarioElement>,
    #[serde(default)]
    pub drivers: Vec<ScenarioDriver>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnimateError::Scenario(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }
}

/// A driver start observed during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// Frames ticked before the start; 0 is the digest itself.
    pub frame: u64,
    pub driver: String,
    pub event: String,
    pub elements: Vec<String>,
    pub anchored: bool,
}

/// Result of [`run_scenario`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    pub dispatched: Vec<DispatchRecord>,
    pub runners: BTreeMap<String, RunnerState>,
    /// Final class attribute of every scenario element.
    pub classes: BTreeMap<String, String>,
}

struct Names {
    by_name: HashMap<String, ElementId>,
    by_id: HashMap<ElementId, String>,
}

impl Names {
    fn element(&self, name: &str) -> Result<ElementId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| AnimateError::Scenario(format!("unknown element `{name}`")))
    }

    fn name(&self, id: ElementId) -> String {
        self.by_id
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("{id:?}"))
    }
}

fn build_tree(doc: &Document, elements: &[ScenarioElement]) -> Result<Names> {
    let mut names = Names {
        by_name: HashMap::new(),
        by_id: HashMap::new(),
    };
    for spec in elements {
        if names.by_name.contains_key(&spec.id) {
            return Err(AnimateError::Scenario(format!("duplicate element `{}`", spec.id)));
        }
        let parent = match &spec.parent {
            Some(parent) => names.element(parent)?,
            None => doc.root(),
        };
        let id = doc.element(parent, &spec.tag)?;
        doc.add_class(id, &spec.classes);
        for (name, value) in &spec.attributes {
            doc.set_attr(id, name, value)?;
        }
        names.by_name.insert(spec.id.clone(), id);
        names.by_id.insert(id, spec.id.clone());
    }
    Ok(names)
}

/// Play `scenario` on a fresh document and engine.
pub fn run_scenario(scenario: &Scenario, config: &AnimateConfig) -> Result<Trace> {
    let doc = Document::new();
    let names = Rc::new(build_tree(&doc, &scenario.elements)?);
    let digest = Rc::new(DigestCycle::new());
    let frames = Rc::new(RafScheduler::new());
    let cache = Rc::new(AnimateCache::new());
    let engine = AnimationEngine::new(doc.clone(), digest.clone(), frames.clone())
        .with_cache(cache.clone())
        .with_config(config.clone());

    let dispatched: Rc<RefCell<Vec<DispatchRecord>>> = Rc::new(RefCell::new(Vec::new()));
    for driver in &scenario.drivers {
        let driver = driver.clone();
        let (names, frames, cache) = (names.clone(), frames.clone(), cache.clone());
        let dispatched = dispatched.clone();
        engine.register_driver(driver.name.clone(), move |details: &AnimationDetails| {
            if driver.behavior == DriverBehavior::Decline {
                return None;
            }
            if !driver.events.is_empty() && !driver.events.contains(details.event()) {
                return None;
            }

            dispatched.borrow_mut().push(DispatchRecord {
                frame: frames.frames(),
                driver: driver.name.clone(),
                event: details.event().to_string(),
                elements: details.elements().into_iter().map(|e| names.name(e)).collect(),
                anchored: details.is_anchored(),
            });
            if driver.zero_duration {
                if let Some(key) = details.cache_key() {
                    cache.put(key, serde_json::json!({ "duration": 0 }), false);
                }
            }

            let behavior = driver.behavior;
            Some(StartHandle::new(move || match behavior {
                DriverBehavior::Fail => Runner::resolved(false),
                DriverBehavior::Hold => Runner::new(),
                _ => Runner::resolved(true),
            }))
        });
    }

    let mut runners: BTreeMap<String, Runner> = BTreeMap::new();
    let labeled = |runners: &BTreeMap<String, Runner>, label: &str| {
        runners
            .get(label)
            .cloned()
            .ok_or_else(|| AnimateError::Scenario(format!("unknown runner `{label}`")))
    };

    for step in &scenario.steps {
        debug!(?step, "scenario step");
        match step {
            Step::Animate(call) => {
                let element = names.element(&call.element)?;
                let runner = engine.animate(element, call.event.clone(), call.options.clone());
                runners.insert(call.label.clone(), runner);
            }
            Step::Remove(name) => doc.remove(names.element(name)?)?,
            Step::Digest => {
                digest.digest();
            }
            Step::Tick(count) => {
                for _ in 0..*count {
                    frames.tick();
                }
            }
            Step::Flush => {
                frames.run_until_idle(MAX_FLUSH_FRAMES);
            }
            Step::End(label) => labeled(&runners, label)?.end(),
            Step::Cancel(label) => labeled(&runners, label)?.cancel(),
        }
    }

    let classes = names
        .by_name
        .iter()
        .map(|(name, id)| (name.clone(), doc.classes(*id).to_string()))
        .collect();
    let trace = Trace {
        dispatched: dispatched.borrow().clone(),
        runners: runners
            .into_iter()
            .map(|(label, runner)| (label, runner.state()))
            .collect(),
        classes,
    };
    Ok(trace)
}
