//! Hierarchical animation scheduling for DOM-style element trees.
//!
//! Animation requests issued during one update cycle are collected, anchored
//! leave/enter pairs are merged, and the resulting units are started one
//! ancestry level per animation frame so parents always start before their
//! children. Every request hands back a [`Runner`] immediately; the runner
//! resolves once the driver animation (if any) finishes and can be ended or
//! cancelled at any point.
//!
//! The engine talks to its surroundings through a few small seams:
//! - [`PostDigest`]: "after this update cycle" hook ([`DigestCycle`])
//! - [`FrameScheduler`]: level-per-frame batching ([`RafScheduler`])
//! - [`AnimationCache`]: zero-duration memo ([`AnimateCache`])
//! - [`AnimationDriver`]: the code that actually animates

pub mod cache;
pub mod classes;
pub mod digest;
pub mod document;
pub mod driver;
pub mod engine;
pub mod error;
pub mod event;
pub mod frames;
mod grouping;
pub mod options;
mod request;
pub mod runner;
pub mod scenario;
pub mod sorter;

pub use cache::{AnimateCache, AnimationCache};
pub use classes::ClassList;
pub use digest::{DigestCycle, PostDigest};
pub use document::{Document, ElementId, ListenerId};
pub use driver::{
    AnchorPair, AnimationDetails, AnimationDriver, DriverRegistry, RequestDetails, StartHandle,
    anchor_sequence,
};
pub use engine::AnimationEngine;
pub use error::{AnimateError, Result};
pub use event::AnimationEvent;
pub use frames::{FrameScheduler, FrameTask, Level, RafScheduler};
pub use options::{AnimateOptions, DomOperation, StyleMap};
pub use runner::{ChainStep, DoneCallback, FnHost, Runner, RunnerHost, RunnerState};
pub use scenario::{Scenario, Trace, run_scenario};

pub use rune_config::AnimateConfig;
