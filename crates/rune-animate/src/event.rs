//! Animation event kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AnimateError;

/// The kind of animation being requested.
///
/// Structural events (`enter`, `move`, `leave`) accompany DOM insertion, removal
/// and reordering; the others only change classes or run custom animations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AnimationEvent {
    /// Element inserted into the document.
    Enter,
    /// Element moved to a new position.
    Move,
    /// Element about to be removed.
    Leave,
    /// Classes added.
    AddClass,
    /// Classes removed.
    RemoveClass,
    /// Classes added and removed together.
    SetClass,
    /// Inline style animation.
    Animate,
    /// Any other, driver-defined event.
    Custom(String),
}

impl AnimationEvent {
    /// Whether this event is one of `enter`, `move`, `leave`.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Enter | Self::Move | Self::Leave)
    }

    /// Whether this event brings an element in (`enter` or `move`), which makes
    /// its anchors the "to" side of an anchored pair.
    pub fn is_incoming(&self) -> bool {
        matches!(self, Self::Enter | Self::Move)
    }

    /// Canonical event name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Enter => "enter",
            Self::Move => "move",
            Self::Leave => "leave",
            Self::AddClass => "addClass",
            Self::RemoveClass => "removeClass",
            Self::SetClass => "setClass",
            Self::Animate => "animate",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for AnimationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimationEvent {
    type Err = AnimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(AnimateError::InvalidEvent(s.to_string()));
        }
        Ok(match name {
            "enter" => Self::Enter,
            "move" => Self::Move,
            "leave" => Self::Leave,
            "addClass" => Self::AddClass,
            "removeClass" => Self::RemoveClass,
            "setClass" => Self::SetClass,
            "animate" => Self::Animate,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl TryFrom<String> for AnimationEvent {
    type Error = AnimateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AnimationEvent> for String {
    fn from(value: AnimationEvent) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_classification() {
        assert!(AnimationEvent::Enter.is_structural());
        assert!(AnimationEvent::Move.is_structural());
        assert!(AnimationEvent::Leave.is_structural());
        assert!(!AnimationEvent::AddClass.is_structural());
        assert!(!AnimationEvent::Custom("shake".into()).is_structural());

        assert!(AnimationEvent::Move.is_incoming());
        assert!(!AnimationEvent::Leave.is_incoming());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("enter".parse::<AnimationEvent>().unwrap(), AnimationEvent::Enter);
        assert_eq!(
            "removeClass".parse::<AnimationEvent>().unwrap(),
            AnimationEvent::RemoveClass
        );
        assert_eq!(
            "shake".parse::<AnimationEvent>().unwrap(),
            AnimationEvent::Custom("shake".into())
        );
        assert!("".parse::<AnimationEvent>().is_err());
        assert!("two words".parse::<AnimationEvent>().is_err());
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&AnimationEvent::SetClass).unwrap();
        assert_eq!(json, "\"setClass\"");
        let parsed: AnimationEvent = serde_json::from_str("\"leave\"").unwrap();
        assert_eq!(parsed, AnimationEvent::Leave);
        assert!(serde_json::from_str::<AnimationEvent>("\"\"").is_err());
    }
}
