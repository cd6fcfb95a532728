//! Flow tweaks and the style profile that feeds them.
//!
//! A tweak map is `component id -> { setting: value }`. The keys belong to the remote flow,
//! so the map is forwarded as-is and never validated here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::StyleConfig;

/// Opaque override map forwarded under `tweaks` in the run request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tweaks(Map<String, Value>);

impl Tweaks {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Settings object for a component, if present and an object.
    pub fn component(&self, component: &str) -> Option<&Map<String, Value>> {
        self.0.get(component).and_then(Value::as_object)
    }

    pub fn insert_component(&mut self, component: impl Into<String>, settings: Map<String, Value>) {
        self.0.insert(component.into(), Value::Object(settings));
    }

    /// Set one setting on a component. A missing or non-object entry becomes an object.
    pub fn set(&mut self, component: &str, setting: &str, value: impl Into<Value>) {
        let entry = self
            .0
            .entry(component.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(settings) = entry {
            settings.insert(setting.to_string(), value.into());
        }
    }
}

impl From<Map<String, Value>> for Tweaks {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Sidebar inputs describing the user, injected into the flow's text-input components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleProfile {
    pub body_shape: String,
    pub skin_tone: String,
}

impl StyleProfile {
    pub fn new(body_shape: impl Into<String>, skin_tone: impl Into<String>) -> Self {
        Self {
            body_shape: body_shape.into(),
            skin_tone: skin_tone.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body_shape.trim().is_empty() && self.skin_tone.trim().is_empty()
    }

    /// Build the tweaks for one request: a copy of `base` with each non-blank field written
    /// as typed to `input_value` of its component. `base` is left untouched.
    pub fn apply(&self, base: &Tweaks, style: &StyleConfig) -> Tweaks {
        let mut tweaks = base.clone();
        let fields = [
            (&style.body_shape_component, &self.body_shape),
            (&style.skin_tone_component, &self.skin_tone),
        ];
        for (component, value) in fields {
            if !value.trim().is_empty() {
                tweaks.set(component, "input_value", value.as_str());
            }
        }
        tweaks
    }
}
