//! Configuration payload model.
//!
//! A strategy configuration arrives as a dynamic nested mapping with three
//! top-level sections: shared settings, entry-filter signals, exit-trigger
//! signals. Each signal entry is either a simple leaf `{enabled, ...params}`
//! or a composite `{enabled, <child>: {enabled, ...}}`.
//!
//! The raw mapping is parsed once per walk into the tagged [`SignalNode`]
//! variant so the algorithm phases never re-inspect raw JSON. Parsing is
//! lenient throughout: malformed entries degrade to "absent/disabled" and
//! the path writer normalizes wrong-typed levels instead of failing — this
//! input is internally generated configuration, not untrusted data.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Top-level section holding entry-filter signal entries.
pub const ENTRY_SECTION: &str = "entry_signals";
/// Top-level section holding exit-trigger signal entries.
pub const EXIT_SECTION: &str = "exit_signals";

/// Parsed signal entry.
///
/// `Composite` children are keyed in a `BTreeMap` so iteration order (and
/// therefore enumeration order) is deterministic for identical input.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalNode {
    Simple {
        enabled: bool,
    },
    Composite {
        enabled: bool,
        children: BTreeMap<String, SignalNode>,
    },
}

impl SignalNode {
    pub fn enabled(&self) -> bool {
        match self {
            Self::Simple { enabled } => *enabled,
            Self::Composite { enabled, .. } => *enabled,
        }
    }

    /// Parse a raw signal entry. Anything that is not an object with an
    /// `enabled: true|false` flag is treated as disabled.
    pub fn parse(raw: &Value) -> Self {
        let Some(map) = raw.as_object() else {
            return Self::Simple { enabled: false };
        };
        let enabled = map
            .get("enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let children: BTreeMap<String, SignalNode> = map
            .iter()
            .filter(|(key, value)| key.as_str() != "enabled" && value.is_object())
            .filter(|(_, value)| value.get("enabled").is_some())
            .map(|(key, value)| (key.clone(), SignalNode::parse(value)))
            .collect();

        if children.is_empty() {
            Self::Simple { enabled }
        } else {
            Self::Composite { enabled, children }
        }
    }
}

/// Parse an entire section into name → node, in deterministic key order.
///
/// A missing or non-object section parses to an empty map.
pub fn parse_section(payload: &Value, section: &str) -> BTreeMap<String, SignalNode> {
    payload
        .get(section)
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(name, raw)| (name.clone(), SignalNode::parse(raw)))
                .collect()
        })
        .unwrap_or_default()
}

/// Force `enabled: false` at `<param_key>.enabled` inside the payload.
///
/// `param_key` is a dotted path (e.g. `exit_signals.fundamental.per`).
/// Missing intermediate levels are created as objects; any non-object value
/// found along the way is overwritten with an object. Never fails.
pub fn force_signal_disabled(payload: &mut Value, param_key: &str) {
    if !payload.is_object() {
        *payload = Value::Object(Map::new());
    }
    let mut cursor = payload;
    for segment in param_key.split('.') {
        let map = cursor
            .as_object_mut()
            .expect("cursor is normalized to an object");
        let entry = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        cursor = entry;
    }
    cursor
        .as_object_mut()
        .expect("leaf is normalized to an object")
        .insert("enabled".to_string(), Value::Bool(false));
}
