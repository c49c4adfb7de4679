//! Signal target enumeration.
//!
//! Walks the entry and exit sections of a configuration payload and produces
//! the complete, deterministic set of live [`SignalTarget`]s — the unit every
//! downstream phase (LOO, Top-N, Shapley) operates on.
//!
//! Enablement rules:
//! - a top-level signal is live iff its own `enabled` flag is true;
//! - a nested child is live iff both its parent's flag and its own flag are
//!   true — a disabled parent inerts all children;
//! - a definition marked `exit_disabled` is never enumerated under scope
//!   Exit, regardless of structure.
//!
//! Pure function of the payload and registry; never fails for any payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::{parse_section, SignalNode, ENTRY_SECTION, EXIT_SECTION};
use crate::registry::{SignalDef, SignalRegistry};

/// Which side of the strategy a signal attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Entry,
    Exit,
}

impl Scope {
    /// Id prefix: `entry` / `exit`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
        }
    }

    /// Payload section holding this scope's signal entries.
    pub fn section(&self) -> &'static str {
        match self {
            Self::Entry => ENTRY_SECTION,
            Self::Exit => EXIT_SECTION,
        }
    }
}

/// One addressable, independently togglable signal.
///
/// Identity is `signal_id` (e.g. `entry.volume`, `exit.fundamental.per`);
/// immutable once enumerated for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalTarget {
    /// `<scope>.<name>` or `<scope>.<category>.<name>`.
    pub signal_id: String,
    pub scope: Scope,
    /// Dotted path to the signal's mapping inside the payload
    /// (e.g. `exit_signals.fundamental.per`).
    pub param_key: String,
    /// Human-readable name from the registry, or the raw key for signals the
    /// registry does not know.
    pub signal_name: String,
    /// Registry metadata, when the signal is known.
    pub definition: Option<SignalDef>,
}

/// Enumerate every live signal target in the payload, entry scope first.
pub fn enumerate_targets(payload: &Value, registry: &SignalRegistry) -> Vec<SignalTarget> {
    let mut targets = Vec::new();
    for scope in [Scope::Entry, Scope::Exit] {
        enumerate_scope(payload, registry, scope, &mut targets);
    }
    targets
}

fn enumerate_scope(
    payload: &Value,
    registry: &SignalRegistry,
    scope: Scope,
    out: &mut Vec<SignalTarget>,
) {
    for (name, node) in parse_section(payload, scope.section()) {
        match node {
            SignalNode::Simple { enabled } => {
                if enabled {
                    push_target(registry, scope, &name, out);
                }
            }
            SignalNode::Composite { enabled, children } => {
                if !enabled {
                    continue;
                }
                for (child_name, child) in children {
                    if child.enabled() {
                        let key = format!("{name}.{child_name}");
                        push_target(registry, scope, &key, out);
                    }
                }
            }
        }
    }
}

fn push_target(registry: &SignalRegistry, scope: Scope, key: &str, out: &mut Vec<SignalTarget>) {
    if scope == Scope::Exit && !registry.allows_exit(key) {
        return;
    }
    let definition = registry.get(key).cloned();
    let signal_name = definition
        .as_ref()
        .map(|def| def.display_name.clone())
        .unwrap_or_else(|| key.to_string());

    out.push(SignalTarget {
        signal_id: format!("{}.{key}", scope.prefix()),
        scope,
        param_key: format!("{}.{key}", scope.section()),
        signal_name,
        definition,
    });
}
