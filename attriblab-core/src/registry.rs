//! Signal definition registry.
//!
//! A static, read-only lookup supplying each known signal's display name,
//! category, and scope restrictions. The enumerator consults it to decide
//! whether a structurally-enabled signal may actually be enumerated under a
//! given scope.

use std::collections::HashMap;

/// Static metadata for one known signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDef {
    /// Human-readable name.
    pub display_name: String,
    /// Parent category for nested signals (e.g. `fundamental`), if any.
    pub category: Option<String>,
    /// A signal marked exit-disabled can never be enumerated with scope Exit,
    /// even if structurally present and enabled under the exit section.
    pub exit_disabled: bool,
}

impl SignalDef {
    pub fn simple(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            category: None,
            exit_disabled: false,
        }
    }

    pub fn entry_only(display_name: &str) -> Self {
        Self {
            exit_disabled: true,
            ..Self::simple(display_name)
        }
    }

    pub fn in_category(display_name: &str, category: &str) -> Self {
        Self {
            category: Some(category.to_string()),
            ..Self::simple(display_name)
        }
    }
}

/// Name-keyed signal definition lookup.
///
/// Nested signals are keyed by `<category>.<name>` (e.g. `fundamental.per`),
/// matching the suffix of their enumerated ids.
#[derive(Debug, Clone, Default)]
pub struct SignalRegistry {
    defs: HashMap<String, SignalDef>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, def: SignalDef) {
        self.defs.insert(name.to_string(), def);
    }

    pub fn get(&self, name: &str) -> Option<&SignalDef> {
        self.defs.get(name)
    }

    /// Whether `name` may be enumerated under the exit scope.
    ///
    /// Unknown signals are unrestricted: the registry narrows, never gates,
    /// so a configuration can carry signals the registry has not heard of.
    pub fn allows_exit(&self, name: &str) -> bool {
        self.defs.get(name).map_or(true, |def| !def.exit_disabled)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// Built-in registry covering the standard signal set.
///
/// Simple signals plus the composite `fundamental` category. Market-regime
/// gates (`trend`, `volatility`) are entry-only: forcing an exit on a regime
/// change is a different strategy, not a trigger variant.
pub fn default_registry() -> SignalRegistry {
    let mut registry = SignalRegistry::new();

    registry.register("volume", SignalDef::simple("Volume surge"));
    registry.register("momentum", SignalDef::simple("Price momentum"));
    registry.register("rsi", SignalDef::simple("RSI band"));
    registry.register("trend", SignalDef::entry_only("Trend regime"));
    registry.register("volatility", SignalDef::entry_only("Volatility regime"));

    registry.register("fundamental.per", SignalDef::in_category("P/E ratio", "fundamental"));
    registry.register("fundamental.pbr", SignalDef::in_category("P/B ratio", "fundamental"));
    registry.register("fundamental.roe", SignalDef::in_category("Return on equity", "fundamental"));
    registry.register(
        "fundamental.dividend",
        SignalDef::in_category("Dividend yield", "fundamental"),
    );

    registry
}
