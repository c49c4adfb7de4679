//! Configuration sources.
//!
//! The engine never loads strategy files itself; it asks a collaborator for
//! the baseline payload. Two implementations of one trait, chosen at
//! construction:
//! - [`FnConfigSource`]: an injected zero-argument loader.
//! - [`RunnerConfigSource`]: wraps a runner collaborator that builds the
//!   configuration for a named strategy with optional overrides.
//!
//! Either way the source hands back an owned `Value` — a deep copy, so
//! variant mutation during LOO/Shapley can never corrupt the source's own
//! stored state.

use anyhow::Result;
use serde_json::Value;

/// Produces the baseline configuration payload for a run.
pub trait ConfigSource {
    fn load(&self) -> Result<Value>;
}

/// Closure-backed source.
pub struct FnConfigSource<F>(F);

impl<F> FnConfigSource<F>
where
    F: Fn() -> Result<Value>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ConfigSource for FnConfigSource<F>
where
    F: Fn() -> Result<Value>,
{
    fn load(&self) -> Result<Value> {
        (self.0)()
    }
}

/// Collaborator that can assemble a configuration for a named strategy.
pub trait ConfigRunner {
    fn build_config(&self, strategy: &str, overrides: Option<&Value>) -> Result<Value>;
}

/// Source backed by a [`ConfigRunner`] plus a fixed strategy name and
/// optional overrides.
pub struct RunnerConfigSource<R: ConfigRunner> {
    runner: R,
    strategy: String,
    overrides: Option<Value>,
}

impl<R: ConfigRunner> RunnerConfigSource<R> {
    pub fn new(runner: R, strategy: impl Into<String>, overrides: Option<Value>) -> Self {
        Self {
            runner,
            strategy: strategy.into(),
            overrides,
        }
    }
}

impl<R: ConfigRunner> ConfigSource for RunnerConfigSource<R> {
    fn load(&self) -> Result<Value> {
        self.runner
            .build_config(&self.strategy, self.overrides.as_ref())
    }
}
