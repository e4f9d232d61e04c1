//! Cost table configuration.
//!
//! The stock [`EmitCostTable`] matches one backend. When the generator
//! changes, the numbers can be supplied without a rebuild: from environment
//! variables (always available) or from a JSON document (feature `config`).
//!
//! Every entry is optional. Anything not configured keeps its stock value.

use std::collections::HashMap;
use std::env;

use crate::analysis::EmitCostTable;
use crate::error::{CallSiteError, CallSiteResult};

/// Prefix used by [`EmitCostTable::from_env`].
pub const DEFAULT_ENV_PREFIX: &str = "FERROUS_CALLSITE";

/// Source of raw cost settings
pub trait CostSource: Send + Sync + std::fmt::Debug {
    /// Raw value for a setting, if set.
    ///
    /// Setting names are the [`EmitCostTable`] field names: `constructor`,
    /// `scoped`, `constant`, `service_provider` and `factory`.
    fn get(&self, key: &str) -> Option<String>;

    /// Name under which `key` appears to users, for error messages.
    fn describe(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Environment variable cost source
#[derive(Debug, Clone)]
pub struct EnvironmentCostSource {
    prefix: String,
}

impl EnvironmentCostSource {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_ENV_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn var_name(&self, key: &str) -> String {
        format!("{}_{}", self.prefix.to_uppercase(), key.to_uppercase())
    }
}

impl Default for EnvironmentCostSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CostSource for EnvironmentCostSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(self.var_name(key)).ok()
    }

    fn describe(&self, key: &str) -> String {
        self.var_name(key)
    }
}

/// In-memory cost source, handy for tests and for values parsed elsewhere
#[derive(Debug, Clone, Default)]
pub struct MapCostSource {
    values: HashMap<String, String>,
}

impl MapCostSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl CostSource for MapCostSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

fn parse_cost(source: &dyn CostSource, key: &str) -> CallSiteResult<Option<usize>> {
    match source.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| CallSiteError::InvalidCost { name: source.describe(key), value: raw }),
    }
}

impl EmitCostTable {
    /// Stock table overridden by whatever `source` sets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_callsite::EmitCostTable;
    /// use ferrous_callsite::config::MapCostSource;
    ///
    /// let source = MapCostSource::new().set("scoped", "48").set("factory", "20");
    /// let costs = EmitCostTable::from_source(&source).unwrap();
    /// assert_eq!(costs, EmitCostTable::default().with_scoped(48).with_factory(20));
    ///
    /// let bad = MapCostSource::new().set("constant", "-1");
    /// assert!(EmitCostTable::from_source(&bad).is_err());
    /// ```
    pub fn from_source(source: &dyn CostSource) -> CallSiteResult<Self> {
        let mut table = EmitCostTable::DEFAULT;
        let slots = [
            ("constructor", &mut table.constructor),
            ("scoped", &mut table.scoped),
            ("constant", &mut table.constant),
            ("service_provider", &mut table.service_provider),
            ("factory", &mut table.factory),
        ];
        for (key, slot) in slots {
            if let Some(cost) = parse_cost(source, key)? {
                *slot = cost;
            }
        }
        Ok(table)
    }

    /// Reads `FERROUS_CALLSITE_CONSTRUCTOR`, `FERROUS_CALLSITE_SCOPED`, ...
    pub fn from_env() -> CallSiteResult<Self> {
        Self::from_source(&EnvironmentCostSource::new())
    }

    /// Reads `<PREFIX>_CONSTRUCTOR`, `<PREFIX>_SCOPED`, ...
    pub fn from_env_with_prefix(prefix: &str) -> CallSiteResult<Self> {
        Self::from_source(&EnvironmentCostSource::with_prefix(prefix))
    }

    /// Parses a JSON object such as `{"scoped": 48}`.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> CallSiteResult<Self> {
        serde_json::from_str(json).map_err(|e| CallSiteError::Config(e.to_string()))
    }

    /// Reads a JSON cost table from a file.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> CallSiteResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CallSiteError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Serializes the table as pretty JSON.
    #[cfg(feature = "config")]
    pub fn to_json(&self) -> CallSiteResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CallSiteError::Config(e.to_string()))
    }
}
