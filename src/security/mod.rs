//! Resource limits guarding against entity-expansion and name-length abuse.
//!
//! Two cooperating pieces live here:
//!
//! - [`SecurityManager`] holds the configured ceiling for every [`Limit`]
//!   and remembers whether that ceiling is the built-in default, was set
//!   explicitly, or is disabled (a value of `0`).
//! - [`LimitAnalyzer`] accumulates the measured values during a scan. The
//!   entity scanner feeds it through `add_value` as it consumes characters
//!   and asks the manager whether the running value is over the ceiling.
//!
//! Counters are monotonically increasing within one scan and are reset
//! between scans.

use std::collections::HashMap;
use std::fmt;

/// A category of resource limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    /// Number of entity references expanded in one document.
    EntityExpansion,
    /// Number of attributes on a single element.
    ElementAttribute,
    /// Total characters produced by all entity expansions.
    TotalEntitySize,
    /// Characters produced by a single general entity expansion.
    GeneralEntitySize,
    /// Characters produced by a single parameter entity expansion.
    ParameterEntitySize,
    /// Element nesting depth.
    MaxElementDepth,
    /// Length of an XML name (checked per segment for qualified names).
    MaxName,
    /// Element and attribute nodes produced inside general entities.
    EntityReplacement,
}

impl Limit {
    /// Every limit category, in index order.
    pub const ALL: [Limit; 8] = [
        Limit::EntityExpansion,
        Limit::ElementAttribute,
        Limit::TotalEntitySize,
        Limit::GeneralEntitySize,
        Limit::ParameterEntitySize,
        Limit::MaxElementDepth,
        Limit::MaxName,
        Limit::EntityReplacement,
    ];

    fn index(self) -> usize {
        match self {
            Limit::EntityExpansion => 0,
            Limit::ElementAttribute => 1,
            Limit::TotalEntitySize => 2,
            Limit::GeneralEntitySize => 3,
            Limit::ParameterEntitySize => 4,
            Limit::MaxElementDepth => 5,
            Limit::MaxName => 6,
            Limit::EntityReplacement => 7,
        }
    }

    /// The built-in ceiling for this limit. `0` means unlimited.
    #[must_use]
    pub fn default_value(self) -> usize {
        match self {
            Limit::EntityExpansion => 64_000,
            Limit::ElementAttribute => 10_000,
            Limit::TotalEntitySize => 50_000_000,
            Limit::GeneralEntitySize => 0,
            Limit::ParameterEntitySize => 1_000_000,
            Limit::MaxElementDepth => 0,
            Limit::MaxName => 1000,
            Limit::EntityReplacement => 3_000_000,
        }
    }

    /// The error code reported when this limit is exceeded.
    #[must_use]
    pub fn error_code(self) -> &'static str {
        match self {
            Limit::EntityExpansion => "EntityExpansionLimit",
            Limit::ElementAttribute => "ElementAttributeLimit",
            Limit::TotalEntitySize => "TotalEntitySizeLimit",
            Limit::GeneralEntitySize | Limit::ParameterEntitySize => "MaxEntitySizeLimit",
            Limit::MaxElementDepth => "MaxElementDepthLimit",
            Limit::MaxName => "MaxXMLNameLimit",
            Limit::EntityReplacement => "EntityReplacementLimit",
        }
    }

    /// Limits whose value is a running total rather than a per-item maximum.
    fn is_accumulating(self) -> bool {
        matches!(
            self,
            Limit::EntityExpansion | Limit::TotalEntitySize | Limit::EntityReplacement
        )
    }

    /// Limits tracked per entity name.
    fn is_per_entity(self) -> bool {
        matches!(self, Limit::GeneralEntitySize | Limit::ParameterEntitySize)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Limit::EntityExpansion => "entity expansion count",
            Limit::ElementAttribute => "element attribute count",
            Limit::TotalEntitySize => "total entity size",
            Limit::GeneralEntitySize => "general entity size",
            Limit::ParameterEntitySize => "parameter entity size",
            Limit::MaxElementDepth => "element depth",
            Limit::MaxName => "name length",
            Limit::EntityReplacement => "entity replacement node count",
        };
        f.write_str(s)
    }
}

/// How the ceiling of a limit was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitState {
    /// The built-in default applies.
    Default,
    /// The ceiling was set explicitly through the options.
    Configured,
    /// The limit is switched off (ceiling `0`).
    Disabled,
}

impl LimitState {
    /// A short literal suitable for diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LimitState::Default => "default",
            LimitState::Configured => "configuration",
            LimitState::Disabled => "disabled",
        }
    }
}

/// Configured ceilings for every [`Limit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityManager {
    values: [usize; 8],
    states: [LimitState; 8],
}

impl SecurityManager {
    /// Creates a manager populated with the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        let mut values = [0; 8];
        let mut states = [LimitState::Default; 8];
        for limit in Limit::ALL {
            let value = limit.default_value();
            values[limit.index()] = value;
            if value == 0 {
                states[limit.index()] = LimitState::Disabled;
            }
        }
        Self { values, states }
    }

    /// Sets the ceiling for `limit`. A value of `0` disables it.
    pub fn set_limit(&mut self, limit: Limit, value: usize) {
        self.values[limit.index()] = value;
        self.states[limit.index()] = if value == 0 {
            LimitState::Disabled
        } else {
            LimitState::Configured
        };
    }

    /// Returns the ceiling for `limit` (`0` when disabled).
    #[must_use]
    pub fn limit(&self, limit: Limit) -> usize {
        self.values[limit.index()]
    }

    /// Returns how the ceiling for `limit` was established.
    #[must_use]
    pub fn state(&self, limit: Limit) -> LimitState {
        self.states[limit.index()]
    }

    /// Returns the diagnostic literal of the limit's state.
    #[must_use]
    pub fn state_literal(&self, limit: Limit) -> &'static str {
        self.state(limit).as_str()
    }

    /// Returns `true` if `limit` is switched off.
    #[must_use]
    pub fn is_no_limit(&self, limit: Limit) -> bool {
        self.values[limit.index()] == 0
    }

    /// Returns `true` if the value measured by `analyzer` for `limit` is
    /// above the configured ceiling.
    #[must_use]
    pub fn is_over_limit(&self, limit: Limit, analyzer: &LimitAnalyzer) -> bool {
        !self.is_no_limit(limit) && analyzer.value(limit) > self.limit(limit)
    }

    /// Returns `true` if `value` alone is above the ceiling of `limit`.
    #[must_use]
    pub fn is_value_over_limit(&self, limit: Limit, value: usize) -> bool {
        !self.is_no_limit(limit) && value > self.limit(limit)
    }
}

impl Default for SecurityManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates measured values for every [`Limit`] during one scan.
#[derive(Debug, Default, Clone)]
pub struct LimitAnalyzer {
    /// Largest per-item value seen (name length, depth, single entity size).
    values: [usize; 8],
    /// Running totals for accumulating limits.
    totals: [usize; 8],
    /// Entity responsible for the current per-item maximum.
    names: [Option<String>; 8],
    /// Per-entity running sizes for the per-entity limits.
    general_sizes: HashMap<String, usize>,
    parameter_sizes: HashMap<String, usize>,
}

impl LimitAnalyzer {
    /// Creates an analyzer with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to the counter for `limit`, attributed to `entity_name`.
    pub fn add_value(&mut self, limit: Limit, entity_name: &str, amount: usize) {
        let index = limit.index();
        if limit.is_accumulating() {
            self.totals[index] = self.totals[index].saturating_add(amount);
            return;
        }
        if !limit.is_per_entity() {
            self.values[index] = amount;
            self.totals[index] = amount;
            return;
        }

        let cache = match limit {
            Limit::GeneralEntitySize => &mut self.general_sizes,
            _ => &mut self.parameter_sizes,
        };
        let current = cache.entry(entity_name.to_string()).or_insert(0);
        *current = current.saturating_add(amount);
        let current = *current;
        if current > self.values[index] {
            self.values[index] = current;
            self.names[index] = Some(entity_name.to_string());
        }

        let total = Limit::TotalEntitySize.index();
        self.totals[total] = self.totals[total].saturating_add(amount);
    }

    /// Returns the measured value for `limit`.
    #[must_use]
    pub fn value(&self, limit: Limit) -> usize {
        if limit.is_accumulating() {
            self.totals[limit.index()]
        } else {
            self.values[limit.index()]
        }
    }

    /// Returns the running size of the named entity for a per-entity limit.
    #[must_use]
    pub fn entity_value(&self, limit: Limit, entity_name: &str) -> usize {
        let cache = match limit {
            Limit::GeneralEntitySize => &self.general_sizes,
            Limit::ParameterEntitySize => &self.parameter_sizes,
            _ => return 0,
        };
        cache.get(entity_name).copied().unwrap_or(0)
    }

    /// Returns the entity holding the per-item maximum for `limit`.
    #[must_use]
    pub fn largest_entity(&self, limit: Limit) -> Option<&str> {
        self.names[limit.index()].as_deref()
    }

    /// Forgets the running size of an entity whose expansion has ended, so
    /// the next expansion of the same entity is measured afresh.
    pub fn end_entity(&mut self, limit: Limit, entity_name: &str) {
        match limit {
            Limit::GeneralEntitySize => {
                self.general_sizes.remove(entity_name);
            }
            Limit::ParameterEntitySize => {
                self.parameter_sizes.remove(entity_name);
            }
            _ => {}
        }
    }

    /// Zeroes every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_states() {
        let manager = SecurityManager::new();
        assert_eq!(manager.limit(Limit::EntityExpansion), 64_000);
        assert_eq!(manager.state(Limit::MaxName), LimitState::Default);
        assert_eq!(manager.state(Limit::GeneralEntitySize), LimitState::Disabled);
        assert!(manager.is_no_limit(Limit::MaxElementDepth));
    }

    #[test]
    fn test_set_limit_marks_configured() {
        let mut manager = SecurityManager::new();
        manager.set_limit(Limit::GeneralEntitySize, 10);
        assert_eq!(manager.state(Limit::GeneralEntitySize), LimitState::Configured);
        assert_eq!(manager.state_literal(Limit::GeneralEntitySize), "configuration");
        manager.set_limit(Limit::MaxName, 0);
        assert_eq!(manager.state(Limit::MaxName), LimitState::Disabled);
    }

    #[test]
    fn test_per_entity_sizes_accumulate_and_reset() {
        let mut manager = SecurityManager::new();
        manager.set_limit(Limit::GeneralEntitySize, 10);
        let mut analyzer = LimitAnalyzer::new();

        analyzer.add_value(Limit::GeneralEntitySize, "e", 6);
        assert!(!manager.is_over_limit(Limit::GeneralEntitySize, &analyzer));
        analyzer.add_value(Limit::GeneralEntitySize, "e", 5);
        assert!(manager.is_over_limit(Limit::GeneralEntitySize, &analyzer));
        assert_eq!(analyzer.largest_entity(Limit::GeneralEntitySize), Some("e"));
        assert_eq!(analyzer.value(Limit::TotalEntitySize), 11);

        analyzer.end_entity(Limit::GeneralEntitySize, "e");
        assert_eq!(analyzer.entity_value(Limit::GeneralEntitySize, "e"), 0);
    }

    #[test]
    fn test_separate_entities_tracked_separately() {
        let mut analyzer = LimitAnalyzer::new();
        analyzer.add_value(Limit::GeneralEntitySize, "a", 4);
        analyzer.add_value(Limit::GeneralEntitySize, "b", 7);
        analyzer.add_value(Limit::GeneralEntitySize, "a", 1);
        assert_eq!(analyzer.value(Limit::GeneralEntitySize), 7);
        assert_eq!(analyzer.entity_value(Limit::GeneralEntitySize, "a"), 5);
    }

    #[test]
    fn test_name_limit_is_per_item() {
        let mut manager = SecurityManager::new();
        manager.set_limit(Limit::MaxName, 5);
        let mut analyzer = LimitAnalyzer::new();
        analyzer.add_value(Limit::MaxName, "[xml]", 6);
        assert!(manager.is_over_limit(Limit::MaxName, &analyzer));
        analyzer.add_value(Limit::MaxName, "[xml]", 3);
        assert!(!manager.is_over_limit(Limit::MaxName, &analyzer));

        manager.set_limit(Limit::ElementAttribute, 2);
        analyzer.add_value(Limit::ElementAttribute, "[xml]", 2);
        analyzer.add_value(Limit::ElementAttribute, "[xml]", 2);
        assert!(!manager.is_over_limit(Limit::ElementAttribute, &analyzer));
    }

    #[test]
    fn test_expansion_count_accumulates() {
        let mut manager = SecurityManager::new();
        manager.set_limit(Limit::EntityExpansion, 2);
        let mut analyzer = LimitAnalyzer::new();
        for _ in 0..3 {
            analyzer.add_value(Limit::EntityExpansion, "x", 1);
        }
        assert!(manager.is_over_limit(Limit::EntityExpansion, &analyzer));
        analyzer.reset();
        assert_eq!(analyzer.value(Limit::EntityExpansion), 0);
    }

    #[test]
    fn test_disabled_limit_never_trips() {
        let manager = SecurityManager::new();
        let mut analyzer = LimitAnalyzer::new();
        analyzer.add_value(Limit::GeneralEntitySize, "e", usize::MAX);
        assert!(!manager.is_over_limit(Limit::GeneralEntitySize, &analyzer));
    }
}
