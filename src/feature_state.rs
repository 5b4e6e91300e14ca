use std::collections::btree_map::Keys;
use std::collections::BTreeMap;

/// Name of the parameter holding the comma-separated user list consumed by username
/// activation strategies.
pub const USERS_PARAMETER: &str = "users";

/// FeatureState is the persisted configuration of a single feature: whether it is enabled,
/// which activation strategy the flag framework should apply, and that strategy's
/// parameters.
///
/// A FeatureState is always written as a whole. Storing a state replaces whatever was stored
/// for the same feature before, so parameters missing from the new state are dropped.
///
/// ```
/// # use feature_state_repository::FeatureState;
/// let state = FeatureState::new("F1")
///     .enabled(true)
///     .strategy_id("gradual")
///     .parameter("percentage", "25");
///
/// assert!(state.is_enabled());
/// assert_eq!(state.get_parameter("percentage"), Some("25"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureState {
    feature: String,
    enabled: bool,
    strategy_id: Option<String>,
    parameters: BTreeMap<String, String>,
}

impl FeatureState {
    /// Create a disabled state for `feature` with no strategy and no parameters.
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            enabled: false,
            strategy_id: None,
            parameters: BTreeMap::new(),
        }
    }

    /// Sets the enabled flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the strategy identifier. An empty string is treated as no strategy.
    pub fn strategy_id(mut self, strategy_id: impl Into<String>) -> Self {
        self.set_strategy_id(Some(strategy_id.into()));
        self
    }

    /// Sets a single parameter, replacing any previous value for `name`.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_parameter(name, value);
        self
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) -> &mut Self {
        self.enabled = true;
        self
    }

    pub fn disable(&mut self) -> &mut Self {
        self.enabled = false;
        self
    }

    pub fn get_strategy_id(&self) -> Option<&str> {
        self.strategy_id.as_deref()
    }

    pub fn set_strategy_id(&mut self, strategy_id: Option<String>) -> &mut Self {
        self.strategy_id = strategy_id.filter(|s| !s.is_empty());
        self
    }

    pub fn get_parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn set_parameter(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Removes a parameter, returning its previous value.
    pub fn remove_parameter(&mut self, name: &str) -> Option<String> {
        self.parameters.remove(name)
    }

    /// Parameter names in sorted order.
    pub fn parameter_names(&self) -> Keys<'_, String, String> {
        self.parameters.keys()
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Returns the users listed in the [USERS_PARAMETER] parameter, trimmed and with empty
    /// entries skipped. Returns an empty list when the parameter is not set.
    pub fn users(&self) -> Vec<&str> {
        self.get_parameter(USERS_PARAMETER)
            .map(|users| {
                users
                    .split(',')
                    .map(str::trim)
                    .filter(|user| !user.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn from_parts(
        feature: String,
        enabled: bool,
        strategy_id: Option<String>,
        parameters: BTreeMap<String, String>,
    ) -> Self {
        let mut state = Self {
            feature,
            enabled,
            strategy_id: None,
            parameters,
        };
        state.set_strategy_id(strategy_id);
        state
    }
}

#[cfg(test)]
pub(crate) mod proptest_generators {
    use super::FeatureState;
    use proptest::collection::btree_map;
    use proptest::option;
    use proptest::prelude::*;

    prop_compose! {
        pub(crate) fn any_feature_id()(s in "[A-Za-z0-9_./-]{1,40}") -> String {
            s
        }
    }

    prop_compose! {
        pub(crate) fn any_feature_state()(
            feature in any_feature_id(),
            enabled in any::<bool>(),
            strategy_id in option::of("[a-z][a-z0-9-]{0,20}"),
            parameters in btree_map(".{1,16}", ".{0,32}", 0..8),
        ) -> FeatureState {
            FeatureState::from_parts(feature, enabled, strategy_id, parameters)
        }
    }
}
