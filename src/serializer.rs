use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use thiserror::Error;

use crate::feature_state::FeatureState;

/// Serializer converts a [FeatureState] to and from the text stored in an object.
///
/// Implementations must round-trip: decoding an encoded state yields the same enabled flag,
/// strategy identifier and parameters. Encoding must be deterministic for equal states.
pub trait Serializer {
    fn encode(&self, state: &FeatureState) -> Result<String, EncodeError>;

    /// Decode `text` into the state of `feature`. The feature identifier is not part of the
    /// stored text; the caller supplies it.
    fn decode(&self, feature: &str, text: &str) -> Result<FeatureState, DecodeError>;
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// EncodeError is returned when a state cannot be turned into text.
#[derive(Debug, Error)]
#[error("could not encode state of feature {feature}: {source}")]
pub struct EncodeError {
    pub feature: String,
    #[source]
    source: BoxError,
}

impl EncodeError {
    pub fn new(feature: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            feature: feature.into(),
            source: source.into(),
        }
    }
}

/// DecodeError is returned when a stored object does not hold a valid encoded state.
#[derive(Debug, Error)]
#[error("could not decode stored state of feature {feature}: {source}")]
pub struct DecodeError {
    pub feature: String,
    #[source]
    source: BoxError,
}

impl DecodeError {
    pub fn new(feature: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            feature: feature.into(),
            source: source.into(),
        }
    }
}

/// The JSON document stored for each feature.
///
/// `strategyId` is omitted when unset, and parameters are written in key order so that
/// equal states always produce identical bytes.
#[serde_as]
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strategy_id: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    parameters: BTreeMap<String, String>,
}

/// JsonSerializer stores states as compact JSON objects, for example
/// `{"enabled":true,"strategyId":"abc","parameters":{"key1":"value1"}}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn encode(&self, state: &FeatureState) -> Result<String, EncodeError> {
        let stored = StoredState {
            enabled: state.is_enabled(),
            strategy_id: state.get_strategy_id().map(str::to_owned),
            parameters: state.parameters().clone(),
        };
        serde_json::to_string(&stored).map_err(|e| EncodeError::new(state.feature(), e))
    }

    fn decode(&self, feature: &str, text: &str) -> Result<FeatureState, DecodeError> {
        let stored: StoredState =
            serde_json::from_str(text).map_err(|e| DecodeError::new(feature, e))?;
        Ok(FeatureState::from_parts(
            feature.to_string(),
            stored.enabled,
            stored.strategy_id,
            stored.parameters,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_state::proptest_generators::*;
    use maplit::btreemap;
    use proptest::prelude::*;
    use spectral::prelude::*;
    use test_case::test_case;

    #[test]
    fn encodes_all_fields() {
        let state = FeatureState::new("F1")
            .enabled(true)
            .strategy_id("abc")
            .parameter("key1", "value1");

        let text = JsonSerializer.encode(&state).unwrap();

        assert_eq!(
            text,
            r#"{"enabled":true,"strategyId":"abc","parameters":{"key1":"value1"}}"#
        );
    }

    #[test]
    fn omits_missing_strategy() {
        let text = JsonSerializer.encode(&FeatureState::new("F1")).unwrap();
        assert_eq!(text, r#"{"enabled":false,"parameters":{}}"#);
    }

    #[test]
    fn parameter_order_does_not_affect_encoding() {
        let forward = FeatureState::new("F1").parameter("a", "1").parameter("b", "2");
        let backward = FeatureState::new("F1").parameter("b", "2").parameter("a", "1");

        assert_eq!(
            JsonSerializer.encode(&forward).unwrap(),
            JsonSerializer.encode(&backward).unwrap()
        );
    }

    #[test]
    fn decode_uses_the_supplied_feature() {
        let state = JsonSerializer
            .decode("F2", r#"{"enabled":true,"strategyId":"def","parameters":{"k":"v"}}"#)
            .unwrap();

        assert_that!(state.feature()).is_equal_to("F2");
        assert_that!(state.is_enabled()).is_true();
        assert_that!(state.get_strategy_id()).contains_value("def");
        assert_that!(state.parameters()).is_equal_to(&btreemap! {
            "k".to_string() => "v".to_string(),
        });
    }

    #[test_case(r#"{"enabled":true}"#; "missing optional fields")]
    #[test_case(r#"{"enabled":true,"strategyId":null,"parameters":null}"#; "explicit nulls")]
    #[test_case(r#"{"enabled":true,"strategyId":"","parameters":{}}"#; "empty values")]
    #[test_case(r#"{"enabled":true,"unknown":[1,2]}"#; "unknown fields ignored")]
    fn decode_accepts_sparse_documents(text: &str) {
        let state = JsonSerializer.decode("F1", text).unwrap();

        assert_that!(state.is_enabled()).is_true();
        assert_that!(state.get_strategy_id()).is_none();
        assert_that!(state.parameters().is_empty()).is_true();
    }

    #[test_case("not json"; "garbage")]
    #[test_case("{}"; "missing enabled")]
    #[test_case(r#"{"enabled":"yes"}"#; "enabled wrong type")]
    #[test_case(r#"{"enabled":true,"parameters":{"k":1}}"#; "non string parameter")]
    #[test_case(r#"{"enabled":true,"parameters":[]}"#; "parameters not an object")]
    fn decode_rejects_malformed_documents(text: &str) {
        let err = JsonSerializer.decode("F1", text).unwrap_err();
        assert_that!(err.feature.as_str()).is_equal_to("F1");
    }

    proptest! {
        #[test]
        fn decode_reproduces_encoded_state(state in any_feature_state()) {
            let text = JsonSerializer.encode(&state).unwrap();
            let decoded = JsonSerializer.decode(state.feature(), &text).unwrap();
            prop_assert_eq!(decoded, state);
        }
    }

    proptest! {
        #[test]
        fn encoding_is_deterministic(state in any_feature_state()) {
            let first = JsonSerializer.encode(&state).unwrap();
            let decoded = JsonSerializer.decode(state.feature(), &first).unwrap();
            let second = JsonSerializer.encode(&decoded).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
