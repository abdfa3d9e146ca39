//! Feature flag documents and the materialised feature set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A client filter attached to a feature flag, e.g. a percentage rollout.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeatureFilter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FeatureConditions {
    #[serde(default)]
    pub client_filters: Vec<FeatureFilter>,
}

/// Body of a setting with the feature flag content type.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeatureFlagDocument {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: Option<FeatureConditions>,
}

/// Evaluated state of one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureState {
    /// Disabled, or enabled for everyone.
    Toggle(bool),
    /// Enabled subject to client filters.
    Filtered { enabled_for: Vec<FeatureFilter> },
}

impl From<FeatureFlagDocument> for FeatureState {
    fn from(doc: FeatureFlagDocument) -> Self {
        if !doc.enabled {
            return FeatureState::Toggle(false);
        }
        let filters = doc.conditions.map(|c| c.client_filters).unwrap_or_default();
        if filters.is_empty() {
            FeatureState::Toggle(true)
        } else {
            FeatureState::Filtered {
                enabled_for: filters,
            }
        }
    }
}

/// All feature flags of a store, keyed by feature id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureSet {
    #[serde(flatten)]
    pub features: BTreeMap<String, FeatureState>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, doc: FeatureFlagDocument) {
        let id = doc.id.clone();
        self.features.insert(id, FeatureState::from(doc));
    }

    pub fn get(&self, id: &str) -> Option<&FeatureState> {
        self.features.get(id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
