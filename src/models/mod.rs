pub mod feature;
mod query;
mod setting;
mod store;

pub use feature::{FeatureFilter, FeatureFlagDocument, FeatureSet, FeatureState};
pub use query::{ApiPath, ItemRange, QueryField, QuerySelector};
pub use setting::{
    Setting, SettingKind, SettingsPage, FEATURE_FLAG_CONTENT_TYPE, FEATURE_FLAG_PREFIX,
    SECRET_REFERENCE_CONTENT_TYPE,
};
pub use store::{Monitoring, PushTokens, Store, StoreCredential, TokenPair, Trigger};

use serde::Deserialize;

/// Body of a setting with the secret reference content type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SecretReference {
    pub uri: String,
}
