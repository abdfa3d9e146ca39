//! Push notification authentication and trigger matching.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::WebhookError;
use crate::models::{Store, TokenPair, Trigger};

const TOPIC_FIELD: &str = "topic";
const VALIDATION_CODE_FIELD: &str = "validationCode";
const KEY_FIELD: &str = "key";
const LABEL_FIELD: &str = "label";
const STORE_TOPIC_SEGMENT: &str = "configurationstores/";

/// The parts of an inbound notification the tracker cares about.
///
/// Fields are found anywhere in the document, so both a bare event and an
/// array of events are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    pub topic: String,
    pub validation_code: Option<String>,
    pub key: Option<String>,
    pub label: Option<String>,
}

impl WebhookRequest {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let document: Value = serde_json::from_slice(body)
            .map_err(|e| WebhookError::InvalidBody(e.to_string()))?;
        Self::from_value(&document)
    }

    pub fn from_value(document: &Value) -> Result<Self, WebhookError> {
        let topic = find_text(document, TOPIC_FIELD).ok_or(WebhookError::MissingTopic)?;
        Ok(Self {
            topic,
            validation_code: find_text(document, VALIDATION_CODE_FIELD),
            key: find_text(document, KEY_FIELD),
            label: find_text(document, LABEL_FIELD),
        })
    }

    /// Store name: the segment following the last `configurationstores/`.
    pub fn store_name(&self) -> Option<&str> {
        let start = self.topic.rfind(STORE_TOPIC_SEGMENT)? + STORE_TOPIC_SEGMENT.len();
        let name = self.topic[start..].split('/').next()?;
        (!name.is_empty()).then_some(name)
    }

    /// `https://<store>.<domain>`
    pub fn expected_endpoint(&self, domain: &str) -> Option<String> {
        self.store_name()
            .map(|store| format!("https://{}.{}", store, domain))
    }
}

/// Depth-first search for the first string (or scalar) value under `field`.
fn find_text(value: &Value, field: &str) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(field) {
                match found {
                    Value::String(s) => return Some(s.clone()),
                    Value::Null => return None,
                    Value::Bool(_) | Value::Number(_) => return Some(found.to_string()),
                    _ => {}
                }
            }
            map.values().find_map(|v| find_text(v, field))
        }
        Value::Array(items) => items.iter().find_map(|v| find_text(v, field)),
        _ => None,
    }
}

/// Outcome of a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookAuthState<'a> {
    pub store: &'a Store,
    pub matched_trigger: Option<&'a Trigger>,
}

fn token_matches(token: Option<&TokenPair>, params: &HashMap<String, String>) -> bool {
    token
        .filter(|t| t.is_configured())
        .and_then(|t| params.get(&t.name).map(|value| value == &t.secret))
        .unwrap_or(false)
}

/// Find the store the notification is for and check its shared-secret token.
///
/// Either the primary or the secondary token may match. A store with
/// neither configured never authenticates.
pub fn authenticate<'a>(
    request: &WebhookRequest,
    params: &HashMap<String, String>,
    stores: &'a [Store],
    domain: &str,
) -> Result<&'a Store, WebhookError> {
    let endpoint = request
        .expected_endpoint(domain)
        .ok_or(WebhookError::Unauthorized)?;

    stores
        .iter()
        .filter(|store| store.endpoint == endpoint)
        .find(|store| {
            let push = &store.monitoring.push;
            token_matches(push.primary_token.as_ref(), params)
                || token_matches(push.secondary_token.as_ref(), params)
        })
        .ok_or(WebhookError::Unauthorized)
}

/// The trigger of `store` matching the notification's key and label.
///
/// Stores without monitoring enabled never match.
pub fn resolve_trigger<'a>(request: &WebhookRequest, store: &'a Store) -> Option<&'a Trigger> {
    if !store.monitoring.enabled {
        return None;
    }
    let key = request.key.as_deref()?;
    store
        .monitoring
        .triggers
        .iter()
        .find(|trigger| trigger.matches(key, request.label.as_deref()))
}

/// Authenticate and resolve in one step.
pub fn track<'a>(
    request: &WebhookRequest,
    params: &HashMap<String, String>,
    stores: &'a [Store],
    domain: &str,
) -> Result<WebhookAuthState<'a>, WebhookError> {
    let store = authenticate(request, params, stores, domain)?;
    Ok(WebhookAuthState {
        store,
        matched_trigger: resolve_trigger(request, store),
    })
}
