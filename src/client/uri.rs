//! Request URI construction and `Link` header pagination.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ApiPath, QuerySelector};

/// Wire form of the null label.
pub const NULL_LABEL: &str = "%00";

static NEXT_LINK_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"<(.*?)>;\s*rel="next""#).ok());

/// Build `{endpoint}{path}?key=..&label=..&$select=..&api-version=..`.
///
/// Each key and label is percent-encoded on its own and the list joined
/// with `,`. No labels, or a `None` label, sends the null label.
pub fn build_request_uri(
    endpoint: &str,
    api: ApiPath,
    selector: &QuerySelector,
    api_version: &str,
) -> String {
    let mut params: Vec<String> = Vec::new();

    let keys: Vec<String> = selector
        .keys
        .iter()
        .flat_map(|filter| filter.split(','))
        .map(|key| key.trim())
        .filter(|key| !key.is_empty())
        .map(|key| urlencoding::encode(key).into_owned())
        .collect();
    if !keys.is_empty() {
        params.push(format!("key={}", keys.join(",")));
    }

    let labels: Vec<String> = if selector.labels.is_empty() {
        vec![NULL_LABEL.to_string()]
    } else {
        selector.labels.iter().map(|label| encode_label(label.as_deref())).collect()
    };
    params.push(format!("label={}", labels.join(",")));

    if !selector.fields.is_empty() {
        let fields: Vec<&str> = selector.fields.iter().map(|f| f.as_str()).collect();
        params.push(format!("$select={}", fields.join(",")));
    }

    params.push(format!("api-version={}", urlencoding::encode(api_version)));

    format!(
        "{}{}?{}",
        endpoint.trim_end_matches('/'),
        api.as_path(),
        params.join("&")
    )
}

fn encode_label(label: Option<&str>) -> String {
    match label {
        None | Some("\0") | Some("") => NULL_LABEL.to_string(),
        Some(label) => urlencoding::encode(label).into_owned(),
    }
}

/// Extract the target of a `rel="next"` link, if the header carries one.
pub fn parse_next_link(link_header: &str) -> Option<String> {
    let regex = NEXT_LINK_REGEX.as_ref()?;
    regex
        .captures(link_header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|link| !link.is_empty())
}

/// Resolve a next-page link against the store endpoint, adding
/// `api-version` when the link lacks one.
pub fn resolve_next_link(endpoint: &str, link: &str, api_version: &str) -> String {
    let mut url = if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else {
        format!(
            "{}/{}",
            endpoint.trim_end_matches('/'),
            link.trim_start_matches('/')
        )
    };

    if !url.contains("api-version=") {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str("api-version=");
        url.push_str(&urlencoding::encode(api_version));
    }
    url
}
