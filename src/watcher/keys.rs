//! Key contexts and watch filters.

use crate::models::Store;

/// Revision filter covering every feature flag of a store.
pub const FEATURE_FLAG_WATCH_KEY: &str = ".appconfig*";

/// Key contexts in search order, without any store prefix.
///
/// For the default context and then the application name (when set):
/// `/<name>/` followed by `/<name><separator><profile>/` per profile. Later
/// contexts are more specific and override earlier ones.
pub fn generate_contexts(
    default_context: &str,
    app_name: Option<&str>,
    profiles: &[String],
    separator: &str,
) -> Vec<String> {
    let mut contexts = Vec::new();
    let names = std::iter::once(default_context).chain(app_name.filter(|n| !n.is_empty()));

    for name in names {
        let name = name.trim_matches('/');
        push_unique(&mut contexts, format!("/{}/", name));
        for profile in profiles.iter().filter(|p| !p.is_empty()) {
            push_unique(&mut contexts, format!("/{}{}{}/", name, separator, profile));
        }
    }
    contexts
}

fn push_unique(contexts: &mut Vec<String>, context: String) {
    if !contexts.contains(&context) {
        contexts.push(context);
    }
}

/// Composite filter for the settings namespace of `store`.
///
/// `prefix + context + watched_key` per context, joined by `,`. A composite
/// that mixes several keys with a wildcard collapses to `*`, since the
/// server only takes one wildcard filter.
pub fn watched_key_filter(store: &Store) -> String {
    let watched = if store.watched_key.is_empty() {
        "*"
    } else {
        store.watched_key.as_str()
    };

    let composite = store
        .key_paths()
        .iter()
        .map(|path| format!("{}{}", path, watched))
        .collect::<Vec<_>>()
        .join(",");

    if composite.contains(',') && composite.contains('*') {
        "*".to_string()
    } else {
        composite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoreCredential;

    fn store() -> Store {
        Store::new(
            "demo",
            "https://demo.azconfig.io",
            StoreCredential::ManagedIdentity { client_id: None },
        )
    }

    #[test]
    fn test_contexts_default_only() {
        assert_eq!(
            generate_contexts("application", None, &[], "_"),
            vec!["/application/".to_string()]
        );
    }

    #[test]
    fn test_contexts_with_name_and_profiles() {
        let profiles = vec!["dev".to_string(), "eu".to_string()];
        assert_eq!(
            generate_contexts("application", Some("shop"), &profiles, "_"),
            vec![
                "/application/",
                "/application_dev/",
                "/application_eu/",
                "/shop/",
                "/shop_dev/",
                "/shop_eu/",
            ]
        );
    }

    #[test]
    fn test_contexts_skip_duplicate_name() {
        assert_eq!(
            generate_contexts("application", Some("application"), &[], "_"),
            vec!["/application/".to_string()]
        );
    }

    #[test]
    fn test_single_context_filter() {
        assert_eq!(watched_key_filter(&store()), "/application/*");

        let literal = store().with_watched_key("sentinel");
        assert_eq!(watched_key_filter(&literal), "/application/sentinel");
    }

    #[test]
    fn test_prefixed_literal_filter_joins_contexts() {
        let s = store()
            .with_prefix("/team")
            .with_contexts(vec!["/application/".into(), "/shop/".into()])
            .with_watched_key("sentinel");
        assert_eq!(
            watched_key_filter(&s),
            "/team/application/sentinel,/team/shop/sentinel"
        );
    }

    #[test]
    fn test_multi_context_wildcard_collapses() {
        let s = store().with_contexts(vec!["/application/".into(), "/shop/".into()]);
        assert_eq!(watched_key_filter(&s), "*");
    }

    #[test]
    fn test_empty_watched_key_means_wildcard() {
        let s = store().with_watched_key("");
        assert_eq!(watched_key_filter(&s), "/application/*");
    }
}
