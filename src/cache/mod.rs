//! Etag-keyed settings cache.
//!
//! Shared between the poller and request-driven refresh paths. Entries are
//! keyed by `(store, key)` and upserted; last writer wins since every
//! setting carries its own etag. Watch etags used for change detection are
//! kept alongside; they are compared during a detection cycle and recorded
//! only once the whole cycle succeeded.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::models::Setting;

/// A cached setting. Never handed out without an etag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub store: String,
    pub key: String,
    pub label: Option<String>,
    pub value: Option<String>,
    pub etag: String,
    pub content_type: Option<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Slot {
    label: Option<String>,
    value: Option<String>,
    etag: Option<String>,
    content_type: Option<String>,
    last_updated: DateTime<Utc>,
}

type EntryKey = (String, String);

/// What a watch probe saw compared to the previous probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Nothing recorded yet.
    First,
    Unchanged,
    Changed { previous: String },
}

impl Observation {
    pub fn is_change(&self) -> bool {
        matches!(self, Observation::Changed { .. })
    }
}

#[derive(Debug, Default)]
pub struct SettingsCache {
    entries: DashMap<EntryKey, Slot>,
    refresh_sets: DashMap<String, Vec<String>>,
    watch_etags: DashMap<String, String>,
}

impl SettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `(store, key)`, or `None` if absent or lacking an etag.
    pub fn get(&self, store: &str, key: &str) -> Option<CacheEntry> {
        let slot = self.entries.get(&(store.to_string(), key.to_string()))?;
        to_entry(store, key, slot.value())
    }

    /// Upsert a setting, resetting its `last_updated` to `now`.
    pub fn put(&self, store: &str, setting: &Setting, now: DateTime<Utc>) {
        self.entries.insert(
            (store.to_string(), setting.key.clone()),
            Slot {
                label: setting.label.clone(),
                value: setting.value.clone(),
                etag: setting.etag.clone(),
                content_type: setting.content_type.clone(),
                last_updated: now,
            },
        );
    }

    /// Drop an entry, e.g. after the key disappeared upstream.
    pub fn remove(&self, store: &str, key: &str) -> bool {
        self.entries
            .remove(&(store.to_string(), key.to_string()))
            .is_some()
    }

    /// Keys of `store` whose `last_updated + ttl < now`, plus every entry
    /// without an etag. Sorted. Also replaces the store's refresh set.
    pub fn stale_keys(&self, store: &str, ttl: Duration, now: DateTime<Utc>) -> Vec<String> {
        let ttl = chrono::Duration::from_std(ttl).ok();
        let mut stale: Vec<String> = self
            .entries
            .iter()
            .filter(|item| item.key().0 == store)
            .filter(|item| {
                let slot = item.value();
                slot.etag.is_none()
                    || ttl
                        .and_then(|ttl| slot.last_updated.checked_add_signed(ttl))
                        .map_or(false, |expiry| expiry < now)
            })
            .map(|item| item.key().1.clone())
            .collect();
        stale.sort();

        self.refresh_sets.insert(store.to_string(), stale.clone());
        stale
    }

    /// The refresh set computed by the last [`stale_keys`](Self::stale_keys) call.
    pub fn refresh_keys(&self, store: &str) -> Vec<String> {
        self.refresh_sets
            .get(store)
            .map(|keys| keys.value().clone())
            .unwrap_or_default()
    }

    pub fn keys_for_store(&self, store: &str) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|item| item.key().0 == store)
            .map(|item| item.key().1.clone())
            .collect()
    }

    /// All entries of a store that carry an etag, sorted by key.
    pub fn entries_for_store(&self, store: &str) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self
            .entries
            .iter()
            .filter(|item| item.key().0 == store)
            .filter_map(|item| to_entry(store, &item.key().1, item.value()))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Mark every entry of a store stale so the next refresh re-fetches it.
    pub fn expire_store(&self, store: &str) -> usize {
        let mut expired = 0;
        for mut item in self.entries.iter_mut() {
            if item.key().0 == store {
                item.value_mut().last_updated = DateTime::<Utc>::MIN_UTC;
                expired += 1;
            }
        }
        expired
    }

    /// Compare the etag seen for a watch target with the recorded one
    /// without recording it. `""` means "currently absent" and is a value
    /// like any other.
    pub fn compare_etag(&self, watch_key: &str, etag: &str) -> Observation {
        match self.watch_etags.get(watch_key) {
            None => Observation::First,
            Some(recorded) if recorded.value() == etag => Observation::Unchanged,
            Some(recorded) => Observation::Changed {
                previous: recorded.value().clone(),
            },
        }
    }

    /// Record the etags observed by a completed detection cycle.
    pub fn record_etags<I>(&self, etags: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (watch_key, etag) in etags {
            self.watch_etags.insert(watch_key, etag);
        }
    }

    /// Last etag recorded for a watch target.
    pub fn watched_etag(&self, watch_key: &str) -> Option<String> {
        self.watch_etags.get(watch_key).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn to_entry(store: &str, key: &str, slot: &Slot) -> Option<CacheEntry> {
    let etag = slot.etag.clone()?;
    Some(CacheEntry {
        store: store.to_string(),
        key: key.to_string(),
        label: slot.label.clone(),
        value: slot.value.clone(),
        etag,
        content_type: slot.content_type.clone(),
        last_updated: slot.last_updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn setting(key: &str, etag: &str) -> Setting {
        Setting::new(key, "v").with_etag(etag)
    }

    #[test]
    fn test_put_and_get() {
        let cache = SettingsCache::new();
        cache.put("s", &setting("/application/a", "e1"), t(0));

        let entry = cache.get("s", "/application/a").unwrap();
        assert_eq!(entry.etag, "e1");
        assert_eq!(entry.last_updated, t(0));
        assert!(cache.get("other", "/application/a").is_none());
    }

    #[test]
    fn test_entry_without_etag_is_hidden_and_stale() {
        let cache = SettingsCache::new();
        cache.put("s", &Setting::new("k", "v"), t(0));

        assert!(cache.get("s", "k").is_none());
        assert_eq!(cache.stale_keys("s", Duration::from_secs(30), t(1)), vec!["k"]);
        assert!(cache.keys_for_store("s").contains("k"));
    }

    #[test]
    fn test_stale_keys_uses_ttl() {
        let cache = SettingsCache::new();
        cache.put("s", &setting("old", "e1"), t(0));
        cache.put("s", &setting("new", "e2"), t(20));
        cache.put("other", &setting("old", "e3"), t(0));

        let ttl = Duration::from_secs(30);
        assert!(cache.stale_keys("s", ttl, t(30)).is_empty());
        assert_eq!(cache.stale_keys("s", ttl, t(31)), vec!["old"]);
        assert_eq!(cache.stale_keys("s", ttl, t(51)), vec!["new", "old"]);
    }

    #[test]
    fn test_stale_keys_replaces_refresh_set() {
        let cache = SettingsCache::new();
        cache.put("s", &setting("a", "e1"), t(0));
        let ttl = Duration::from_secs(10);

        cache.stale_keys("s", ttl, t(11));
        assert_eq!(cache.refresh_keys("s"), vec!["a"]);

        cache.put("s", &setting("a", "e2"), t(11));
        cache.stale_keys("s", ttl, t(12));
        assert!(cache.refresh_keys("s").is_empty());
    }

    #[test]
    fn test_put_resets_last_updated() {
        let cache = SettingsCache::new();
        cache.put("s", &setting("a", "e1"), t(0));
        cache.put("s", &setting("a", "e1"), t(100));
        assert_eq!(cache.get("s", "a").unwrap().last_updated, t(100));
    }

    #[test]
    fn test_expire_store() {
        let cache = SettingsCache::new();
        cache.put("s", &setting("a", "e1"), t(0));
        cache.put("s", &setting("b", "e1"), t(0));
        cache.put("other", &setting("a", "e1"), t(0));

        assert_eq!(cache.expire_store("s"), 2);
        assert_eq!(cache.stale_keys("s", Duration::from_secs(3600), t(1)), vec!["a", "b"]);
        assert!(cache.stale_keys("other", Duration::from_secs(3600), t(1)).is_empty());
    }

    #[test]
    fn test_compare_etag_transitions() {
        let cache = SettingsCache::new();
        assert_eq!(cache.compare_etag("s|settings", "e1"), Observation::First);
        assert_eq!(cache.watched_etag("s|settings"), None);

        cache.record_etags([("s|settings".to_string(), "e1".to_string())]);
        assert_eq!(cache.compare_etag("s|settings", "e1"), Observation::Unchanged);
        assert_eq!(
            cache.compare_etag("s|settings", ""),
            Observation::Changed {
                previous: "e1".to_string()
            }
        );

        cache.record_etags([("s|settings".to_string(), String::new())]);
        assert_eq!(
            cache.compare_etag("s|settings", "e2"),
            Observation::Changed {
                previous: String::new()
            }
        );
    }

    #[test]
    fn test_compare_does_not_record() {
        let cache = SettingsCache::new();
        cache.record_etags([("w".to_string(), "e1".to_string())]);

        assert!(cache.compare_etag("w", "e2").is_change());
        assert!(cache.compare_etag("w", "e2").is_change());
        assert_eq!(cache.watched_etag("w").as_deref(), Some("e1"));
    }
}
