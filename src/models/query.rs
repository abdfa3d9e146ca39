//! Query selectors for the `/kv` and `/revisions` endpoints.

use std::fmt;

/// Which collection a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiPath {
    /// Current key-values.
    Kv,
    /// Historical revisions, newest first.
    Revisions,
}

impl ApiPath {
    pub fn as_path(&self) -> &'static str {
        match self {
            ApiPath::Kv => "/kv",
            ApiPath::Revisions => "/revisions",
        }
    }
}

/// Fields that can be requested through `$select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryField {
    Key,
    Label,
    Value,
    ContentType,
    Etag,
    LastModified,
    Locked,
    Tags,
}

impl QueryField {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryField::Key => "key",
            QueryField::Label => "label",
            QueryField::Value => "value",
            QueryField::ContentType => "content_type",
            QueryField::Etag => "etag",
            QueryField::LastModified => "last_modified",
            QueryField::Locked => "locked",
            QueryField::Tags => "tags",
        }
    }
}

/// Inclusive item range sent as `Range: items=<start>-<end>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRange {
    pub start: u32,
    pub end: u32,
}

impl ItemRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Only the first (most recent) item.
    pub fn first() -> Self {
        Self::new(0, 0)
    }

    /// Number of items the range asks for.
    pub fn item_count(&self) -> usize {
        self.end.saturating_sub(self.start) as usize + 1
    }
}

impl fmt::Display for ItemRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "items={}-{}", self.start, self.end)
    }
}

/// What to ask a store for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySelector {
    /// Key filters, OR-ed by the server. Empty means all keys.
    pub keys: Vec<String>,
    /// Labels in priority order. `None` is the null label; empty means the null label only.
    pub labels: Vec<Option<String>>,
    pub fields: Vec<QueryField>,
    pub range: Option<ItemRange>,
}

impl QuerySelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector for a single key filter (may itself contain `,` separated keys).
    pub fn for_key(key: impl Into<String>) -> Self {
        Self::new().with_key(key)
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }

    pub fn with_labels(mut self, labels: Vec<Option<String>>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_fields(mut self, fields: Vec<QueryField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_range(mut self, range: ItemRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Cheap change probe: newest revision only.
    pub fn latest_revision(key_filter: impl Into<String>, labels: Vec<Option<String>>) -> Self {
        Self::for_key(key_filter)
            .with_labels(labels)
            .with_range(ItemRange::first())
    }

    /// More than one label was requested, so the client must restore label priority order.
    pub fn has_multiple_labels(&self) -> bool {
        self.labels.len() > 1
    }
}
