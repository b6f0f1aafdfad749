/// A published `(key?, value)` pair.
///
/// Shared out of the queue as `Arc<Item>`; holders may read it after it has
/// left the queue, for as long as they keep their clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: Option<String>,
    pub value: String,
}

impl Item {
    pub fn new(key: Option<String>, value: String) -> Self {
        Self { key, value }
    }

    /// Whether this item satisfies a consumer's key filter.
    ///
    /// No filter matches any item; a filter matches only items whose own
    /// key is present and equal ignoring ASCII case. An unkeyed item never
    /// satisfies a keyed filter.
    pub fn matches(&self, filter: Option<&str>) -> bool {
        match filter {
            None => true,
            Some(f) => self
                .key
                .as_deref()
                .is_some_and(|k| k.eq_ignore_ascii_case(f)),
        }
    }
}
