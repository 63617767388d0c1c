//! Structured payload types carried in `value` and `aux`

use std::collections::BTreeMap;

/// Arbitrary protocol payload: null, bool, number, string, list or mapping
pub use serde_json::Value;

/// Mapping from text key to payload; insertion order is irrelevant
pub type Aux = BTreeMap<String, Value>;

/// Build an [`Aux`] mapping from key/value pairs
pub fn aux<K, V, I>(entries: I) -> Aux
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
