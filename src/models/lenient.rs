// Field-level leniency for event payloads

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Deserialize a field, falling back to its default when the value has the wrong type.
/// Use with `#[serde(deserialize_with = "lenient")]` on a `#[serde(default)]` struct so that
/// missing fields default as well.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}
