//! Field deserializers for ids that clients send either as numbers or strings

use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(i64),
}

/// `"42"` and `42` both become `Some("42")`; blank strings become `None`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(StringOrNumber::Number(n)) => Some(n.to_string()),
        None => None,
    })
}

/// `"7"` and `7` both become `Some(7)`.
pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::Number(n)) => i32::try_from(n).map(Some).map_err(D::Error::custom),
        Some(StringOrNumber::String(s)) if s.trim().is_empty() => Ok(None),
        Some(StringOrNumber::String(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
        None => Ok(None),
    }
}
