//! Parse-or-default handling for JSON stored in text columns.
//!
//! Bonus drop lists, recipe requirements and item templates arrive as raw
//! JSON strings. Parsing returns a typed [`Result`]; callers that can carry
//! on with an empty value pass it through [`or_default_logged`], which
//! emits a `warn!` and substitutes [`Default::default`].

use core::fmt::Display;

use serde::de::DeserializeOwned;

/// Parse an optional JSON text field.
///
/// A missing or blank field yields `T::default()`; malformed JSON is an
/// error.
pub fn parse_optional<T>(raw: Option<&str>) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned + Default,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(text) => serde_json::from_str(text),
    }
}

/// Unwrap `result`, or log the failure and fall back to the default value.
pub fn or_default_logged<T, E>(result: Result<T, E>, context: &str) -> T
where
    T: Default,
    E: Display,
{
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(context, error = %e, "Ignoring malformed stored JSON");
            T::default()
        }
    }
}
