//! Tolerant field decoders for rows coming out of the store.
//!
//! Upstream columns are loosely typed: ids may be integers or strings,
//! money may be numbers or numeric strings, flags may be booleans or words.

use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    opt_id(d)?.ok_or_else(|| D::Error::custom("missing id"))
}

pub fn opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(None),
        Value::String(s) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(D::Error::custom(format!("unsupported id value: {other}"))),
    }
}

/// Null, missing and blank amounts decode as zero.
pub fn money<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(Decimal::ZERO),
        Value::Number(n) => parse_decimal(&n.to_string()).map_err(D::Error::custom),
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if cleaned.is_empty() {
                Ok(Decimal::ZERO)
            } else {
                parse_decimal(&cleaned).map_err(D::Error::custom)
            }
        }
        other => Err(D::Error::custom(format!("unsupported amount: {other}"))),
    }
}

fn parse_decimal(text: &str) -> Result<Decimal, String> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| format!("invalid amount '{text}': {e}"))
}

/// Booleans, 0/1 and words like "paid" / "yes" / "true".
pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "t" | "yes" | "y" | "1" | "paid" | "completed" | "done" | "sent" | "collected"
        ),
        _ => false,
    })
}

/// Text columns; blank strings decode as `None`.
pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// An embedded relation that PostgREST may return as an object, a
/// one-element array, or null.
pub fn embedded<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = match Value::deserialize(d)? {
        Value::Null => return Ok(None),
        Value::Array(items) => match items.into_iter().next() {
            Some(first) => first,
            None => return Ok(None),
        },
        other => other,
    };
    serde_json::from_value(value).map(Some).map_err(D::Error::custom)
}
