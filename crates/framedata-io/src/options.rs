//! Typed access to option maps.
//!
//! Readers and writers pull the keys they understand through an
//! `OptionReader`; `finish` then rejects anything left over, so a typo in a
//! catalog entry fails loudly instead of being ignored.

use std::collections::BTreeSet;

use framedata_core::options::OptionMap;
use serde_json::Value;

use crate::error::{Error, Result};

pub struct OptionReader<'a> {
    context: String,
    map: &'a OptionMap,
    seen: BTreeSet<&'a str>,
}

impl<'a> OptionReader<'a> {
    /// `context` names the consumer in error messages, e.g. `"csv load"`.
    pub fn new(context: impl Into<String>, map: &'a OptionMap) -> Self {
        Self {
            context: context.into(),
            map,
            seen: BTreeSet::new(),
        }
    }

    fn take(&mut self, key: &str) -> Option<&'a Value> {
        let (k, v) = self.map.get_key_value(key)?;
        self.seen.insert(k.as_str());
        Some(v)
    }

    fn invalid(&self, key: &str, expected: &str, got: &Value) -> Error {
        Error::Options(format!(
            "{} option '{}' expects {}, got {}",
            self.context, key, expected, got
        ))
    }

    pub fn bool(&mut self, key: &str) -> Result<Option<bool>> {
        match self.take(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.invalid(key, "a boolean", other)),
        }
    }

    pub fn usize(&mut self, key: &str) -> Result<Option<usize>> {
        match self.take(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v @ Value::Number(n)) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a non-negative integer", v)),
            Some(other) => Err(self.invalid(key, "a non-negative integer", other)),
        }
    }

    pub fn i64(&mut self, key: &str) -> Result<Option<i64>> {
        match self.take(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v @ Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "an integer", v)),
            Some(other) => Err(self.invalid(key, "an integer", other)),
        }
    }

    /// Distinguishes an absent key (`None`) from an explicit `null`
    /// (`Some(None)`).
    pub fn nullable_usize(&mut self, key: &str) -> Result<Option<Option<usize>>> {
        match self.take(key) {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(None)),
            Some(v @ Value::Number(n)) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(|n| Some(Some(n)))
                .ok_or_else(|| self.invalid(key, "a non-negative integer or null", v)),
            Some(other) => Err(self.invalid(key, "a non-negative integer or null", other)),
        }
    }

    pub fn string(&mut self, key: &str) -> Result<Option<String>> {
        match self.take(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.invalid(key, "a string", other)),
        }
    }

    /// A one-character ASCII string, returned as its byte.
    pub fn byte(&mut self, key: &str) -> Result<Option<u8>> {
        match self.take(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v @ Value::String(s)) => match s.as_bytes() {
                [b] if b.is_ascii() => Ok(Some(*b)),
                _ => Err(self.invalid(key, "a single ASCII character", v)),
            },
            Some(other) => Err(self.invalid(key, "a single ASCII character", other)),
        }
    }

    pub fn strings(&mut self, key: &str) -> Result<Option<Vec<String>>> {
        match self.take(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v @ Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a list of strings", v)),
            Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
            Some(other) => Err(self.invalid(key, "a list of strings", other)),
        }
    }

    /// Reject keys nobody asked for.
    pub fn finish(self) -> Result<()> {
        let unknown: Vec<&str> = self
            .map
            .keys()
            .map(String::as_str)
            .filter(|k| !self.seen.contains(k))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(Error::Options(format!(
                "unexpected {} option(s): {}",
                self.context,
                unknown
                    .iter()
                    .map(|k| format!("'{}'", k))
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }
}
