//! Case-insensitive multi-value header collection.
//!
//! Names are lowercased on every operation, the original case is not kept. A name appears at
//! most once; its values keep insertion order and [`Headers::get`] returns the last one.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

/// A target the [`Headers`] collection can be merged into.
#[cfg_attr(test, mockall::automock)]
pub trait HeaderSink {
    fn set(&mut self, name: &str, value: &str);
    fn add(&mut self, name: &str, value: &str);
    fn del(&mut self, name: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    values: Vec<String>,
}

/// Ordered, case-insensitive header store of a pending response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<HeaderEntry>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, name: &str) -> Option<&HeaderEntry> {
        let name = name.to_ascii_lowercase();
        self.entries.iter().find(|entry| entry.name == name)
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut HeaderEntry> {
        let name = name.to_ascii_lowercase();
        self.entries.iter_mut().find(|entry| entry.name == name)
    }

    /// True if at least one value is stored under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|entry| !entry.values.is_empty())
    }

    /// Returns the last value added under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entry(name).and_then(|entry| entry.values.last()).map(String::as_str)
    }

    /// Returns every value stored under `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entry(name).map_or(&[][..], |entry| entry.values.as_slice())
    }

    /// Replaces all values of `name` with `value`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entry_mut(name) {
            Some(entry) => entry.values = vec![value],
            None => self.entries.push(HeaderEntry { name: name.to_ascii_lowercase(), values: vec![value] }),
        }
    }

    /// Appends `value` to the values of `name`.
    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entry_mut(name) {
            Some(entry) => entry.values.push(value),
            None => self.entries.push(HeaderEntry { name: name.to_ascii_lowercase(), values: vec![value] }),
        }
    }

    /// Removes `name` and all of its values.
    pub fn del(&mut self, name: &str) {
        let name = name.to_ascii_lowercase();
        self.entries.retain(|entry| entry.name != name);
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, values)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|entry| (entry.name.as_str(), entry.values.as_slice()))
    }

    /// Merges this collection into `target`.
    ///
    /// For every name present here the target's entry is deleted first, then a single value is
    /// written with `set` and multiple values with repeated `add`.
    pub fn copy_into<S: HeaderSink + ?Sized>(&self, target: &mut S) {
        for entry in &self.entries {
            if entry.values.is_empty() {
                continue;
            }

            target.del(&entry.name);

            if let [value] = entry.values.as_slice() {
                target.set(&entry.name, value);
                continue;
            }

            for value in &entry.values {
                target.add(&entry.name, value);
            }
        }
    }
}

impl HeaderSink for Headers {
    fn set(&mut self, name: &str, value: &str) {
        Headers::set(self, name, value);
    }

    fn add(&mut self, name: &str, value: &str) {
        Headers::add(self, name, value);
    }

    fn del(&mut self, name: &str) {
        Headers::del(self, name);
    }
}

fn to_header_pair(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    let header_name = match HeaderName::from_bytes(name.as_bytes()) {
        Ok(header_name) => header_name,
        Err(e) => {
            warn!(name, cause = %e, "skip header with invalid name");
            return None;
        }
    };

    match HeaderValue::from_str(value) {
        Ok(header_value) => Some((header_name, header_value)),
        Err(e) => {
            warn!(name, cause = %e, "skip header with invalid value");
            None
        }
    }
}

impl HeaderSink for HeaderMap {
    fn set(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = to_header_pair(name, value) {
            self.insert(name, value);
        }
    }

    fn add(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = to_header_pair(name, value) {
            self.append(name, value);
        }
    }

    fn del(&mut self, name: &str) {
        self.remove(name.to_ascii_lowercase());
    }
}
