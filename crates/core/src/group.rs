//! Order-preserving grouping of sequences into keyed buckets.
//!
//! Two entry points cover the two ways callers select a key:
//! - [`group_by`] derives the key with a closure
//! - [`group_by_field`] reads a named field through [`FieldAccess`] and fails on records that
//!   lack it
//!
//! [`group_json_by_field`] is the untyped variant used for raw backend payloads.
//!
//! Bucket identity is the key's string form. Keys that render the same collide, so `1` and
//! `"1"` share a bucket. Callers that need typed keys should group with a closure returning a
//! distinguishing string.

use crate::{CoreError, CoreResult};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt::Display;

/// Buckets of items keyed by stringified key.
///
/// Keys iterate in first-seen order; items within a bucket keep their input order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Groups<T> {
    buckets: IndexMap<String, Vec<T>>,
}

impl<T> Default for Groups<T> {
    fn default() -> Self {
        Self {
            buckets: IndexMap::new(),
        }
    }
}

impl<T> Groups<T> {
    fn push(&mut self, key: String, item: T) {
        self.buckets.entry(key).or_default().push(item);
    }

    /// Returns the bucket for `key`, if any item produced it.
    pub fn get(&self, key: &str) -> Option<&[T]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Moves the items out of the bucket for `key`, leaving it empty.
    ///
    /// Key order is unchanged. Returns an empty vector for unknown keys.
    pub fn take_bucket(&mut self, key: &str) -> Vec<T> {
        self.buckets
            .get_mut(key)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.buckets
            .iter()
            .map(|(key, items)| (key.as_str(), items.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Concatenates every bucket in key order.
    pub fn into_items(self) -> Vec<T> {
        self.buckets.into_values().flatten().collect()
    }
}

impl<T> IntoIterator for Groups<T> {
    type Item = (String, Vec<T>);
    type IntoIter = indexmap::map::IntoIter<String, Vec<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.into_iter()
    }
}

/// Partitions `items` by the key `key` derives for each one.
///
/// The key is converted with [`Display`], so distinct typed keys with the same rendering end up
/// in the same bucket.
pub fn group_by<I, K, F>(items: I, mut key: F) -> Groups<I::Item>
where
    I: IntoIterator,
    F: FnMut(&I::Item) -> K,
    K: Display,
{
    let mut groups = Groups::default();
    for item in items {
        let bucket = key(&item).to_string();
        groups.push(bucket, item);
    }
    groups
}

/// Read access to a record's fields by name.
///
/// Returns `None` when the record has no such field. A field that is present but empty (for
/// example JSON `null`) still yields a key.
pub trait FieldAccess {
    fn field(&self, name: &str) -> Option<String>;
}

impl<T: FieldAccess + ?Sized> FieldAccess for &T {
    fn field(&self, name: &str) -> Option<String> {
        (**self).field(name)
    }
}

impl FieldAccess for Value {
    fn field(&self, name: &str) -> Option<String> {
        match self {
            Value::Object(members) => members.get(name).map(json_key),
            _ => None,
        }
    }
}

fn json_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Partitions `items` by the value of the field called `field`.
///
/// # Errors
///
/// Returns [`CoreError::MissingKey`] for the first item that lacks the field. Nothing is
/// returned for the items grouped before it.
pub fn group_by_field<I>(items: I, field: &str) -> CoreResult<Groups<I::Item>>
where
    I: IntoIterator,
    I::Item: FieldAccess,
{
    let mut groups = Groups::default();
    for (index, item) in items.into_iter().enumerate() {
        let key = item.field(field).ok_or_else(|| CoreError::MissingKey {
            field: field.to_owned(),
            index,
        })?;
        groups.push(key, item);
    }
    Ok(groups)
}

/// Groups the elements of a JSON array by one of their members.
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if `value` is not an array, and
/// [`CoreError::MissingKey`] if an element lacks `field`.
pub fn group_json_by_field<'a>(value: &'a Value, field: &str) -> CoreResult<Groups<&'a Value>> {
    let items = value.as_array().ok_or_else(|| {
        CoreError::InvalidArgument(format!(
            "expected a JSON array to group, found {}",
            json_kind(value)
        ))
    })?;
    group_by_field(items, field)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
