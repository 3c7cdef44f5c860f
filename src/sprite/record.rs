//! Flexible multi-valued record

use crate::error::{Error, Result};
use crate::model::{FromValue, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Options for [`Sprite::join_values_of`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOptions {
    pub separator: String,
    pub prefix: String,
    pub postfix: String,
    /// Join at most this many values
    pub limit: Option<usize>,
    /// Appended after the last joined value when `limit` cut the list
    pub truncated: String,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            separator: ", ".to_string(),
            prefix: String::new(),
            postfix: String::new(),
            limit: None,
            truncated: "...".to_string(),
        }
    }
}

impl JoinOptions {
    pub fn separator(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_affixes(mut self, prefix: impl Into<String>, postfix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.postfix = postfix.into();
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize, truncated: impl Into<String>) -> Self {
        self.limit = Some(limit);
        self.truncated = truncated.into();
        self
    }
}

/// Ordered multi-valued record used for bulk ingestion.
///
/// Each field holds its values in insertion order. Nulls and blank strings
/// never get in. Two sprites are equal when they hold the same values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sprite {
    data: BTreeMap<String, Vec<Value>>,
}

impl Sprite {
    pub fn new() -> Self {
        Self::default()
    }

    /// By-value variant of [`add`](Self::add) for building sprites inline
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(field, value);
        self
    }

    fn push(&mut self, field: &str, value: Value) {
        if value.is_blank() {
            return;
        }
        match self.data.get_mut(field) {
            Some(values) => values.push(value),
            None => {
                self.data.insert(field.to_string(), vec![value]);
            }
        }
    }

    // ========================================================================
    // Adding
    // ========================================================================

    /// Append a value; lists are flattened one level
    pub fn add(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let field = field.into();
        match value.into() {
            Value::List(items) => {
                for item in items {
                    self.push(&field, item);
                }
            }
            other => self.push(&field, other),
        }
        self
    }

    pub fn add_all<I, V>(&mut self, field: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let field = field.into();
        for value in values {
            self.add(field.as_str(), value);
        }
        self
    }

    /// Append a value unless the field already holds it
    pub fn add_if_not_exists(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let field = field.into();
        let candidates = match value.into() {
            Value::List(items) => items,
            other => vec![other],
        };
        for candidate in candidates {
            if !self.has_value(&field, &candidate) {
                self.push(&field, candidate);
            }
        }
        self
    }

    pub fn add_all_if_not_exists<I, V>(&mut self, field: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let field = field.into();
        for value in values {
            self.add_if_not_exists(field.as_str(), value);
        }
        self
    }

    /// Add every entry of an external key/value mapping
    pub fn load<I, K, V>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (field, value) in entries {
            self.add(field, value);
        }
        self
    }

    // ========================================================================
    // Removing and moving
    // ========================================================================

    /// Drop a field with all its values
    pub fn remove(&mut self, field: &str) -> &mut Self {
        self.data.remove(field);
        self
    }

    /// Drop one occurrence of a value from a field
    pub fn remove_value(&mut self, field: &str, value: &Value) -> &mut Self {
        if let Some(values) = self.data.get_mut(field) {
            if let Some(pos) = values.iter().position(|v| v == value) {
                values.remove(pos);
            }
            if values.is_empty() {
                self.data.remove(field);
            }
        }
        self
    }

    /// Drop every field whose name matches
    pub fn remove_matching(&mut self, pattern: &Regex) -> &mut Self {
        self.data.retain(|field, _| !pattern.is_match(field));
        self
    }

    /// Move `from`'s values onto the end of `to`; absent `from` is a no-op
    pub fn rename(&mut self, from: &str, to: impl Into<String>) -> &mut Self {
        let to = to.into();
        if from == to {
            return self;
        }
        if let Some(values) = self.data.remove(from) {
            self.data.entry(to).or_default().extend(values);
        }
        self
    }

    /// Rename every matching field with `rename`
    pub fn rename_matching<F>(&mut self, pattern: &Regex, rename: F) -> &mut Self
    where
        F: Fn(&str) -> String,
    {
        for field in self.fields_matching(pattern) {
            let target = rename(&field);
            self.rename(&field, target);
        }
        self
    }

    /// Append `from`'s values onto `to`, keeping `from`
    pub fn copy(&mut self, from: &str, to: impl Into<String>) -> &mut Self {
        if let Some(values) = self.data.get(from).cloned() {
            self.data.entry(to.into()).or_default().extend(values);
        }
        self
    }

    // ========================================================================
    // Transforming
    // ========================================================================

    /// Replace every value of `field` with `f(value)`, keeping order
    pub fn apply<F>(&mut self, field: &str, f: F) -> &mut Self
    where
        F: Fn(&Value) -> Value,
    {
        if let Some(values) = self.data.remove(field) {
            for value in &values {
                self.push(field, f(value));
            }
        }
        self
    }

    pub fn apply_matching<F>(&mut self, pattern: &Regex, f: F) -> &mut Self
    where
        F: Fn(&Value) -> Value,
    {
        for field in self.fields_matching(pattern) {
            self.apply(&field, &f);
        }
        self
    }

    /// Write `f(value)` for every value of `from` onto `to`, keeping `from`
    pub fn apply_to<F>(&mut self, from: &str, f: F, to: impl Into<String>) -> &mut Self
    where
        F: Fn(&Value) -> Value,
    {
        let to = to.into();
        let mapped: Vec<Value> = self
            .data
            .get(from)
            .map(|values| values.iter().map(&f).collect())
            .unwrap_or_default();
        for value in mapped {
            self.push(&to, value);
        }
        self
    }

    /// Split string values on `separator`, trimming parts and dropping empty ones.
    /// The parts replace the field's values.
    pub fn split_values(&mut self, field: &str, separator: &str) -> &mut Self {
        if let Some(values) = self.data.remove(field) {
            for value in values {
                let text = value.to_string();
                for part in text.split(separator) {
                    self.push(field, Value::from(part.trim()));
                }
            }
        }
        self
    }

    /// Replace the field's values with a single joined string
    pub fn join_values_of(&mut self, field: &str, options: &JoinOptions) -> &mut Self {
        let Some(values) = self.data.remove(field) else {
            return self;
        };

        let take = options.limit.unwrap_or(values.len()).min(values.len());
        let mut joined = options.prefix.clone();
        joined.push_str(
            &values[..take]
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(&options.separator),
        );
        if take < values.len() {
            joined.push_str(&options.separator);
            joined.push_str(&options.truncated);
        }
        joined.push_str(&options.postfix);

        self.push(field, Value::String(joined));
        self
    }

    pub fn join_values(&mut self, field: &str, separator: &str) -> &mut Self {
        self.join_values_of(field, &JoinOptions::separator(separator))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn fields(&self) -> BTreeSet<String> {
        self.data.keys().cloned().collect()
    }

    pub fn fields_matching(&self, pattern: &Regex) -> BTreeSet<String> {
        self.data
            .keys()
            .filter(|field| pattern.is_match(field))
            .cloned()
            .collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    pub fn has_value(&self, field: &str, value: &Value) -> bool {
        self.data.get(field).is_some_and(|values| values.contains(value))
    }

    pub fn has_not_value(&self, field: &str, value: &Value) -> bool {
        !self.has_value(field, value)
    }

    pub fn is_multi_value(&self, field: &str) -> bool {
        self.size_of(field) > 1
    }

    pub fn is_single_value(&self, field: &str) -> bool {
        self.size_of(field) == 1
    }

    pub fn size_of(&self, field: &str) -> usize {
        self.data.get(field).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // ========================================================================
    // Reading
    // ========================================================================

    fn first(&self, field: &str) -> Result<&Value> {
        self.data
            .get(field)
            .and_then(|values| values.first())
            .ok_or_else(|| Error::no_such_field(field))
    }

    /// First value as a string
    pub fn value_of(&self, field: &str) -> Result<String> {
        self.first(field).map(ToString::to_string)
    }

    /// First value converted to `T`
    pub fn raw_value_of<T: FromValue>(&self, field: &str) -> Result<T> {
        let value = self.first(field)?;
        T::from_value(value).ok_or_else(|| Error::ValueType {
            field: field.to_string(),
            expected: T::EXPECTED,
        })
    }

    /// All values as strings; empty when the field is absent
    pub fn values_of(&self, field: &str) -> Vec<String> {
        self.data
            .get(field)
            .map(|values| values.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    /// Values of every matching field, fields in name order
    pub fn values_matching(&self, pattern: &Regex) -> Vec<String> {
        self.data
            .iter()
            .filter(|(field, _)| pattern.is_match(field))
            .flat_map(|(_, values)| values.iter().map(ToString::to_string))
            .collect()
    }

    pub fn raw_values_of<T: FromValue>(&self, field: &str) -> Result<Vec<T>> {
        let values = self.data.get(field).ok_or_else(|| Error::no_such_field(field))?;
        values
            .iter()
            .map(|value| {
                T::from_value(value).ok_or_else(|| Error::ValueType {
                    field: field.to_string(),
                    expected: T::EXPECTED,
                })
            })
            .collect()
    }

    /// First value of every field (lossy)
    pub fn as_map(&self) -> BTreeMap<String, Value> {
        self.data
            .iter()
            .filter_map(|(field, values)| values.first().map(|v| (field.clone(), v.clone())))
            .collect()
    }

    /// First value of every field, as strings (lossy)
    pub fn as_string_map(&self) -> BTreeMap<String, String> {
        self.data
            .iter()
            .filter_map(|(field, values)| values.first().map(|v| (field.clone(), v.to_string())))
            .collect()
    }

    pub fn as_multimap(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.data
    }

    /// Every (field, value) pair
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data
            .iter()
            .flat_map(|(field, values)| values.iter().map(move |v| (field.as_str(), v)))
    }
}

impl fmt::Display for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sprite{")?;
        for (i, (field, values)) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
            write!(f, "{field}=[{}]", rendered.join(", "))?;
        }
        f.write_str("}")
    }
}
