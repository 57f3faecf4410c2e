//! Query strings and `application/x-www-form-urlencoded` bodies.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::decode_form_component;

/// A parameter value: a single string, or a list when the key repeats or ends in `[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    Multi(Vec<String>),
}

impl QueryValue {
    /// The single value, or the first of a list.
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Single(value) => Some(value),
            QueryValue::Multi(values) => values.first().map(String::as_str),
        }
    }

    pub fn as_slice(&self) -> &[String] {
        match self {
            QueryValue::Single(value) => std::slice::from_ref(value),
            QueryValue::Multi(values) => values,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, QueryValue::Multi(_))
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(first) => *self = QueryValue::Multi(vec![std::mem::take(first), value]),
            QueryValue::Multi(values) => values.push(value),
        }
    }

    fn into_multi(self) -> Vec<String> {
        match self {
            QueryValue::Single(value) => vec![value],
            QueryValue::Multi(values) => values,
        }
    }
}

/// Decoded parameters keyed by name, `[]` suffixes removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap {
    inner: HashMap<String, QueryValue>,
}

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.inner.get(key)
    }

    /// Shortcut for the first value of `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner.get(key).and_then(QueryValue::first)
    }

    /// Every value of `key`, empty when absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.inner.get(key).map_or(&[][..], QueryValue::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.inner.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Adds one decoded pair. A key ending in `[]` forces a list, a repeated key is
    /// promoted to a list. Empty keys are ignored.
    pub fn insert(&mut self, key: &str, value: String) {
        let (key, force_list) = match key.strip_suffix("[]") {
            Some(key) => (key, true),
            None => (key, false),
        };
        if key.is_empty() {
            return;
        }

        match self.inner.entry(key.to_string()) {
            Entry::Occupied(mut entry) => entry.get_mut().push(value),
            Entry::Vacant(entry) => {
                entry.insert(if force_list { QueryValue::Multi(vec![value]) } else { QueryValue::Single(value) });
            }
        }
    }

    /// Merges `other` into this map with the same promotion rules, values of `other`
    /// come after the existing ones.
    pub fn merge(&mut self, other: QueryMap) {
        for (key, value) in other.inner {
            match self.inner.entry(key) {
                Entry::Occupied(mut entry) => match value {
                    QueryValue::Single(value) => entry.get_mut().push(value),
                    QueryValue::Multi(values) => {
                        let existing = entry.get_mut();
                        for value in values {
                            existing.push(value);
                        }
                    }
                },
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
    }

    pub fn into_inner(self) -> HashMap<String, Vec<String>> {
        self.inner.into_iter().map(|(key, value)| (key, value.into_multi())).collect()
    }
}

/// Parses `a=1&b=2` pairs. The first `=` splits key from value, a pair without one
/// has an empty value. Keys and values are form-decoded.
pub fn parse(input: &str) -> QueryMap {
    let mut map = QueryMap::new();
    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        map.insert(&decode_form_component(key), decode_form_component(value));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multi(values: &[&str]) -> QueryValue {
        QueryValue::Multi(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn promote_repeated_and_bracket_keys() {
        let map = parse("a=1&a=2&b[]=x");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&multi(&["1", "2"])));
        assert_eq!(map.get("b"), Some(&multi(&["x"])));
    }

    #[test]
    fn decode_pairs() {
        let map = parse("name=John+Doe&city=S%C3%A3o%20Paulo&expr=1%2B1=2&flag&=orphan&&");
        assert_eq!(map.get_str("name"), Some("John Doe"));
        assert_eq!(map.get_str("city"), Some("São Paulo"));
        assert_eq!(map.get_str("expr"), Some("1+1=2"));
        assert_eq!(map.get_str("flag"), Some(""));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn bracket_key_after_scalar() {
        let map = parse("tag=a&tag[]=b&tag=c");
        assert_eq!(map.get_all("tag"), &["a", "b", "c"]);
        assert!(map.get_all("missing").is_empty());
    }

    #[test]
    fn merge_post_into_get() {
        let mut get = parse("page=1&tag=a");
        get.merge(parse("tag=b&ids[]=7&title=x"));

        assert_eq!(get.get("page"), Some(&QueryValue::Single("1".to_string())));
        assert_eq!(get.get("tag"), Some(&multi(&["a", "b"])));
        assert_eq!(get.get("ids"), Some(&multi(&["7"])));
        assert_eq!(get.get_str("title"), Some("x"));
    }
}
