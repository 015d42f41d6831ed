//! Case-insensitive header multi-map and typed header views.
//!
//! Header names are folded to lowercase on insertion. A name maps to one or
//! more values; the insertion order of values for the same name is
//! preserved, as is the insertion order of names themselves. Lookups are a
//! linear scan, which beats hashing for the header counts real requests
//! carry.

use std::fmt;
use std::slice;

pub mod cookie;
pub mod typed;

pub use self::cookie::{Cookie, SetCookie};
pub use self::typed::{AcceptEncoding, ContentRange, ContentType, Range, TokenList};

/// A multi-map of HTTP headers.
#[derive(Clone, Default, PartialEq)]
pub struct HeaderMap {
    entries: Vec<Entry>,
}

#[derive(Clone, Debug, PartialEq)]
struct Entry {
    name: String,
    values: Vec<String>,
}

impl HeaderMap {
    /// Creates an empty map.
    pub fn new() -> HeaderMap {
        HeaderMap::default()
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Appends a value, keeping any values already present for the name.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entry_mut(name) {
            Some(e) => e.values.push(value),
            None => self.entries.push(Entry {
                name: name.to_ascii_lowercase(),
                values: vec![value],
            }),
        }
    }

    /// Sets a value, replacing all values already present for the name.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entry_mut(name) {
            Some(e) => {
                e.values.clear();
                e.values.push(value);
            }
            None => self.entries.push(Entry {
                name: name.to_ascii_lowercase(),
                values: vec![value],
            }),
        }
    }

    /// The first value for a name, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_index(name, 0)
    }

    /// The value at `index` among the values for a name.
    pub fn get_index(&self, name: &str, index: usize) -> Option<&str> {
        self.entry(name)
            .and_then(|e| e.values.get(index))
            .map(|v| v.as_str())
    }

    /// All values for a name, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entry(name).map(|e| &e.values[..]).unwrap_or(&[])
    }

    /// Whether any value exists for the name.
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Removes all values for a name; returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !e.name.eq_ignore_ascii_case(name));
        self.entries.len() != before
    }

    /// The number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no headers at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every header.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates `(name, value)` pairs; a name with several values yields
    /// one pair per value, in order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            entries: self.entries.iter(),
            current: None,
        }
    }

    /// Decodes a typed view over this map.
    ///
    /// `Ok(None)` means the header is absent; a present but malformed value
    /// is a header-value syntax error.
    pub fn typed_get<T: typed::TypedHeader>(&self) -> crate::Result<Option<T>> {
        match self.get(T::NAME) {
            Some(raw) => T::parse(raw).map(Some),
            None => Ok(None),
        }
    }
}

/// Iterator over `(name, value)` pairs of a [`HeaderMap`].
#[derive(Debug)]
pub struct Iter<'a> {
    entries: slice::Iter<'a, Entry>,
    current: Option<(&'a str, slice::Iter<'a, String>)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<(&'a str, &'a str)> {
        loop {
            if let Some((name, values)) = self.current.as_mut() {
                if let Some(value) = values.next() {
                    return Some((*name, value.as_str()));
                }
            }
            let entry = self.entries.next()?;
            self.current = Some((entry.name.as_str(), entry.values.iter()));
        }
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl fmt::Debug for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (&e.name, &e.values)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::HeaderMap;

    #[test]
    fn names_fold_to_lowercase() {
        let mut map = HeaderMap::new();
        map.append("Content-Type", "text/plain");
        assert_eq!(map.get("content-type"), Some("text/plain"));
        assert_eq!(map.get("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(map.iter().next(), Some(("content-type", "text/plain")));
    }

    #[test]
    fn append_preserves_value_order() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", "a=1");
        map.append("Set-Cookie", "b=2");
        map.append("set-cookie", "c=3");
        assert_eq!(map.get_all("set-cookie"), &["a=1", "b=2", "c=3"]);
        assert_eq!(map.get_index("set-cookie", 1), Some("b=2"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn set_replaces_all_values() {
        let mut map = HeaderMap::new();
        map.append("x-probe", "1");
        map.append("x-probe", "2");
        map.set("X-Probe", "3");
        assert_eq!(map.get_all("x-probe"), &["3"]);
    }

    #[test]
    fn iteration_is_insertion_ordered() {
        let mut map = HeaderMap::new();
        map.append("host", "example.test");
        map.append("accept", "text/html");
        map.append("accept", "text/plain");
        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("host", "example.test"),
                ("accept", "text/html"),
                ("accept", "text/plain"),
            ]
        );
    }

    #[test]
    fn remove_and_clear() {
        let mut map = HeaderMap::new();
        map.append("a", "1");
        map.append("b", "2");
        assert!(map.remove("A"));
        assert!(!map.remove("a"));
        assert_eq!(map.len(), 1);
        map.clear();
        assert!(map.is_empty());
    }
}
