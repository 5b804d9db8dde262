//! Ordered, validated HTTP header list

use crate::constants::{
    HEADER_INITIAL_CAPACITY, MAX_HEADERS, MAX_HEADER_NAME_LEN, MAX_HEADER_VALUE_LEN,
    MAX_WIRE_HEADER_VALUE_LEN,
};
use crate::error::{CoreError, Result};

/// Length bounds applied when headers are added
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLimits {
    pub max_name_len: usize,
    pub max_value_len: usize,
}

impl HeaderLimits {
    /// Bounds for headers typed by the user and stored in collections
    pub const REQUEST: HeaderLimits = HeaderLimits {
        max_name_len: MAX_HEADER_NAME_LEN,
        max_value_len: MAX_HEADER_VALUE_LEN,
    };

    /// Bounds for headers built at send time or received from a server
    pub const WIRE: HeaderLimits = HeaderLimits {
        max_name_len: MAX_HEADER_NAME_LEN,
        max_value_len: MAX_WIRE_HEADER_VALUE_LEN,
    };
}

impl Default for HeaderLimits {
    fn default() -> Self {
        HeaderLimits::REQUEST
    }
}

/// HTTP Header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Printable ASCII, no separators that would break the header line.
pub fn validate_name(name: &str, limits: HeaderLimits) -> bool {
    !name.is_empty()
        && name.len() <= limits.max_name_len
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && b != b':')
}

pub fn validate_value(value: &str, limits: HeaderLimits) -> bool {
    value.len() <= limits.max_value_len && !value.contains(['\r', '\n'])
}

/// Ordered header list. Duplicates are allowed; lookups are case-insensitive.
#[derive(Clone, Debug, Default)]
pub struct HeaderList {
    entries: Vec<Header>,
    limits: HeaderLimits,
}

impl PartialEq for HeaderList {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for HeaderList {}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: HeaderLimits) -> Self {
        HeaderList {
            entries: Vec::new(),
            limits,
        }
    }

    pub fn limits(&self) -> HeaderLimits {
        self.limits
    }

    /// Widen the bounds for future additions. Never narrows, so stored
    /// entries stay valid.
    pub fn widen_limits(&mut self, limits: HeaderLimits) {
        self.limits.max_name_len = self.limits.max_name_len.max(limits.max_name_len);
        self.limits.max_value_len = self.limits.max_value_len.max(limits.max_value_len);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    pub fn get_index(&self, index: usize) -> Option<&Header> {
        self.entries.get(index)
    }

    /// Append a header, returning its index.
    pub fn add(&mut self, name: &str, value: &str) -> Result<usize> {
        self.check(name, value)?;
        self.grow_if_full()?;
        self.entries.push(Header {
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(self.entries.len() - 1)
    }

    pub fn remove(&mut self, index: usize) -> Result<Header> {
        if index >= self.entries.len() {
            return Err(CoreError::invalid_index(index, self.entries.len()));
        }
        Ok(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Index of the first header with this name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// Value of the first header with this name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name).map(|i| self.entries[i].value.as_str())
    }

    /// All values for a repeated header such as `Set-Cookie`.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Replace the value of the first match, or append when absent.
    pub fn update(&mut self, name: &str, value: &str) -> Result<usize> {
        match self.find(name) {
            Some(index) => {
                if !validate_value(value, self.limits) {
                    return Err(CoreError::InvalidHeader(format!("value for {}", name)));
                }
                self.entries[index].value = value.to_string();
                Ok(index)
            }
            None => self.add(name, value),
        }
    }

    /// Remove every header with this name, returning how many were dropped.
    pub fn remove_all(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|h| !h.name.eq_ignore_ascii_case(name));
        before - self.entries.len()
    }

    fn check(&self, name: &str, value: &str) -> Result<()> {
        if !validate_name(name, self.limits) {
            return Err(CoreError::InvalidHeader(format!("name {:?}", name)));
        }
        if !validate_value(value, self.limits) {
            return Err(CoreError::InvalidHeader(format!("value for {}", name)));
        }
        Ok(())
    }

    // Doubling growth from HEADER_INITIAL_CAPACITY, capped at MAX_HEADERS.
    fn grow_if_full(&mut self) -> Result<()> {
        let len = self.entries.len();
        if len >= MAX_HEADERS {
            return Err(CoreError::InvalidSize {
                what: "header list",
                size: len + 1,
                max: MAX_HEADERS,
            });
        }
        if len < self.entries.capacity() {
            return Ok(());
        }
        let target = (self.entries.capacity() * 2)
            .max(HEADER_INITIAL_CAPACITY)
            .min(MAX_HEADERS);
        self.entries
            .try_reserve_exact(target - len)
            .map_err(|_| CoreError::MemoryAllocation("header list"))
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_find_case_insensitive() {
        let mut headers = HeaderList::new();
        let idx = headers.add("Content-Type", "application/json").unwrap();
        assert_eq!(idx, 0);
        assert_eq!(headers.find("content-type"), Some(0));
        assert_eq!(headers.find("Accept"), None);
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_rejects_invalid_names() {
        let mut headers = HeaderList::new();
        for bad in ["", "Bad Name", "Bad:Name", "Tab\tName", "Line\nBreak", "Ünicode"] {
            assert!(headers.add(bad, "v").is_err(), "accepted {:?}", bad);
        }
        let long = "X".repeat(MAX_HEADER_NAME_LEN + 1);
        assert!(headers.add(&long, "v").is_err());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut headers = HeaderList::new();
        assert!(headers.add("X-A", "a\r\nInjected: yes").is_err());
        let long = "v".repeat(MAX_HEADER_VALUE_LEN + 1);
        assert!(headers.add("X-A", &long).is_err());
        assert!(headers.add("X-A", "").is_ok());
    }

    #[test]
    fn test_update_mutates_first_match() {
        let mut headers = HeaderList::new();
        headers.add("X-Dup", "one").unwrap();
        headers.add("x-dup", "two").unwrap();
        let idx = headers.update("X-DUP", "changed").unwrap();
        assert_eq!(idx, 0);
        let values: Vec<&str> = headers.get_all("x-dup").collect();
        assert_eq!(values, vec!["changed", "two"]);

        let idx = headers.update("Accept", "*/*").unwrap();
        assert_eq!(idx, 2);
    }

    #[test]
    fn test_failed_update_leaves_value() {
        let mut headers = HeaderList::new();
        headers.add("X-A", "keep").unwrap();
        assert!(headers.update("X-A", "bad\nvalue").is_err());
        assert_eq!(headers.get("X-A"), Some("keep"));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut headers = HeaderList::new();
        headers.add("A", "1").unwrap();
        headers.add("B", "2").unwrap();
        let removed = headers.remove(0).unwrap();
        assert_eq!(removed.name, "A");
        assert_eq!(headers.find("B"), Some(0));
        assert!(headers.remove(5).is_err());
        headers.clear();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_capacity_doubles_and_is_bounded() {
        let mut headers = HeaderList::new();
        headers.add("A", "1").unwrap();
        assert!(headers.capacity() >= HEADER_INITIAL_CAPACITY);
        for i in 1..MAX_HEADERS {
            headers.add(&format!("H{}", i), "v").unwrap();
            assert!(headers.len() <= headers.capacity());
        }
        assert_eq!(headers.len(), MAX_HEADERS);
        assert!(headers.add("Overflow", "v").is_err());
        assert_eq!(headers.len(), MAX_HEADERS);
    }

    #[test]
    fn test_widen_limits_accepts_long_values() {
        let mut headers = HeaderList::new();
        let long = "c".repeat(MAX_HEADER_VALUE_LEN * 2);
        assert!(headers.add("Cookie", &long).is_err());
        headers.widen_limits(HeaderLimits::WIRE);
        assert!(headers.add("Cookie", &long).is_ok());
    }

    #[test]
    fn test_remove_all_by_name() {
        let mut headers = HeaderList::new();
        headers.add("Authorization", "a").unwrap();
        headers.add("Accept", "*/*").unwrap();
        headers.add("authorization", "b").unwrap();
        assert_eq!(headers.remove_all("AUTHORIZATION"), 2);
        assert_eq!(headers.len(), 1);
    }
}
