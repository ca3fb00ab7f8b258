//! Query-string plumbing for dashboard URLs.
//!
//! [`QueryParams`] is an ordered list of decoded `(key, value)` pairs.
//! Parsing never fails: malformed escapes pass through literally and invalid
//! UTF-8 is replaced, so a consumer can always read whatever a navigation
//! handed it. Repeated keys are kept, but lookups return the first one.

use std::borrow::Cow;
use std::fmt;

/// Ordered, decoded URL query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string.
    ///
    /// Accepts a bare query (`a=1&b=2`), a query with a leading `?`, or a
    /// full URL / path (`https://host/p?a=1`, `/projects/7?a=1`). Anything
    /// after a `#` is ignored. Keys and values are taken verbatim, surrounding
    /// whitespace included.
    pub fn parse(input: &str) -> Self {
        let query = strip_location(input);
        let query = query.split_once('#').map_or(query, |(q, _)| q);

        let pairs = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();

        Self { pairs }
    }

    /// Value of the first occurrence of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `key` occurs at least once.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Append a pair, keeping insertion order.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Number of pairs, repeats included.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize to `k=v&k=v`, percent-encoding keys and values.
    pub fn to_query_string(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.pairs {
            if !out.is_empty() {
                out.push('&');
            }
            out.push_str(&urlencoding::encode(key));
            out.push('=');
            out.push_str(&urlencoding::encode(value));
        }
        out
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Drop a leading `?`, or the URL/path in front of the query.
///
/// A `?` only separates a location when the text before it looks like one
/// (no `=` or `&`), so a bare query whose value contains a raw `?` survives.
fn strip_location(input: &str) -> &str {
    if let Some(rest) = input.strip_prefix('?') {
        return rest;
    }
    match input.split_once('?') {
        Some((location, query)) if !location.contains(['=', '&']) => query,
        _ => input,
    }
}

fn decode_component(raw: &str) -> String {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };

    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => {
            String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
        }
    }
}
