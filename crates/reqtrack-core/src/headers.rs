//! Header storage and URL query helpers
//!
//! Header names are matched case-insensitively and keep their first-seen
//! spelling and insertion order.

/// Ordered, case-insensitive header map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }

    /// Value of `name`, if set
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    /// Set `name` to `value`, overwriting any previous value
    pub fn set(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(idx) => self.entries[idx].1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    /// Append `value` to `name` with a `", "` delimiter
    ///
    /// Behaves like [`set`](Self::set) when the header is unset or empty.
    pub fn append(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(idx) if !self.entries[idx].1.is_empty() => {
                let existing = &mut self.entries[idx].1;
                existing.push_str(", ");
                existing.push_str(value);
            }
            _ => self.set(name, value),
        }
    }

    /// Remove `name`, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    /// All headers as `"Name: Value"` lines, in insertion order
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.set(&name.into(), &value.into());
        }
        map
    }
}

/// Look up `name` in the `?key=value&key=value` part of `url`
///
/// Returns `None` when the URL has no query, the parameter is absent, or
/// its value is malformed (no `=`, bad percent escape, invalid UTF-8).
/// A `#fragment` is ignored. Values are percent-decoded.
pub fn url_parameter(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .find_map(|pair| match pair.split_once('=') {
            Some((key, value)) if key == name => Some(percent_decode(value)),
            _ => None,
        })
        .flatten()
}

fn percent_decode(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3)?;
                // from_str_radix alone would accept a leading sign
                if !hex.iter().all(u8::is_ascii_hexdigit) {
                    return None;
                }
                let hex = std::str::from_utf8(hex).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}
