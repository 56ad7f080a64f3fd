// ── Structured query keys ──
//
// A key is an ordered list of segments, e.g. `requests/detail/7`. Any
// prefix of a key names a family; invalidation matches by prefix.

use std::fmt;

/// One key segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Text(String),
    Id(u64),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for KeyPart {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<u64> for KeyPart {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl From<u32> for KeyPart {
    fn from(id: u32) -> Self {
        Self::Id(u64::from(id))
    }
}

/// Structured cache key. Keys are equal iff their segments are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    parts: Vec<KeyPart>,
}

impl QueryKey {
    /// The empty key: a prefix of every key.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(first: impl Into<KeyPart>) -> Self {
        Self {
            parts: vec![first.into()],
        }
    }

    /// Extend with one more segment.
    #[must_use]
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.parts.push(part.into());
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// `self` belongs to the family named by `prefix`.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.parts.starts_with(&prefix.parts)
    }
}

impl<P: Into<KeyPart>> FromIterator<P> for QueryKey {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matching() {
        let detail = QueryKey::new("requests").with("detail").with(7_u64);
        let family = QueryKey::new("requests");
        let other = QueryKey::new("requests-archive");

        assert!(detail.starts_with(&family));
        assert!(detail.starts_with(&detail));
        assert!(detail.starts_with(&QueryKey::root()));
        assert!(!family.starts_with(&detail));
        assert!(!other.starts_with(&family));
    }

    #[test]
    fn id_and_text_segments_differ() {
        let by_id = QueryKey::new("orders").with(7_u64);
        let by_text = QueryKey::new("orders").with("7");
        assert_ne!(by_id, by_text);
        assert_eq!(by_id.to_string(), by_text.to_string());
    }

    #[test]
    fn display_joins_with_slash() {
        let key: QueryKey = ["chats", "messages", "c-19"].into_iter().collect();
        assert_eq!(key.to_string(), "chats/messages/c-19");
        assert_eq!(key.len(), 3);
    }
}
