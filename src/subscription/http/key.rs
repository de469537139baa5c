use std::fmt;

/// One segment of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Str(String),
    Int(i64),
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

/// A composite cache key: a resource kind followed by its parameters.
///
/// ```
/// use blogem::subscription::http::QueryKey;
///
/// let key = QueryKey::new("posts").with(3u32);
/// assert_eq!(key.to_string(), "posts/3");
/// assert!(key.starts_with(&QueryKey::new("posts")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    parts: Vec<KeyPart>,
}

impl QueryKey {
    #[must_use]
    pub fn new(kind: impl Into<KeyPart>) -> Self {
        Self {
            parts: vec![kind.into()],
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.parts.push(part.into());
        self
    }

    #[must_use]
    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Returns `true` if `prefix` matches the leading parts of this key.
    /// Every key starts with itself.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.parts.starts_with(&prefix.parts)
    }
}

impl From<&str> for QueryKey {
    fn from(value: &str) -> Self {
        Self::new(value)
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
    fn test_display() {
        assert_eq!(QueryKey::new("comments").with(7u32).to_string(), "comments/7");
        assert_eq!(QueryKey::from("posts").to_string(), "posts");
    }

    #[test]
    fn test_prefix_matching() {
        let page = QueryKey::new("posts").with(2u32);
        assert!(page.starts_with(&QueryKey::new("posts")));
        assert!(page.starts_with(&page));
        assert!(!page.starts_with(&QueryKey::new("comments")));
        assert!(!QueryKey::new("posts").starts_with(&page));
    }

    #[test]
    fn test_int_and_str_parts_differ() {
        assert_ne!(
            QueryKey::new("posts").with(1u32),
            QueryKey::new("posts").with("1")
        );
    }
}
