//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the identifiers and tokens that flow through
//! the Remote Client Layer. Each newtype validates its invariant at
//! construction time instead of trusting callers to pass well-formed strings.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// A validated remote path (must start with `/`).
///
/// Represents paths in the remote's own namespace, e.g. `/Documents/file.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemotePath(String);

impl RemotePath {
    /// Create a new `RemotePath`.
    ///
    /// # Errors
    /// Returns an error if the path does not start with `/`, contains a
    /// double slash, or contains a `..` traversal segment.
    pub fn new(path: String) -> Result<Self, DomainError> {
        if !path.starts_with('/') {
            return Err(DomainError::InvalidRemotePath(format!(
                "remote path must start with '/': {path}"
            )));
        }

        if path.len() > 1 && path.contains("//") {
            return Err(DomainError::InvalidRemotePath(format!(
                "remote path contains a double slash: {path}"
            )));
        }

        if path.contains("..") {
            return Err(DomainError::InvalidRemotePath(format!(
                "remote path contains a traversal segment: {path}"
            )));
        }

        Ok(Self(path))
    }

    /// The root path, `"/"`.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a single path component onto this path.
    ///
    /// # Errors
    /// Returns an error if `component` is empty or itself contains a slash
    /// or traversal segment.
    pub fn join(&self, component: &str) -> Result<Self, DomainError> {
        if component.is_empty() || component.contains('/') || component.contains("..") {
            return Err(DomainError::InvalidRemotePath(format!(
                "invalid path component: {component}"
            )));
        }

        let new_path = if self.0 == "/" {
            format!("/{component}")
        } else {
            format!("{}/{component}", self.0)
        };

        Self::new(new_path)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0 == "/" {
            return None;
        }

        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.0 == "/" {
            return None;
        }

        self.0.rsplit('/').next()
    }
}

impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemotePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemotePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemotePath> for String {
    fn from(path: RemotePath) -> Self {
        path.0
    }
}

/// Opaque remote item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new `RemoteId`.
    ///
    /// # Errors
    /// Returns an error if `id` is empty or contains a character outside
    /// `[A-Za-z0-9!_-]`.
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "remote id cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '!' || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidRemoteId(format!(
                "remote id contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

/// The remote's two-level SHA-256 content hash: hex-lowercase, 64 characters.
///
/// See [`crate::domain::newtypes`] module docs and the hasher in
/// `meridian-remote` for the block scheme this digest represents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    const EXPECTED_LEN: usize = 64;

    /// Create a new `ContentHash`.
    ///
    /// # Errors
    /// Returns an error unless `hash` is exactly 64 lowercase hex characters.
    pub fn new(hash: String) -> Result<Self, DomainError> {
        if hash.len() != Self::EXPECTED_LEN {
            return Err(DomainError::InvalidHash(format!(
                "content hash must be {} hex characters, got {}: {hash}",
                Self::EXPECTED_LEN,
                hash.len()
            )));
        }

        if !hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
            return Err(DomainError::InvalidHash(format!(
                "content hash must be lowercase hex: {hash}"
            )));
        }

        Ok(Self(hash))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

/// An opaque server-issued cursor. Comparable only by equality, never
/// ordered, and never inspected for structure by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor(String);

impl Cursor {
    /// Create a new `Cursor`.
    ///
    /// # Errors
    /// Returns an error if `token` is empty.
    pub fn new(token: String) -> Result<Self, DomainError> {
        if token.is_empty() {
            return Err(DomainError::InvalidCursor(
                "cursor cannot be empty".to_string(),
            ));
        }

        Ok(Self(token))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cursor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for Cursor {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod remote_path_tests {
        use super::*;

        #[test]
        fn new_valid() {
            let path = RemotePath::new("/Documents/file.txt".to_string()).unwrap();
            assert_eq!(path.as_str(), "/Documents/file.txt");
        }

        #[test]
        fn root() {
            assert_eq!(RemotePath::root().as_str(), "/");
        }

        #[test]
        fn no_leading_slash_fails() {
            assert!(RemotePath::new("Documents/file.txt".to_string()).is_err());
        }

        #[test]
        fn double_slash_fails() {
            assert!(RemotePath::new("/Documents//file.txt".to_string()).is_err());
        }

        #[test]
        fn traversal_fails() {
            assert!(RemotePath::new("/Documents/../file.txt".to_string()).is_err());
        }

        #[test]
        fn join_and_parent() {
            let root = RemotePath::root();
            let docs = root.join("Documents").unwrap();
            let file = docs.join("file.txt").unwrap();
            assert_eq!(file.as_str(), "/Documents/file.txt");
            assert_eq!(file.parent().unwrap().as_str(), "/Documents");
            assert_eq!(file.file_name(), Some("file.txt"));
            assert_eq!(docs.parent().unwrap().as_str(), "/");
            assert!(root.parent().is_none());
        }

        #[test]
        fn join_rejects_traversal() {
            assert!(RemotePath::root().join("..").is_err());
            assert!(RemotePath::root().join("a/b").is_err());
        }
    }

    mod remote_id_tests {
        use super::*;

        #[test]
        fn valid_id() {
            let id = RemoteId::new("01BYE5RZ6QN3ZWBTUF".to_string()).unwrap();
            assert_eq!(id.as_str(), "01BYE5RZ6QN3ZWBTUF");
        }

        #[test]
        fn empty_fails() {
            assert!(RemoteId::new(String::new()).is_err());
        }

        #[test]
        fn invalid_chars_fail() {
            assert!(RemoteId::new("invalid@id".to_string()).is_err());
        }

        #[test]
        fn serde_roundtrip() {
            let id = RemoteId::new("ABC123".to_string()).unwrap();
            let json = serde_json::to_string(&id).unwrap();
            let parsed: RemoteId = serde_json::from_str(&json).unwrap();
            assert_eq!(id, parsed);
        }
    }

    mod content_hash_tests {
        use super::*;

        #[test]
        fn valid_hash() {
            let hex = "a".repeat(64);
            assert!(ContentHash::new(hex).is_ok());
        }

        #[test]
        fn wrong_length_fails() {
            assert!(ContentHash::new("abc".to_string()).is_err());
        }

        #[test]
        fn uppercase_fails() {
            let hex = "A".repeat(64);
            assert!(ContentHash::new(hex).is_err());
        }

        #[test]
        fn non_hex_fails() {
            let s = "z".repeat(64);
            assert!(ContentHash::new(s).is_err());
        }
    }

    mod cursor_tests {
        use super::*;

        #[test]
        fn valid_cursor() {
            let cursor = Cursor::new("opaque-token".to_string()).unwrap();
            assert_eq!(cursor.as_str(), "opaque-token");
        }

        #[test]
        fn empty_fails() {
            assert!(Cursor::new(String::new()).is_err());
        }

        #[test]
        fn equality_only() {
            let a = Cursor::new("x".to_string()).unwrap();
            let b = Cursor::new("x".to_string()).unwrap();
            let c = Cursor::new("y".to_string()).unwrap();
            assert_eq!(a, b);
            assert_ne!(a, c);
        }

        #[test]
        fn serde_roundtrip() {
            let cursor = Cursor::new("tok".to_string()).unwrap();
            let json = serde_json::to_string(&cursor).unwrap();
            let parsed: Cursor = serde_json::from_str(&json).unwrap();
            assert_eq!(cursor, parsed);
        }
    }
}
