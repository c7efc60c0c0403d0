use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const LOCAL_PREFIX: &str = "LOCAL:";

/// Location of a piece of file content. The string form is what gets stored
/// in course records; the `LOCAL:` prefix selects the resolution strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageReference {
    /// Direct remote URL.
    Url(String),
    /// Fully inlined encoded payload.
    Inline(String),
    /// Key into the local `file` namespace.
    Local(String),
}

impl StorageReference {
    pub fn parse(raw: &str) -> Self {
        if let Some(key) = raw.strip_prefix(LOCAL_PREFIX) {
            StorageReference::Local(key.to_string())
        } else if raw.starts_with("data:") {
            StorageReference::Inline(raw.to_string())
        } else {
            StorageReference::Url(raw.to_string())
        }
    }

    pub fn local_key(&self) -> Option<&str> {
        match self {
            StorageReference::Local(key) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for StorageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageReference::Url(url) => f.write_str(url),
            StorageReference::Inline(payload) => f.write_str(payload),
            StorageReference::Local(key) => write!(f, "{}{}", LOCAL_PREFIX, key),
        }
    }
}

impl Serialize for StorageReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StorageReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(StorageReference::parse(&raw))
    }
}
