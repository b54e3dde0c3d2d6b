use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::CoreError;

/// Characters the realtime store refuses inside a single path segment.
const FORBIDDEN: [char; 6] = ['/', '.', '#', '$', '[', ']'];

pub(crate) fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.chars().any(|c| FORBIDDEN.contains(&c) || c.is_control())
}

/// Store-assigned key of a document. Keys that already exist in the store are
/// accepted as-is; new ones come from [`Key::generate`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Time-ordered key, so documents created later sort after earlier ones.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        if is_valid_segment(&raw) {
            Ok(Self(raw))
        } else {
            Err(CoreError::InvalidKey(raw))
        }
    }

    pub(crate) fn from_segment(segment: &str) -> Self {
        Self(segment.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Key {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short: String = self.0.chars().take(8).collect();
        write!(f, "Key({short})")
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
