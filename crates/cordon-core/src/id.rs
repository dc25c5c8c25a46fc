//! Opaque content identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Shortest textual identifier the parser accepts. Anything below this is
/// junk rather than an address minted by a content store.
const MIN_TEXT_LEN: usize = 8;

/// Canonical address of an object in the content store.
///
/// The identifier is opaque to this layer: it is parsed from the textual form
/// handed out by the store, compared by value, and never inspected beyond
/// that. One identifier may be reachable through many unrelated paths, which
/// is exactly why blocking acts on identifiers and not on caller-supplied
/// strings.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Parses an identifier from its canonical textual form.
    ///
    /// Accepts alphanumeric tokens, with interior dots for identifiers that
    /// were split across subdomain labels. Rejects anything too short to be a
    /// store-minted address.
    pub fn parse(text: &str) -> CoreResult<Self> {
        if text.len() < MIN_TEXT_LEN {
            return Err(CoreError::InvalidReference {
                reason: format!("identifier {:?} is too short", text),
            });
        }
        if text.starts_with('.') || text.ends_with('.') || text.contains("..") {
            return Err(CoreError::InvalidReference {
                reason: format!("identifier {:?} has misplaced label separators", text),
            });
        }
        if !text.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
            return Err(CoreError::InvalidReference {
                reason: format!("identifier {:?} contains invalid characters", text),
            });
        }
        Ok(ContentId(text.to_string()))
    }

    /// Returns the canonical textual form, used as the routing-cache key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier's raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}
