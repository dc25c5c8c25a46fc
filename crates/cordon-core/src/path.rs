//! Content and name path forms.
//!
//! Two addressing schemes reach this layer: content paths (`/ipfs/...`),
//! which address immutable objects directly, and name paths (`/ipns/...`),
//! which address a mutable name that resolves to a content identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// The addressing scheme a path uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathScheme {
    /// Immutable content addressing (`/ipfs`).
    Content,
    /// Mutable name addressing (`/ipns`).
    Name,
}

impl PathScheme {
    /// The path prefix for this scheme, without a trailing slash.
    pub fn prefix(&self) -> &'static str {
        match self {
            PathScheme::Content => "/ipfs",
            PathScheme::Name => "/ipns",
        }
    }

    /// The bare keyword used in subdomain-gateway hostnames.
    pub fn keyword(&self) -> &'static str {
        match self {
            PathScheme::Content => "ipfs",
            PathScheme::Name => "ipns",
        }
    }

    /// Maps a hostname label to a scheme, if it is a recognized keyword.
    pub fn from_keyword(label: &str) -> Option<Self> {
        match label {
            "ipfs" => Some(PathScheme::Content),
            "ipns" => Some(PathScheme::Name),
            _ => None,
        }
    }
}

/// A validated content or name path.
///
/// The root token is the content identifier text or the name being resolved;
/// `rest` is the sub-path below it, empty or beginning with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPath {
    scheme: PathScheme,
    root: String,
    rest: String,
}

impl ContentPath {
    /// Parses a slash-rooted path carrying a recognized scheme prefix.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let invalid = |reason: String| CoreError::InvalidReference { reason };

        let Some(stripped) = text.strip_prefix('/') else {
            return Err(invalid(format!("path {:?} is not rooted", text)));
        };
        let (keyword, remainder) = match stripped.split_once('/') {
            Some((kw, rem)) => (kw, rem),
            None => (stripped, ""),
        };
        let scheme = PathScheme::from_keyword(keyword).ok_or_else(|| {
            invalid(format!(
                "path {:?} doesn't start with /ipfs/ or /ipns/",
                text
            ))
        })?;
        let (root, rest) = match remainder.split_once('/') {
            Some((root, sub)) => (root, format!("/{}", sub)),
            None => (remainder, String::new()),
        };
        if root.is_empty() {
            return Err(invalid(format!("path {:?} has no root identifier", text)));
        }
        if root.chars().any(char::is_whitespace) {
            return Err(invalid(format!("path {:?} contains whitespace", text)));
        }
        Ok(ContentPath {
            scheme,
            root: root.to_string(),
            rest,
        })
    }

    /// The addressing scheme of this path.
    pub fn scheme(&self) -> PathScheme {
        self.scheme
    }

    /// The root token: identifier text or name to resolve.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The sub-path below the root, empty or beginning with `/`.
    pub fn rest(&self) -> &str {
        &self.rest
    }

    /// Returns a new path with `segment` appended below this one.
    pub fn join(&self, segment: &str) -> ContentPath {
        ContentPath {
            scheme: self.scheme,
            root: self.root.clone(),
            rest: format!("{}/{}", self.rest, segment),
        }
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}{}", self.scheme.prefix(), self.root, self.rest)
    }
}
