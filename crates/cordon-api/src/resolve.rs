//! Canonical-address resolution.
//!
//! Resolution is the single chokepoint of the blocking layer: every raw
//! reference is reduced to the identifier it denotes before any state is
//! touched, because the same identifier may be reachable from unrelated
//! domains and paths.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use cordon_core::{ContentId, ContentPath, CoreError, CoreResult, PathScheme};

use crate::normalize::normalize;

/// Fixed bound on one resolution call, independent of the caller's deadline.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures reported by a [`ContentSource`].
///
/// Compared by discriminant; the resolver branches on these kinds rather
/// than on error identity.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The object is a directory-like container, not a file.
    #[error("content is a directory, not a file")]
    IsDirectory,

    /// The store refused the read because the identifier is blocked.
    #[error("content is unavailable because it violates the operator's terms of service")]
    Forbidden,

    /// No object for the requested path or identifier.
    #[error("content not found")]
    NotFound,

    /// The store or name system could not serve the request.
    #[error("content source unavailable: {0}")]
    Unavailable(String),
}

/// The resolver's view of the content-addressed node: name resolution, a
/// file-ness probe, and shallow directory listing.
#[async_trait]
pub trait ContentSource: Send + Sync + 'static {
    /// Resolves a path through the naming and content-addressing layers to
    /// the final identifier.
    async fn resolve_path(&self, path: &ContentPath) -> Result<ContentId, SourceError>;

    /// Attempts to open the object as a file.
    async fn open_file(&self, id: &ContentId) -> Result<(), SourceError>;

    /// Lists the immediate child link names of a container. No recursion.
    async fn child_links(&self, id: &ContentId) -> Result<Vec<String>, SourceError>;
}

/// A resolved reference: the identifier plus, for containers, the immediate
/// child names. Ephemeral, recomputed per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedContent {
    /// The canonical identifier the reference denotes.
    pub id: ContentId,
    /// Immediate child names when the identifier denotes a container.
    pub links: Option<Vec<String>>,
}

impl ResolvedContent {
    /// A resolved leaf (file) with no child links.
    pub fn leaf(id: ContentId) -> Self {
        Self { id, links: None }
    }

    /// Whether the identifier denotes a directory-like container.
    pub fn is_container(&self) -> bool {
        self.links.is_some()
    }
}

/// Resolves raw references against an injected [`ContentSource`], under a
/// fixed timeout.
pub struct Resolver {
    source: Arc<dyn ContentSource>,
    timeout: Duration,
}

impl Resolver {
    /// Creates a resolver with the default 30 second bound.
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self::with_timeout(source, DEFAULT_RESOLVE_TIMEOUT)
    }

    /// Creates a resolver with an explicit time bound.
    pub fn with_timeout(source: Arc<dyn ContentSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Resolves a raw reference to its identifier and classifies it as file
    /// or container.
    ///
    /// The timer covers normalization, path resolution and the file probe;
    /// dropping the future cancels all of it.
    pub async fn resolve(&self, raw: &str) -> CoreResult<ResolvedContent> {
        match tokio::time::timeout(self.timeout, self.resolve_inner(raw)).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::ResolveTimeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }

    async fn resolve_inner(&self, raw: &str) -> CoreResult<ResolvedContent> {
        let normalized = normalize(raw)?;
        let decoded =
            urlencoding::decode(&normalized).map_err(|err| CoreError::InvalidReference {
                reason: format!("bad percent-encoding: {}", err),
            })?;
        let path = ContentPath::parse(&decoded)?;

        let id = self
            .source
            .resolve_path(&path)
            .await
            .map_err(|err| CoreError::Resolve {
                reason: format!("{}: {}", path, err),
            })?;
        debug!(reference = raw, id = %id, "resolved reference");

        match self.source.open_file(&id).await {
            Ok(()) => Ok(ResolvedContent::leaf(id)),
            // Already-blocked content must stay re-resolvable, and the probe
            // must not leak directory structure for it, so a forbidden signal
            // counts as a file here even when the object is a container.
            Err(SourceError::Forbidden) => Ok(ResolvedContent::leaf(id)),
            Err(SourceError::IsDirectory) => {
                let links =
                    self.source
                        .child_links(&id)
                        .await
                        .map_err(|err| CoreError::Resolve {
                            reason: format!("listing {}: {}", id, err),
                        })?;
                Ok(ResolvedContent {
                    id,
                    links: Some(links),
                })
            }
            Err(other) => Err(CoreError::Resolve {
                reason: other.to_string(),
            }),
        }
    }
}

/// A degenerate source that answers direct `/ipfs/<id>` paths from the
/// identifier token alone and treats every identifier as a leaf.
///
/// Lets the CLI operate on native content paths without a connected node;
/// name paths and sub-paths need the real thing.
#[derive(Debug, Default, Clone)]
pub struct LiteralSource;

impl LiteralSource {
    /// Creates the literal source.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentSource for LiteralSource {
    async fn resolve_path(&self, path: &ContentPath) -> Result<ContentId, SourceError> {
        match path.scheme() {
            PathScheme::Content if path.rest().is_empty() => {
                ContentId::parse(path.root()).map_err(|err| SourceError::Unavailable(err.to_string()))
            }
            PathScheme::Content => Err(SourceError::Unavailable(
                "cannot traverse sub-paths without a connected node".to_string(),
            )),
            PathScheme::Name => Err(SourceError::Unavailable(
                "name resolution requires a connected node".to_string(),
            )),
        }
    }

    async fn open_file(&self, _id: &ContentId) -> Result<(), SourceError> {
        Ok(())
    }

    async fn child_links(&self, _id: &ContentId) -> Result<Vec<String>, SourceError> {
        Err(SourceError::Unavailable(
            "directory listing requires a connected node".to_string(),
        ))
    }
}
