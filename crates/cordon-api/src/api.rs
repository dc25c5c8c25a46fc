//! Block/unblock orchestration.
//!
//! Drives resolution, registry mutation, secondary-cache purge and the audit
//! append for batches of references. Items are processed independently: one
//! reference failing never short-circuits the rest, and partial success and
//! error are not mutually exclusive outcomes of a call.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use cordon_core::{
    AuditAction, AuditKind, BlockEntry, BlockRequest, Blocklist, ContentId, CoreError, CoreResult,
    PathScheme,
};

use crate::normalize::sanitize;
use crate::resolve::{ResolvedContent, Resolver};

/// One reference that failed within a batch, with the error it hit.
#[derive(Debug)]
pub struct ItemFailure {
    /// The reference as submitted (trimmed).
    pub reference: String,
    /// What went wrong for it.
    pub error: CoreError,
}

/// Aggregate of per-item failures from one batch call.
///
/// Preserves each failing reference's own message; rendering joins them one
/// per line, so a caller sees every failure at once.
#[derive(Debug)]
pub struct BatchError {
    /// The per-item failures, in submission order.
    pub failures: Vec<ItemFailure>,
}

impl BatchError {
    fn from_failures(failures: Vec<ItemFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", item.reference, item.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}

/// Outcome of a batch block call.
#[derive(Debug, Default)]
pub struct BlockOutcome {
    /// Content newly blocked by this call, directory substitutions included.
    /// Already-blocked identifiers are excluded.
    pub blocked: Vec<ResolvedContent>,
    /// Per-item failures, if any.
    pub batch_error: Option<BatchError>,
    /// Set when the registry mutation succeeded but the audit append failed.
    pub audit_error: Option<CoreError>,
}

impl BlockOutcome {
    /// True when every item succeeded and the audit record landed.
    pub fn is_clean(&self) -> bool {
        self.batch_error.is_none() && self.audit_error.is_none()
    }
}

/// Outcome of a batch unblock call.
#[derive(Debug, Default)]
pub struct UnblockOutcome {
    /// Identifiers removed from the blocklist by this call.
    pub unblocked: Vec<ContentId>,
    /// Per-item failures, if any.
    pub batch_error: Option<BatchError>,
    /// Set when the registry mutation succeeded but the audit append failed.
    pub audit_error: Option<CoreError>,
}

impl UnblockOutcome {
    /// True when every item succeeded and the audit record landed.
    pub fn is_clean(&self) -> bool {
        self.batch_error.is_none() && self.audit_error.is_none()
    }
}

/// The blocking-layer service object: resolution plus registry orchestration.
///
/// Built once at startup and shared by reference with the enforcement
/// interceptors, which consult the same registry.
pub struct Cordon {
    registry: Arc<dyn Blocklist>,
    resolver: Resolver,
}

impl Cordon {
    /// Creates the service around a shared registry and resolver.
    pub fn new(registry: Arc<dyn Blocklist>, resolver: Resolver) -> Self {
        Self { registry, resolver }
    }

    /// The shared registry handle, for wiring up interceptors.
    pub fn registry(&self) -> Arc<dyn Blocklist> {
        self.registry.clone()
    }

    /// Blocks every reference in the request.
    ///
    /// Fails up front with no side effects when the reason is empty. Each
    /// reference is resolved and blocked independently; container references
    /// are redirected to their `index.html` child rather than blocking the
    /// container's own identifier. One audit action records all newly
    /// blocked identifiers.
    pub async fn block(&self, req: &BlockRequest) -> CoreResult<BlockOutcome> {
        if req.reason.is_empty() {
            return Err(CoreError::ReasonRequired);
        }

        let mut blocked: Vec<ResolvedContent> = Vec::new();
        let mut failures: Vec<ItemFailure> = Vec::new();
        for reference in &req.references {
            let reference = reference.trim();
            match self.block_item(reference, req).await {
                Ok(Some(rc)) => blocked.push(rc),
                Ok(None) => {
                    // Already blocked: caches were purged again anyway, and
                    // the identifier is excluded from newly-blocked reporting.
                    info!(reference, "content was already blocked");
                }
                Err(error) => failures.push(ItemFailure {
                    reference: reference.to_string(),
                    error,
                }),
            }
        }

        let mut audit_error = None;
        if !blocked.is_empty() {
            let ids: Vec<ContentId> = blocked.iter().map(|rc| rc.id.clone()).collect();
            let action =
                AuditAction::now(AuditKind::Block, ids, req.reason.clone(), req.user.clone());
            if let Err(err) = self.registry.append_audit(action).await {
                warn!(error = %err, "block succeeded but audit append failed");
                audit_error = Some(CoreError::AuditFailed {
                    done: AuditKind::Block,
                    reason: err.to_string(),
                });
            }
        }

        Ok(BlockOutcome {
            blocked,
            batch_error: BatchError::from_failures(failures),
            audit_error,
        })
    }

    /// Resolves and blocks one reference.
    ///
    /// Returns `Ok(Some(_))` for newly blocked content, `Ok(None)` when it
    /// was already blocked.
    async fn block_item(
        &self,
        reference: &str,
        req: &BlockRequest,
    ) -> CoreResult<Option<ResolvedContent>> {
        // Query strings and fragments are stripped here and only here; the
        // unblock/search/purge paths take references as given.
        let mut target = sanitize(reference).to_string();

        loop {
            let resolved = self.resolver.resolve(&target).await?;

            if resolved.is_container() {
                // Never block a container's identifier: content addressing
                // means the same directory can back unrelated sites, so only
                // its index page is targeted. No other child is touched.
                target = format!(
                    "{}/{}/index.html",
                    PathScheme::Content.prefix(),
                    resolved.id
                );
                continue;
            }

            let entry = BlockEntry {
                id: resolved.id.clone(),
                reason: req.reason.clone(),
                user: req.user.clone(),
            };
            let newly_blocked = self.registry.block(&resolved.id, entry).await?;

            // Purge runs for already-present identifiers too; a failure here
            // leaves the identifier blocked and only reports the eviction.
            self.registry
                .purge(&resolved.id)
                .await
                .map_err(|err| CoreError::PurgeFailed {
                    reason: err.to_string(),
                })?;

            return Ok(newly_blocked.then_some(resolved));
        }
    }

    /// Unblocks every reference in the request.
    ///
    /// References resolve directly to their identifier; the directory policy
    /// does not apply. One audit action records all unblocked identifiers.
    pub async fn unblock(&self, req: &BlockRequest) -> CoreResult<UnblockOutcome> {
        if req.reason.is_empty() {
            return Err(CoreError::ReasonRequired);
        }

        let mut unblocked: Vec<ContentId> = Vec::new();
        let mut failures: Vec<ItemFailure> = Vec::new();
        for reference in &req.references {
            let reference = reference.trim();
            let result = async {
                let resolved = self.resolver.resolve(reference).await?;
                self.registry.unblock(&resolved.id).await?;
                Ok::<ContentId, CoreError>(resolved.id)
            }
            .await;
            match result {
                Ok(id) => unblocked.push(id),
                Err(error) => failures.push(ItemFailure {
                    reference: reference.to_string(),
                    error,
                }),
            }
        }

        let mut audit_error = None;
        if !unblocked.is_empty() {
            let action = AuditAction::now(
                AuditKind::Unblock,
                unblocked.clone(),
                req.reason.clone(),
                req.user.clone(),
            );
            if let Err(err) = self.registry.append_audit(action).await {
                warn!(error = %err, "unblock succeeded but audit append failed");
                audit_error = Some(CoreError::AuditFailed {
                    done: AuditKind::Unblock,
                    reason: err.to_string(),
                });
            }
        }

        Ok(UnblockOutcome {
            unblocked,
            batch_error: BatchError::from_failures(failures),
            audit_error,
        })
    }

    /// Resolves a reference and forwards a purge to the registry.
    pub async fn purge(&self, reference: &str) -> CoreResult<ContentId> {
        let resolved = self.resolver.resolve(reference).await?;
        self.registry.purge(&resolved.id).await?;
        Ok(resolved.id)
    }

    /// Resolves a reference and looks up its blocklist entry.
    pub async fn search(&self, reference: &str) -> CoreResult<Option<BlockEntry>> {
        let resolved = self.resolver.resolve(reference).await?;
        self.registry.search(&resolved.id).await
    }

    /// Returns up to `limit` audit actions, newest first.
    pub async fn audit_log(&self, limit: usize) -> CoreResult<Vec<AuditAction>> {
        self.registry.audit_log(limit).await
    }

    /// Whether an identifier is currently blocked.
    pub async fn contains(&self, id: &ContentId) -> CoreResult<bool> {
        self.registry.contains(id).await
    }
}
