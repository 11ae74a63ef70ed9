//! The mirroring engine.
//!
//! Ties the collaborators into one `scan()` operation:
//!
//! 1. **Cursor**: load [`MirrorState`] from the store; bail out with zero
//!    side effects when the archive branch head has not moved.
//! 2. **Reconstruction**: stream the incremental diff for the half-open
//!    range `(cursor, head]` through the [`MessageReconstructor`].
//! 3. **Resolution**: look up each message's references in the known-digest
//!    set and merge their records into the most complete delivery target.
//! 4. **Delivery**: render the message and post it in the resolved mode,
//!    then record the outcome under the message's own digest.
//! 5. **Advance**: persist the cursor at the new head, unconditionally.
//!
//! A restart resumes from the last persisted cursor; re-scanning a range is
//! safe because the known-digest check makes delivery idempotent per
//! message-id. Unparsable messages and failed deliveries are logged and
//! skipped; storage failures abort the scan before the cursor moves, so the
//! whole range is retried on the next invocation.

pub mod reconstruct;
pub mod record;
pub mod render;

pub use reconstruct::MessageReconstructor;
pub use record::{DeliveryMode, MailRecord, MirrorState, ResolvedTarget, merge_candidates};

use std::collections::BTreeSet;

use thiserror::Error;

use crate::archive::{Archive, ArchiveError, RevRange};
use crate::digest::blob_digest;
use crate::forge::{CommentHandle, Forge, ForgeError};
use crate::mail::{self, ParsedMessage};
use crate::store::{KvStore, KvStoreExt, StoreError};

/// Reserved key the cursor state lives under. Its digest never appears in
/// the known-message-id set.
const STATE_KEY: &str = "";

/// Fatal scan failures. Per-message parse and delivery failures are logged
/// and skipped instead of surfacing here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Archive branch that receives new messages.
    pub branch: String,
    /// Revision predating any tracked activity; the cursor starts here when
    /// no state has been persisted yet.
    pub base_revision: String,
    /// Public permalink base for archived messages, without trailing slash
    /// requirements, e.g. `https://lore.example.org/widgets`.
    pub permalink_base: String,
}

/// Callers must serialize `scan()` invocations against the same store.
pub struct Mirror<A, S, F> {
    archive: A,
    store: S,
    forge: F,
    config: MirrorConfig,
}

impl<A: Archive, S: KvStore, F: Forge> Mirror<A, S, F> {
    pub fn new(archive: A, store: S, forge: F, config: MirrorConfig) -> Self {
        Self {
            archive,
            store,
            forge,
            config,
        }
    }

    /// The underlying store, e.g. for seeding records when a thread starts
    /// being tracked.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mirror every message the archive gained since the last scan.
    ///
    /// Returns `false` when there was no new history (zero side effects),
    /// `true` when new history was consumed and the cursor advanced. The
    /// optional `filter` can veto delivery per resolved pull request URL,
    /// scoping a run to one thread.
    pub fn scan(&self, filter: Option<&dyn Fn(&str) -> bool>) -> Result<bool, ScanError> {
        let state: MirrorState = self.store.get(STATE_KEY)?.unwrap_or_default();
        let cursor = state
            .latest_revision
            .unwrap_or_else(|| self.config.base_revision.clone());

        let head = self.archive.resolve_head(&self.config.branch)?;
        if head == cursor {
            log::debug!("no new history on {} at {}", self.config.branch, head);
            return Ok(false);
        }

        log::info!("scanning {} from {} to {}", self.config.branch, cursor, head);

        // Scan-scoped known set, derived from the store's listing; newly
        // delivered digests join it in memory so later messages in the same
        // range resolve without re-reading storage.
        let mut known = self.store.list_digests()?;
        known.remove(&blob_digest(STATE_KEY));

        let range = RevRange {
            from: cursor,
            to: head.clone(),
        };

        let mut reconstructor = MessageReconstructor::new();
        let mut seen = 0usize;
        let mut delivered = 0usize;
        for line in self.archive.stream_diff(&range)? {
            let line = line?;
            if let Some(raw) = reconstructor.feed(&line) {
                seen += 1;
                if self.handle_message(&raw, filter, &mut known)? {
                    delivered += 1;
                }
            }
        }

        log::info!("scan complete: {} new messages, {} delivered", seen, delivered);

        self.store.set(
            STATE_KEY,
            &MirrorState {
                latest_revision: Some(head),
            },
        )?;
        Ok(true)
    }

    /// Resolve and deliver one reconstructed message. Returns whether it was
    /// delivered; only storage failures propagate.
    fn handle_message(
        &self,
        raw: &str,
        filter: Option<&dyn Fn(&str) -> bool>,
        known: &mut BTreeSet<String>,
    ) -> Result<bool, ScanError> {
        let message = match mail::parse_message(raw) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("dropping unparsable message: {}", e);
                return Ok(false);
            }
        };

        let digest = blob_digest(&message.message_id);
        if known.contains(&digest) {
            log::trace!("already mirrored: {}", message.message_id);
            return Ok(false);
        }

        let mut candidates = Vec::new();
        for reference in &message.references {
            if !known.contains(&blob_digest(reference)) {
                continue;
            }
            match self.store.get::<MailRecord>(reference)? {
                Some(record) => candidates.push(record),
                None => log::debug!("reference {} listed but unreadable", reference),
            }
        }

        let Some(target) = merge_candidates(&candidates) else {
            log::debug!(
                "{} does not reference any tracked thread",
                message.message_id
            );
            return Ok(false);
        };

        if let Some(filter) = filter {
            if !filter(&target.pull_request_url) {
                log::info!(
                    "skipping {} ({} filtered out)",
                    message.message_id,
                    target.pull_request_url
                );
                return Ok(false);
            }
        }

        let comment = match self.deliver(&message, &target) {
            Ok(handle) => handle,
            Err(e) => {
                // no retry queue: the cursor advances past this message at
                // the end of the scan
                log::error!("failed to deliver {}: {}", message.message_id, e);
                return Ok(false);
            }
        };

        let record = MailRecord {
            message_id: message.message_id.clone(),
            pull_request_url: target.pull_request_url,
            original_commit: target.original_commit,
            issue_comment_id: Some(comment.id),
        };
        self.store.set(&message.message_id, &record)?;
        known.insert(digest);

        Ok(true)
    }

    fn deliver(
        &self,
        message: &ParsedMessage,
        target: &ResolvedTarget,
    ) -> Result<CommentHandle, ForgeError> {
        let permalink = render::permalink(&self.config.permalink_base, &message.message_id);
        let comment = render::render_comment(&permalink, message.from_name.as_deref(), &message.body);

        match target.delivery_mode() {
            DeliveryMode::ReplyToComment(comment_id) => {
                log::info!(
                    "replying to comment {} on {} for {}",
                    comment_id,
                    target.pull_request_url,
                    message.message_id
                );
                self.forge
                    .post_comment_reply(&target.pull_request_url, comment_id, &comment)
            }
            DeliveryMode::CommitComment(commit) => {
                log::info!(
                    "commenting on commit {} of {} for {}",
                    commit,
                    target.pull_request_url,
                    message.message_id
                );
                self.forge
                    .post_commit_comment(&target.pull_request_url, commit, &comment)
            }
            DeliveryMode::ThreadComment => {
                log::info!(
                    "commenting on {} for {}",
                    target.pull_request_url,
                    message.message_id
                );
                self.forge
                    .post_thread_comment(&target.pull_request_url, &comment)
            }
        }
    }
}
