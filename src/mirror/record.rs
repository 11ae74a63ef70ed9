//! Persisted mirror records and the threading tie-break merge.

use serde::{Deserialize, Serialize};

/// Scan progress. Lives under the store's reserved state key; the revision
/// only ever moves forward along the tracked branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorState {
    pub latest_revision: Option<String>,
}

/// One mirrored (or externally tracked) message, stored under the digest of
/// its message-id.
///
/// `pull_request_url` is immutable once set. `original_commit` and
/// `issue_comment_id` may be filled in lazily but are never cleared; cover
/// messages have no `original_commit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailRecord {
    pub message_id: String,
    pub pull_request_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_comment_id: Option<u64>,
}

/// The most complete delivery target assembled from a message's known
/// references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub pull_request_url: String,
    pub original_commit: Option<String>,
    pub issue_comment_id: Option<u64>,
}

/// How a resolved message gets delivered. Exactly one mode per message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode<'a> {
    /// Reply to a specific review comment.
    ReplyToComment(u64),
    /// Comment scoped to a single commit.
    CommitComment(&'a str),
    /// General comment on the discussion thread.
    ThreadComment,
}

impl ResolvedTarget {
    /// A known comment id beats a known commit, which beats the bare thread.
    pub fn delivery_mode(&self) -> DeliveryMode<'_> {
        if let Some(id) = self.issue_comment_id {
            DeliveryMode::ReplyToComment(id)
        } else if let Some(commit) = self.original_commit.as_deref() {
            DeliveryMode::CommitComment(commit)
        } else {
            DeliveryMode::ThreadComment
        }
    }
}

/// Merge candidate records into a single best target.
///
/// Candidates arrive in reference-header order. Precedence is first-wins per
/// field, never losing previously adopted information: the pull request URL
/// comes from the first candidate, a missing `original_commit` or
/// `issue_comment_id` is adopted from the first later candidate carrying
/// one. Returns `None` when there are no candidates at all.
pub fn merge_candidates<'a, I>(candidates: I) -> Option<ResolvedTarget>
where
    I: IntoIterator<Item = &'a MailRecord>,
{
    let mut merged: Option<ResolvedTarget> = None;

    for record in candidates {
        match merged.as_mut() {
            None => {
                merged = Some(ResolvedTarget {
                    pull_request_url: record.pull_request_url.clone(),
                    original_commit: record.original_commit.clone(),
                    issue_comment_id: record.issue_comment_id,
                });
            }
            Some(target) => {
                if target.original_commit.is_none() {
                    target.original_commit = record.original_commit.clone();
                }
                if target.issue_comment_id.is_none() {
                    target.issue_comment_id = record.issue_comment_id;
                }
            }
        }
    }

    merged
}
