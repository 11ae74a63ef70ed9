//! Posting comments to the code-hosting service.
//!
//! The scan engine only needs the three operations of the [`Forge`] trait;
//! [`GithubClient`] implements them against the GitHub REST API.

pub mod github;

pub use github::{GithubClient, GithubConfig};

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while talking to the code-hosting service.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("forge HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("forge returned status {status}: {body}")]
    Service { status: StatusCode, body: String },
    #[error("failed to decode forge response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("not a pull request URL: {0}")]
    InvalidPullRequestUrl(String),
}

/// Identifier of a newly created comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentHandle {
    pub id: u64,
}

pub trait Forge {
    /// Post a comment on the pull request's main discussion thread.
    fn post_thread_comment(
        &self,
        pull_request_url: &str,
        body: &str,
    ) -> Result<CommentHandle, ForgeError>;

    /// Post a reply to an existing review comment.
    fn post_comment_reply(
        &self,
        pull_request_url: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<CommentHandle, ForgeError>;

    /// Post a comment scoped to a single commit.
    fn post_commit_comment(
        &self,
        pull_request_url: &str,
        commit: &str,
        body: &str,
    ) -> Result<CommentHandle, ForgeError>;
}

impl<T: Forge + ?Sized> Forge for &T {
    fn post_thread_comment(
        &self,
        pull_request_url: &str,
        body: &str,
    ) -> Result<CommentHandle, ForgeError> {
        (**self).post_thread_comment(pull_request_url, body)
    }

    fn post_comment_reply(
        &self,
        pull_request_url: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<CommentHandle, ForgeError> {
        (**self).post_comment_reply(pull_request_url, comment_id, body)
    }

    fn post_commit_comment(
        &self,
        pull_request_url: &str,
        commit: &str,
        body: &str,
    ) -> Result<CommentHandle, ForgeError> {
        (**self).post_commit_comment(pull_request_url, commit, body)
    }
}
