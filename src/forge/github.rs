//! Blocking GitHub REST client.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{CommentHandle, Forge, ForgeError};

static PULL_URL_REGEX: OnceLock<Regex> = OnceLock::new();

fn pull_url_regex() -> &'static Regex {
    PULL_URL_REGEX.get_or_init(|| {
        Regex::new(r"^https://github\.com/([^/]+)/([^/]+)/pull/(\d+)$")
            .expect("pull request URL regex is valid")
    })
}

/// Owner, repository and number parsed out of a pull request URL.
#[derive(Debug, PartialEq, Eq)]
struct PullRef {
    owner: String,
    repo: String,
    number: u64,
}

fn parse_pull_url(url: &str) -> Result<PullRef, ForgeError> {
    let captures = pull_url_regex()
        .captures(url)
        .ok_or_else(|| ForgeError::InvalidPullRequestUrl(url.to_string()))?;

    let number = captures[3]
        .parse()
        .map_err(|_| ForgeError::InvalidPullRequestUrl(url.to_string()))?;

    Ok(PullRef {
        owner: captures[1].to_string(),
        repo: captures[2].to_string(),
        number,
    })
}

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_base: String,
    pub token: String,
    pub request_timeout: Duration,
}

impl GithubConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            token: token.into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct GithubClient {
    http: reqwest::blocking::Client,
    config: GithubConfig,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Result<Self, ForgeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("inbox-mirror/0.1")
            .build()
            .map_err(ForgeError::Http)?;

        Ok(Self {
            http: client,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn post_comment(&self, url: String, body: &str) -> Result<CommentHandle, ForgeError> {
        let payload = CommentRequest { body };
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .json(&payload)
            .send()
            .map_err(ForgeError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(ForgeError::Service { status, body });
        }

        let bytes = response.bytes().map_err(ForgeError::Http)?;
        let created: CommentResponse = serde_json::from_slice(&bytes)?;
        Ok(CommentHandle { id: created.id })
    }
}

impl Forge for GithubClient {
    fn post_thread_comment(
        &self,
        pull_request_url: &str,
        body: &str,
    ) -> Result<CommentHandle, ForgeError> {
        let pull = parse_pull_url(pull_request_url)?;
        let url = self.endpoint(&format!(
            "repos/{}/{}/issues/{}/comments",
            pull.owner, pull.repo, pull.number
        ));
        self.post_comment(url, body)
    }

    fn post_comment_reply(
        &self,
        pull_request_url: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<CommentHandle, ForgeError> {
        let pull = parse_pull_url(pull_request_url)?;
        let url = self.endpoint(&format!(
            "repos/{}/{}/pulls/{}/comments/{}/replies",
            pull.owner, pull.repo, pull.number, comment_id
        ));
        self.post_comment(url, body)
    }

    fn post_commit_comment(
        &self,
        pull_request_url: &str,
        commit: &str,
        body: &str,
    ) -> Result<CommentHandle, ForgeError> {
        let pull = parse_pull_url(pull_request_url)?;
        let url = self.endpoint(&format!(
            "repos/{}/{}/commits/{}/comments",
            pull.owner, pull.repo, commit
        ));
        self.post_comment(url, body)
    }
}

#[derive(Debug, Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pull_url() {
        let pull = parse_pull_url("https://github.com/octo/widgets/pull/42").unwrap();
        assert_eq!(pull.owner, "octo");
        assert_eq!(pull.repo, "widgets");
        assert_eq!(pull.number, 42);
    }

    #[test]
    fn test_parse_pull_url_rejects_non_pull_urls() {
        for url in [
            "https://github.com/octo/widgets",
            "https://github.com/octo/widgets/issues/42",
            "https://example.com/octo/widgets/pull/42",
            "not a url",
        ] {
            assert!(matches!(
                parse_pull_url(url),
                Err(ForgeError::InvalidPullRequestUrl(_))
            ));
        }
    }
}
