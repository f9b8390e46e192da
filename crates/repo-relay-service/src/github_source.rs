//! # GitHub Activity-Feed Source
//!
//! Repository events source backed by the GitHub REST API's
//! `/repos/{owner}/{repo}/events` endpoint. The endpoint serves a bounded
//! page of recent public activity, newest first, which is exactly the shape
//! the poller's cursor discipline expects.

use async_trait::async_trait;
use regex::Regex;
use repo_relay_core::{FetchError, RawFeedEvent, RepoEventsSource, RepoUrl};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

/// GitHub REST API events source.
pub struct GithubEventsSource {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
    repo_pattern: Regex,
}

#[derive(Debug, Deserialize)]
struct FeedRecord {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    actor: Option<FeedActor>,
    #[serde(default)]
    repo: Option<FeedRepo>,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct FeedActor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct FeedRepo {
    name: String,
}

impl GithubEventsSource {
    /// Create a source for the given API base URL and optional access token.
    pub fn new(client: reqwest::Client, api_base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
            // Accepts plain and .git forms, with or without a trailing slash
            repo_pattern: Regex::new(r"^https?://github\.com/([^/]+)/([^/]+?)(?:\.git)?/?$")
                .expect("repository pattern is a valid constant"),
        }
    }

    /// Extract `(owner, repo)` from a repository URL.
    fn parse_repo(&self, repo: &RepoUrl) -> Result<(String, String), FetchError> {
        let captures =
            self.repo_pattern
                .captures(repo.as_str())
                .ok_or_else(|| FetchError::RepositoryUnavailable {
                    repo: repo.to_string(),
                })?;

        Ok((captures[1].to_string(), captures[2].to_string()))
    }
}

#[async_trait]
impl RepoEventsSource for GithubEventsSource {
    #[instrument(skip(self), fields(repo = %repo))]
    async fn fetch_recent_events(&self, repo: &RepoUrl) -> Result<Vec<RawFeedEvent>, FetchError> {
        let (owner, name) = self.parse_repo(repo)?;
        let url = format!("{}/repos/{}/{}/events", self.api_base, owner, name);

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "repo-relay");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|e| FetchError::Upstream {
            message: e.to_string(),
        })?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN | StatusCode::GONE => {
                return Err(FetchError::RepositoryUnavailable {
                    repo: repo.to_string(),
                });
            }
            status if !status.is_success() => {
                return Err(FetchError::Upstream {
                    message: format!("{} returned {}", url, status),
                });
            }
            _ => {}
        }

        let records: Vec<FeedRecord> =
            response.json().await.map_err(|e| FetchError::MalformedResponse {
                message: e.to_string(),
            })?;

        debug!(count = records.len(), "Fetched activity feed page");

        Ok(records
            .into_iter()
            .map(|record| RawFeedEvent {
                id: record.id,
                kind: record.kind,
                actor: record.actor.map(|actor| actor.login),
                repo_name: record.repo.map(|repo| repo.name),
                payload: record.payload,
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "github_source_tests.rs"]
mod tests;
