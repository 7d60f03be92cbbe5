//! Wire types shared with the backend.
//!
//! These mirror the backend's JSON response shapes. The frontend treats all
//! of them as read copies: projects and context chunks are owned by the
//! backend and cached per command invocation, never mutated locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The current user's profile as returned by the backend.
///
/// `api_key` is only populated on registration and rotation responses;
/// the backend never re-issues it on ordinary profile fetches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// A degraded profile holding only the email. Used when login succeeded
    /// but the follow-up profile fetch did not.
    pub fn partial(email: &str) -> Self {
        Self {
            id: String::new(),
            email: email.to_string(),
            name: String::new(),
            api_key: None,
            created_at: None,
        }
    }
}

/// Bearer credential pair issued by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contributor {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub owner_name: String,
    /// Ordered as maintained by the backend.
    #[serde(default)]
    pub contributors: Vec<Contributor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored context chunk. Immutable display data on this side.
///
/// Search responses name the identifier `id`; project-scoped retrieval
/// names it `chunk_id`. The alias covers both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextChunk {
    #[serde(alias = "chunk_id")]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub similarity_score: Option<f64>,
    /// Free-form backend metadata: `tags`, `source`, `project_id`,
    /// `created_by`, chunk indices, and whatever else the saver attached.
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ContextChunk {
    /// The chunk's tag list. Tags double as the adjacency list for the
    /// knowledge-graph view: chunks sharing a tag are connected.
    pub fn tags(&self) -> Vec<String> {
        self.metadata
            .get("tags")
            .and_then(|t| t.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Acknowledgement for a context save.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveReceipt {
    pub status: String,
    pub context_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Acknowledgement for a project delete.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteReceipt {
    pub status: String,
    pub project_id: String,
}

/// Acknowledgement for adding a contributor.
#[derive(Debug, Clone, Deserialize)]
pub struct ContributorAdded {
    pub status: String,
    pub contributor: Contributor,
}

/// Acknowledgement for removing a contributor.
#[derive(Debug, Clone, Deserialize)]
pub struct ContributorRemoved {
    pub status: String,
    pub user_id: String,
}

/// One analytics chart from the graphs overview endpoint. The `figure` is
/// an opaque plotting payload; this client prints the surrounding
/// metadata and leaves rendering to external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphReport {
    pub chart_id: String,
    pub title: String,
    pub description: String,
    pub figure: serde_json::Value,
    #[serde(default)]
    pub meta: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_alias() {
        let from_search: ContextChunk = serde_json::from_str(
            r#"{"id": "a1", "content": "x", "similarity_score": 0.9,
                "metadata": {}, "created_at": "2026-01-05T10:00:00Z"}"#,
        )
        .unwrap();
        let from_retrieve: ContextChunk = serde_json::from_str(
            r#"{"chunk_id": "a1", "content": "x",
                "metadata": {}, "created_at": "2026-01-05T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(from_search.id, "a1");
        assert_eq!(from_retrieve.id, "a1");
    }

    #[test]
    fn test_chunk_tags_extraction() {
        let chunk: ContextChunk = serde_json::from_str(
            r#"{"id": "a1", "content": "x",
                "metadata": {"tags": ["auth", "api", 3], "source": "cli"},
                "created_at": "2026-01-05T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(chunk.tags(), vec!["auth".to_string(), "api".to_string()]);
    }

    #[test]
    fn test_chunk_tags_absent() {
        let chunk: ContextChunk = serde_json::from_str(
            r#"{"id": "a1", "content": "x", "metadata": {},
                "created_at": "2026-01-05T10:00:00Z"}"#,
        )
        .unwrap();
        assert!(chunk.tags().is_empty());
    }

    #[test]
    fn test_partial_user_has_only_email() {
        let user = User::partial("a@b.c");
        assert_eq!(user.email, "a@b.c");
        assert!(user.id.is_empty());
        assert!(user.name.is_empty());
        assert!(user.api_key.is_none());
    }

    #[test]
    fn test_token_pair_default_type() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"access_token": "a", "refresh_token": "r"}"#).unwrap();
        assert_eq!(pair.token_type, "bearer");
    }
}
