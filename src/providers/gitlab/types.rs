//! Typed subsets of GitLab REST v4 payloads.
//!
//! Only the fields the renderer needs are modelled. Anything GitLab may omit
//! is optional or defaulted so older instances still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single project (`GET /projects/:id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path_with_namespace: String,
    pub description: Option<String>,
    pub web_url: String,
    pub default_branch: Option<String>,
    pub visibility: Option<String>,
    #[serde(default)]
    pub star_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    pub open_issues_count: Option<u64>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// A GitLab user as embedded in other resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    pub web_url: Option<String>,
}

/// A commit as embedded in branches and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    #[serde(default)]
    pub short_id: String,
    #[serde(default)]
    pub title: String,
    pub author_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub committed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub default: bool,
    pub web_url: Option<String>,
    pub commit: Option<Commit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: u64,
    /// Project-scoped id used in URLs and the discussions endpoint
    pub iid: u64,
    pub title: String,
    pub state: String,
    pub web_url: String,
    pub author: User,
    #[serde(default)]
    pub source_branch: String,
    #[serde(default)]
    pub target_branch: String,
    #[serde(default)]
    pub draft: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Unresolved review notes left by someone other than the author.
    ///
    /// Not part of the GitLab payload; filled in after the discussions of
    /// the merge request have been fetched.
    #[serde(default)]
    pub review_threads: Vec<Note>,
}

/// A discussion thread on a merge request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: String,
    #[serde(default)]
    pub individual_note: bool,
    #[serde(default)]
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    #[serde(default)]
    pub body: String,
    pub author: User,
    #[serde(default)]
    pub resolvable: bool,
    #[serde(default)]
    pub resolved: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// Whether this note still waits on someone other than `author_id`.
    pub fn is_open_review_thread(&self, author_id: u64) -> bool {
        self.resolvable && !self.resolved && self.author.id != author_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub iid: Option<u64>,
    pub status: String,
    #[serde(rename = "ref")]
    pub ref_: String,
    #[serde(default)]
    pub sha: String,
    pub source: Option<String>,
    pub web_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub name: Option<String>,
    pub tag_name: String,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    #[serde(rename = "_links")]
    pub links: Option<ReleaseLinks>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseLinks {
    #[serde(rename = "self")]
    pub self_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub message: Option<String>,
    pub target: Option<String>,
    pub commit: Option<Commit>,
    #[serde(default)]
    pub protected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_merge_request_without_review_threads() {
        let mr: MergeRequest = serde_json::from_value(json!({
            "id": 101,
            "iid": 7,
            "title": "Add cache",
            "state": "opened",
            "web_url": "https://gitlab.com/group/project/-/merge_requests/7",
            "author": {"id": 1, "name": "Ada", "username": "ada"},
            "source_branch": "feature/cache",
            "target_branch": "main",
            "created_at": "2024-05-01T10:00:00.000Z",
            "updated_at": "2024-05-02T10:00:00.000+02:00",
            "labels": ["ignored"]
        }))
        .unwrap();

        assert_eq!(mr.iid, 7);
        assert_eq!(mr.author.id, 1);
        assert!(mr.review_threads.is_empty());
        assert_eq!(
            mr.updated_at.unwrap().to_rfc3339(),
            "2024-05-02T08:00:00+00:00"
        );
    }

    #[test]
    fn test_decode_pipeline_ref_field() {
        let pipeline: Pipeline = serde_json::from_value(json!({
            "id": 42,
            "iid": 3,
            "status": "failed",
            "ref": "main",
            "sha": "abc",
            "web_url": "https://gitlab.com/group/project/-/pipelines/42"
        }))
        .unwrap();

        assert_eq!(pipeline.ref_, "main");
        assert!(pipeline.created_at.is_none());
    }

    #[test]
    fn test_decode_release_links() {
        let release: Release = serde_json::from_value(json!({
            "name": "v1.0",
            "tag_name": "v1.0",
            "_links": {"self": "https://gitlab.com/group/project/-/releases/v1.0"}
        }))
        .unwrap();

        assert_eq!(
            release.links.and_then(|l| l.self_url).as_deref(),
            Some("https://gitlab.com/group/project/-/releases/v1.0")
        );
    }

    #[test]
    fn test_note_open_review_thread() {
        let note = |author: u64, resolvable: bool, resolved: bool| Note {
            id: 1,
            body: String::new(),
            author: User {
                id: author,
                name: String::new(),
                username: String::new(),
                web_url: None,
            },
            resolvable,
            resolved,
            created_at: None,
            updated_at: None,
        };

        assert!(note(2, true, false).is_open_review_thread(1));
        assert!(!note(2, true, true).is_open_review_thread(1));
        assert!(!note(2, false, false).is_open_review_thread(1));
        assert!(!note(1, true, false).is_open_review_thread(1));
    }
}
