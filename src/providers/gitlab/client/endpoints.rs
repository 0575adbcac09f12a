use super::core::GitLabClient;
use crate::error::Result;
use crate::providers::gitlab::source::RepositoryReference;
use crate::providers::gitlab::types::{
    Branch, Discussion, MergeRequest, Pipeline, Project, Release, Tag,
};

const BRANCHES_ENDPOINT: &str = "repository/branches?order_by=updated_at";
const MERGE_REQUESTS_ENDPOINT: &str = "merge_requests";
const OPEN_MERGE_REQUESTS_ENDPOINT: &str = "merge_requests?state=opened";
const PIPELINES_ENDPOINT: &str = "pipelines";
const RELEASES_ENDPOINT: &str = "releases";
const TAGS_ENDPOINT: &str = "repository/tags";

impl GitLabClient {
    /// Get project details.
    ///
    /// See <https://docs.gitlab.com/ee/api/projects.html#get-single-project>
    pub async fn fetch_project_details(&self, reference: &RepositoryReference) -> Result<Project> {
        self.get(reference, "").await
    }

    /// Get project branches, most recently updated first.
    ///
    /// See <https://docs.gitlab.com/ee/api/branches.html>
    pub async fn fetch_branches(&self, reference: &RepositoryReference) -> Result<Vec<Branch>> {
        self.get(reference, BRANCHES_ENDPOINT).await
    }

    /// Get merge requests, restricted to open ones when configured.
    ///
    /// The returned records have empty `review_threads`.
    ///
    /// See <https://docs.gitlab.com/ee/api/merge_requests.html>
    pub async fn fetch_merge_requests(
        &self,
        reference: &RepositoryReference,
    ) -> Result<Vec<MergeRequest>> {
        let endpoint = if self.open_merge_requests_only() {
            OPEN_MERGE_REQUESTS_ENDPOINT
        } else {
            MERGE_REQUESTS_ENDPOINT
        };
        self.get(reference, endpoint).await
    }

    /// Get the discussions of one merge request.
    ///
    /// See <https://docs.gitlab.com/ee/api/discussions.html#merge-requests>
    pub async fn fetch_discussions(
        &self,
        reference: &RepositoryReference,
        merge_request_iid: u64,
    ) -> Result<Vec<Discussion>> {
        let endpoint =
            format!("merge_requests/{merge_request_iid}/discussions?order_by=updated_at");
        self.get(reference, &endpoint).await
    }

    /// See <https://docs.gitlab.com/ee/api/pipelines.html>
    pub async fn fetch_pipelines(&self, reference: &RepositoryReference) -> Result<Vec<Pipeline>> {
        self.get(reference, PIPELINES_ENDPOINT).await
    }

    /// See <https://docs.gitlab.com/ee/api/releases/>
    pub async fn fetch_releases(&self, reference: &RepositoryReference) -> Result<Vec<Release>> {
        self.get(reference, RELEASES_ENDPOINT).await
    }

    /// See <https://docs.gitlab.com/ee/api/tags.html>
    pub async fn fetch_tags(&self, reference: &RepositoryReference) -> Result<Vec<Tag>> {
        self.get(reference, TAGS_ENDPOINT).await
    }

    /// Retry the failed jobs of a pipeline.
    ///
    /// On success the cached pipeline list is evicted so the next render
    /// shows the new state.
    ///
    /// See <https://docs.gitlab.com/ee/api/pipelines.html#retry-jobs-in-a-pipeline>
    pub async fn retry_pipeline(
        &self,
        reference: &RepositoryReference,
        pipeline_id: u64,
    ) -> Result<Pipeline> {
        let pipeline = self
            .post(reference, &format!("pipelines/{pipeline_id}/retry"))
            .await?;
        self.evict(reference, PIPELINES_ENDPOINT);
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::config::GitLabConfig;
    use crate::error::GitLabToolingError;
    use crate::providers::gitlab::cache::ResponseCache;
    use crate::providers::gitlab::source::resolve;

    const PROJECT_PATH: &str = "/api/v4/projects/group%2Fproject";

    fn config(server: &ServerGuard) -> GitLabConfig {
        GitLabConfig {
            base_url: server.url(),
            token: Some("secret-token".to_string()),
            open_merge_requests_only: false,
            request_timeout: "5s".to_string(),
            rate_limit_retries: 0,
        }
    }

    fn reference(server: &ServerGuard) -> RepositoryReference {
        resolve(&server.url(), "group/project").unwrap()
    }

    fn pipeline_json(id: u64, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "iid": 1,
            "status": status,
            "ref": "main",
            "sha": "deadbeef",
            "web_url": format!("https://gitlab.example.com/group/project/-/pipelines/{id}"),
            "created_at": "2024-05-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_requests_carry_private_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", PROJECT_PATH)
            .match_header("private-token", "secret-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": 1,
                    "name": "project",
                    "path_with_namespace": "group/project",
                    "web_url": "https://gitlab.example.com/group/project"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GitLabClient::new(&config(&server), None).unwrap();
        let project = client
            .fetch_project_details(&reference(&server))
            .await
            .unwrap();

        assert_eq!(project.name, "project");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_token_sends_no_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", format!("{PROJECT_PATH}/repository/tags").as_str())
            .match_header("private-token", Matcher::Missing)
            .with_status(401)
            .create_async()
            .await;

        let config = GitLabConfig {
            token: None,
            ..config(&server)
        };
        let client = GitLabClient::new(&config, None).unwrap();
        let err = assert_err!(client.fetch_tags(&reference(&server)).await);

        assert!(matches!(err, GitLabToolingError::ApiError { status: 401, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_open_merge_requests_only_adds_state_filter() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                format!("{PROJECT_PATH}/merge_requests?state=opened").as_str(),
            )
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let config = GitLabConfig {
            open_merge_requests_only: true,
            ..config(&server)
        };
        let client = GitLabClient::new(&config, None).unwrap();
        let merge_requests = assert_ok!(client.fetch_merge_requests(&reference(&server)).await);

        assert!(merge_requests.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_branches_use_update_order() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                format!("{PROJECT_PATH}/repository/branches?order_by=updated_at").as_str(),
            )
            .with_status(200)
            .with_body(json!([{"name": "main", "default": true}]).to_string())
            .create_async()
            .await;

        let client = GitLabClient::new(&config(&server), None).unwrap();
        let branches = client.fetch_branches(&reference(&server)).await.unwrap();

        assert_eq!(branches.len(), 1);
        assert!(branches[0].default);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", format!("{PROJECT_PATH}/pipelines").as_str())
            .with_status(200)
            .with_body(json!([pipeline_json(5, "success")]).to_string())
            .expect(1)
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(temp_dir.path(), Duration::from_secs(3_600));
        let client = GitLabClient::new(&config(&server), Some(cache)).unwrap();
        let reference = reference(&server);

        let first = client.fetch_pipelines(&reference).await.unwrap();
        let second = client.fetch_pipelines(&reference).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second[0].id, 5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_responses_are_not_cached() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", format!("{PROJECT_PATH}/releases").as_str())
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(temp_dir.path(), Duration::from_secs(3_600));
        let client = GitLabClient::new(&config(&server), Some(cache)).unwrap();
        let reference = reference(&server);

        assert!(client.fetch_releases(&reference).await.is_err());
        assert!(client.fetch_releases(&reference).await.is_err());

        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_without_retries_is_an_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", format!("{PROJECT_PATH}/pipelines").as_str())
            .with_status(429)
            .with_header("retry-after", "1")
            .expect(1)
            .create_async()
            .await;

        let client = GitLabClient::new(&config(&server), None).unwrap();
        let err = client
            .fetch_pipelines(&reference(&server))
            .await
            .unwrap_err();

        assert!(matches!(err, GitLabToolingError::ApiError { status: 429, .. }));
        assert!(err.to_string().ends_with("failed with status: 429"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", format!("{PROJECT_PATH}/pipelines").as_str())
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(2)
            .create_async()
            .await;

        let config = GitLabConfig {
            rate_limit_retries: 1,
            ..config(&server)
        };
        let client = GitLabClient::new(&config, None).unwrap();

        assert!(client.fetch_pipelines(&reference(&server)).await.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unexpected_payload_is_a_decode_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", format!("{PROJECT_PATH}/repository/tags").as_str())
            .with_status(200)
            .with_body(json!({"message": "not a list"}).to_string())
            .create_async()
            .await;

        let client = GitLabClient::new(&config(&server), None).unwrap();
        let err = client.fetch_tags(&reference(&server)).await.unwrap_err();

        assert!(matches!(err, GitLabToolingError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_retry_pipeline_posts_and_evicts_cached_list() {
        let mut server = Server::new_async().await;
        let list = server
            .mock("GET", format!("{PROJECT_PATH}/pipelines").as_str())
            .with_status(200)
            .with_body(json!([pipeline_json(9, "failed")]).to_string())
            .expect(2)
            .create_async()
            .await;
        let retry = server
            .mock("POST", format!("{PROJECT_PATH}/pipelines/9/retry").as_str())
            .match_header("private-token", "secret-token")
            .with_status(201)
            .with_body(pipeline_json(9, "pending").to_string())
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(temp_dir.path(), Duration::from_secs(3_600));
        let client = GitLabClient::new(&config(&server), Some(cache)).unwrap();
        let reference = reference(&server);

        client.fetch_pipelines(&reference).await.unwrap();
        let pipeline = client.retry_pipeline(&reference, 9).await.unwrap();
        assert_eq!(pipeline.status, "pending");

        // The list was evicted, so this goes back to the server.
        client.fetch_pipelines(&reference).await.unwrap();

        retry.assert_async().await;
        list.assert_async().await;
    }
}
