use std::future::Future;

use futures::future::try_join_all;
use log::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::providers::gitlab::cache::ResponseCache;
use crate::providers::gitlab::client::GitLabClient;

use super::fetch_result::{CategoryData, CategoryOutcome, FetchResult};
use super::source::{Category, ExcludeSet, RepositoryReference};
use super::types::{Discussion, MergeRequest, Note, Pipeline};

/// GitLab repository data provider.
///
/// Fetches project details and then every requested category of a single
/// repository, isolating category failures from each other.
pub struct GitLabProvider {
    pub client: GitLabClient,
}

impl GitLabProvider {
    /// Creates a provider from the loaded configuration.
    ///
    /// A response cache is attached only when caching is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured duration is malformed or no cache
    /// directory can be determined.
    pub fn new(config: &Config) -> Result<Self> {
        let cache = if config.cache.enabled {
            Some(ResponseCache::new(
                config.cache.directory()?,
                config.cache.ttl()?,
            ))
        } else {
            None
        };

        let client = GitLabClient::new(&config.gitlab, cache)?;
        if let Some(cache) = client.cache() {
            info!("Caching responses in {}", cache.directory().display());
        }

        Ok(Self { client })
    }

    /// Fetches everything a block render needs for `reference`.
    ///
    /// Project details are fetched first and alone; a failure there is
    /// returned as the error and no category request is issued. Afterwards
    /// every category not in `exclude` is fetched concurrently and settled
    /// on its own: a failed category ends up in `errors` with an empty list
    /// in `data`.
    ///
    /// # Errors
    ///
    /// Returns the project-details failure.
    pub async fn fetch_gitlab_data(
        &self,
        reference: &RepositoryReference,
        exclude: &ExcludeSet,
    ) -> Result<FetchResult> {
        info!("Fetching GitLab data for {}", reference.group_path);

        let project = self.client.fetch_project_details(reference).await?;

        let (branches, merge_requests, pipelines, releases, tags) = tokio::join!(
            settle(Category::Branches, exclude, async {
                self.client
                    .fetch_branches(reference)
                    .await
                    .map(CategoryData::Branches)
            }),
            settle(Category::MergeRequests, exclude, async {
                self.fetch_merge_requests_with_threads(reference)
                    .await
                    .map(CategoryData::MergeRequests)
            }),
            settle(Category::Pipelines, exclude, async {
                self.client
                    .fetch_pipelines(reference)
                    .await
                    .map(CategoryData::Pipelines)
            }),
            settle(Category::Releases, exclude, async {
                self.client
                    .fetch_releases(reference)
                    .await
                    .map(CategoryData::Releases)
            }),
            settle(Category::Tags, exclude, async {
                self.client
                    .fetch_tags(reference)
                    .await
                    .map(CategoryData::Tags)
            }),
        );

        let result = FetchResult::assemble(
            project,
            [branches, merge_requests, pipelines, releases, tags]
                .into_iter()
                .flatten(),
        );

        info!(
            "Fetched {} categories for {} ({} items, {} empty, {} failed)",
            result.data.len(),
            reference.group_path,
            result.data.values().map(CategoryData::len).sum::<usize>(),
            result.data.values().filter(|data| data.is_empty()).count(),
            result.errors.len()
        );

        Ok(result)
    }

    /// Retries the failed jobs of a pipeline in `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if GitLab rejects the retry.
    pub async fn retry_pipeline(
        &self,
        reference: &RepositoryReference,
        pipeline_id: u64,
    ) -> Result<Pipeline> {
        info!("Retrying pipeline {pipeline_id} of {}", reference.group_path);
        self.client.retry_pipeline(reference, pipeline_id).await
    }

    async fn fetch_merge_requests_with_threads(
        &self,
        reference: &RepositoryReference,
    ) -> Result<Vec<MergeRequest>> {
        let merge_requests = self.client.fetch_merge_requests(reference).await?;

        debug!(
            "Fetching discussions for {} merge requests concurrently",
            merge_requests.len()
        );

        // One failed discussions request fails the whole category
        try_join_all(
            merge_requests
                .into_iter()
                .map(|merge_request| self.attach_review_threads(reference, merge_request)),
        )
        .await
    }

    async fn attach_review_threads(
        &self,
        reference: &RepositoryReference,
        mut merge_request: MergeRequest,
    ) -> Result<MergeRequest> {
        let discussions = self
            .client
            .fetch_discussions(reference, merge_request.iid)
            .await?;
        merge_request.review_threads =
            unresolved_review_threads(merge_request.author.id, discussions);
        Ok(merge_request)
    }
}

/// Runs `fetch` unless `category` is excluded.
///
/// The future is only polled for included categories, so an excluded one
/// never sends a request.
async fn settle<F>(category: Category, exclude: &ExcludeSet, fetch: F) -> Option<CategoryOutcome>
where
    F: Future<Output = Result<CategoryData>>,
{
    if exclude.contains(category) {
        debug!("Skipping excluded category {category}");
        return None;
    }

    Some(CategoryOutcome::settle(category, fetch.await))
}

/// Notes that are resolvable, unresolved and not written by `author_id`,
/// in discussion order.
pub fn unresolved_review_threads(author_id: u64, discussions: Vec<Discussion>) -> Vec<Note> {
    discussions
        .into_iter()
        .flat_map(|discussion| discussion.notes)
        .filter(|note| note.is_open_review_thread(author_id))
        .collect()
}
