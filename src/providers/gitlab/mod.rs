mod cache;
mod client;
mod fetch_result;
mod provider;
mod source;
mod types;

pub use cache::ResponseCache;
pub use fetch_result::FetchResult;
pub use provider::GitLabProvider;
pub use source::{parse_block, Category, ExcludeSet, RepositoryReference};
pub use types::{Branch, MergeRequest, Pipeline, Project, Release, Tag};

#[cfg(test)]
pub use fetch_result::CategoryData;
