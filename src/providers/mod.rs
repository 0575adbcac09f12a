mod gitlab;

pub use gitlab::{
    parse_block, Branch, Category, ExcludeSet, FetchResult, GitLabProvider, MergeRequest,
    Pipeline, Project, Release, RepositoryReference, ResponseCache, Tag,
};

#[cfg(test)]
pub use gitlab::CategoryData;
