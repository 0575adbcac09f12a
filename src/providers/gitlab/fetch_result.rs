use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{GitLabToolingError, Result};

use super::source::Category;
use super::types::{Branch, MergeRequest, Pipeline, Project, Release, Tag};

/// Message reported for a category whose host name did not resolve.
pub const HOST_NOT_REACHABLE: &str = "Host not reachable";

/// Fetched payload of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CategoryData {
    Branches(Vec<Branch>),
    MergeRequests(Vec<MergeRequest>),
    Pipelines(Vec<Pipeline>),
    Releases(Vec<Release>),
    Tags(Vec<Tag>),
}

impl CategoryData {
    /// Placeholder stored for a category that failed.
    pub fn empty(category: Category) -> Self {
        match category {
            Category::Branches => Self::Branches(Vec::new()),
            Category::MergeRequests => Self::MergeRequests(Vec::new()),
            Category::Pipelines => Self::Pipelines(Vec::new()),
            Category::Releases => Self::Releases(Vec::new()),
            Category::Tags => Self::Tags(Vec::new()),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::Branches(_) => Category::Branches,
            Self::MergeRequests(_) => Category::MergeRequests,
            Self::Pipelines(_) => Category::Pipelines,
            Self::Releases(_) => Category::Releases,
            Self::Tags(_) => Category::Tags,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Branches(items) => items.len(),
            Self::MergeRequests(items) => items.len(),
            Self::Pipelines(items) => items.len(),
            Self::Releases(items) => items.len(),
            Self::Tags(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Settled result of one category fetch.
#[derive(Debug)]
pub struct CategoryOutcome {
    pub category: Category,
    pub result: std::result::Result<CategoryData, String>,
}

impl CategoryOutcome {
    /// Turns a fetch result into an outcome, normalizing the error message.
    pub fn settle(category: Category, result: Result<CategoryData>) -> Self {
        Self {
            category,
            result: result.map_err(|e| error_message(&e)),
        }
    }
}

/// User facing message for a category error.
pub fn error_message(error: &GitLabToolingError) -> String {
    if error.is_host_unreachable() {
        HOST_NOT_REACHABLE.to_string()
    } else {
        error.to_string()
    }
}

/// Everything fetched for one block render.
///
/// Excluded categories appear in neither map. A failed category has its
/// message in `errors` and an empty list in `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    pub project: Project,
    pub data: BTreeMap<Category, CategoryData>,
    pub errors: BTreeMap<Category, String>,
}

impl FetchResult {
    pub fn assemble(project: Project, outcomes: impl IntoIterator<Item = CategoryOutcome>) -> Self {
        let mut data = BTreeMap::new();
        let mut errors = BTreeMap::new();

        for outcome in outcomes {
            match outcome.result {
                Ok(payload) => {
                    data.insert(payload.category(), payload);
                }
                Err(message) => {
                    data.insert(outcome.category, CategoryData::empty(outcome.category));
                    errors.insert(outcome.category, message);
                }
            }
        }

        Self {
            project,
            data,
            errors,
        }
    }

    pub fn error(&self, category: Category) -> Option<&str> {
        self.errors.get(&category).map(String::as_str)
    }

    pub fn branches(&self) -> &[Branch] {
        match self.data.get(&Category::Branches) {
            Some(CategoryData::Branches(items)) => items,
            _ => &[],
        }
    }

    pub fn merge_requests(&self) -> &[MergeRequest] {
        match self.data.get(&Category::MergeRequests) {
            Some(CategoryData::MergeRequests(items)) => items,
            _ => &[],
        }
    }

    pub fn pipelines(&self) -> &[Pipeline] {
        match self.data.get(&Category::Pipelines) {
            Some(CategoryData::Pipelines(items)) => items,
            _ => &[],
        }
    }

    pub fn releases(&self) -> &[Release] {
        match self.data.get(&Category::Releases) {
            Some(CategoryData::Releases(items)) => items,
            _ => &[],
        }
    }

    pub fn tags(&self) -> &[Tag] {
        match self.data.get(&Category::Tags) {
            Some(CategoryData::Tags(items)) => items,
            _ => &[],
        }
    }
}
