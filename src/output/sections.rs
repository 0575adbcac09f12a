//! Presentation model of a rendered block.
//!
//! Turns a [`FetchResult`] into ordered, limited sections of display items.
//! Nothing here touches the terminal; `summary` draws these.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DisplayConfig;
use crate::providers::{
    Branch, Category, ExcludeSet, FetchResult, MergeRequest, Pipeline, Project, Release, Tag,
};
use crate::time_units::elapsed_time;

pub const DEFAULT_LIMIT: usize = 5;
pub const PIPELINE_LIMIT: usize = 2;
const MAX_INVALID_SOURCE_CHARS: usize = 65;
const SHORT_SHA_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

impl Field {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionItem {
    pub title: String,
    pub url: Option<String>,
    /// Elapsed time since the item's date, e.g. "3 days ago"
    pub elapsed: String,
    pub status: Option<String>,
    /// Empty in compact mode
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SectionBody {
    Items(Vec<SectionItem>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub category: Category,
    pub header: &'static str,
    pub date_label: &'static str,
    pub body: SectionBody,
}

/// The project header shown above the sections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectCard {
    pub title: String,
    pub url: String,
    /// One-line summary used by the compact info card
    pub summary: Option<String>,
    pub fields: Vec<Field>,
}

/// One fetched record as a section entry.
trait ContentItem {
    const DATE_LABEL: &'static str;

    fn title(&self) -> String;
    fn url(&self) -> Option<String>;
    fn date(&self) -> Option<DateTime<Utc>>;
    fn fields(&self) -> Vec<Field>;

    fn status(&self) -> Option<String> {
        None
    }
}

impl ContentItem for MergeRequest {
    const DATE_LABEL: &'static str = "Updated";

    fn title(&self) -> String {
        if self.draft {
            format!("Draft: {}", self.title.trim_start_matches("Draft: "))
        } else {
            self.title.clone()
        }
    }

    fn url(&self) -> Option<String> {
        Some(self.web_url.clone())
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }

    fn fields(&self) -> Vec<Field> {
        vec![
            Field::new("Author", format!("{} (@{})", self.author.name, self.author.username)),
            Field::new(
                "Branch",
                format!("{} → {}", self.source_branch, self.target_branch),
            ),
            Field::new("Unresolved threads", self.review_threads.len().to_string()),
        ]
    }

    fn status(&self) -> Option<String> {
        Some(self.state.clone())
    }
}

impl ContentItem for Pipeline {
    const DATE_LABEL: &'static str = "Created";

    fn title(&self) -> String {
        format!("#{} {}", self.id, self.ref_)
    }

    fn url(&self) -> Option<String> {
        Some(self.web_url.clone())
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::new(
            "Commit",
            self.sha.chars().take(SHORT_SHA_CHARS).collect::<String>(),
        )];
        if let Some(source) = &self.source {
            fields.push(Field::new("Source", source.clone()));
        }
        fields
    }

    fn status(&self) -> Option<String> {
        Some(self.status.clone())
    }
}

impl ContentItem for Branch {
    const DATE_LABEL: &'static str = "Last commit";

    fn title(&self) -> String {
        self.name.clone()
    }

    fn url(&self) -> Option<String> {
        self.web_url.clone()
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        self.commit
            .as_ref()
            .and_then(|commit| commit.committed_date.or(commit.created_at))
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if let Some(commit) = &self.commit {
            fields.push(Field::new("Commit", commit.title.clone()));
        }

        let flags: Vec<&str> = [
            (self.default, "default"),
            (self.protected, "protected"),
            (self.merged, "merged"),
        ]
        .into_iter()
        .filter_map(|(set, flag)| set.then_some(flag))
        .collect();
        if !flags.is_empty() {
            fields.push(Field::new("Flags", flags.join(", ")));
        }

        fields
    }
}

impl ContentItem for Release {
    const DATE_LABEL: &'static str = "Released";

    fn title(&self) -> String {
        self.name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.tag_name.clone())
    }

    fn url(&self) -> Option<String> {
        self.links.as_ref().and_then(|links| links.self_url.clone())
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        self.released_at.or(self.created_at)
    }

    fn fields(&self) -> Vec<Field> {
        vec![Field::new("Tag", self.tag_name.clone())]
    }
}

impl ContentItem for Tag {
    const DATE_LABEL: &'static str = "Committed";

    fn title(&self) -> String {
        self.name.clone()
    }

    fn url(&self) -> Option<String> {
        None
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        self.commit
            .as_ref()
            .and_then(|commit| commit.committed_date.or(commit.created_at))
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if let Some(commit) = &self.commit {
            fields.push(Field::new("Commit", commit.short_id.clone()));
        }
        if let Some(message) = self.message.as_deref().map(str::trim) {
            if !message.is_empty() {
                fields.push(Field::new("Message", message));
            }
        }
        fields
    }
}

fn to_item<T: ContentItem>(record: &T, compact: bool, now: DateTime<Utc>) -> SectionItem {
    SectionItem {
        title: record.title(),
        url: record.url(),
        elapsed: record
            .date()
            .map_or_else(|| "unknown".to_string(), |date| elapsed_time(date, now)),
        status: record.status(),
        fields: if compact { Vec::new() } else { record.fields() },
    }
}

struct SectionContext<'a> {
    result: &'a FetchResult,
    compact: bool,
    now: DateTime<Utc>,
}

impl SectionContext<'_> {
    fn section<T: ContentItem>(
        &self,
        category: Category,
        header: &'static str,
        records: &[T],
        limit: usize,
    ) -> Section {
        let body = match self.result.error(category) {
            Some(message) => SectionBody::Error(message.to_string()),
            None => SectionBody::Items(
                records
                    .iter()
                    .take(limit)
                    .map(|record| to_item(record, self.compact, self.now))
                    .collect(),
            ),
        };

        Section {
            category,
            header,
            date_label: T::DATE_LABEL,
            body,
        }
    }
}

/// Builds the display sections of `result`.
///
/// Order is merge requests, pipelines, branches, releases, tags. Excluded
/// categories are left out. Pipelines show at most 2 items, every other
/// section at most 5.
pub fn build_sections(
    result: &FetchResult,
    exclude: &ExcludeSet,
    display: &DisplayConfig,
    open_merge_requests_only: bool,
    now: DateTime<Utc>,
) -> Vec<Section> {
    let context = SectionContext {
        result,
        compact: display.compact_mode,
        now,
    };

    let merge_requests_header = if open_merge_requests_only {
        "Open Merge Requests"
    } else {
        "Merge Requests"
    };

    [
        context.section(
            Category::MergeRequests,
            merge_requests_header,
            result.merge_requests(),
            DEFAULT_LIMIT,
        ),
        context.section(
            Category::Pipelines,
            "Pipelines",
            result.pipelines(),
            PIPELINE_LIMIT,
        ),
        context.section(
            Category::Branches,
            "Branches",
            result.branches(),
            DEFAULT_LIMIT,
        ),
        context.section(
            Category::Releases,
            "Releases",
            result.releases(),
            DEFAULT_LIMIT,
        ),
        context.section(Category::Tags, "Tags", result.tags(), DEFAULT_LIMIT),
    ]
    .into_iter()
    .filter(|section| !exclude.contains(section.category))
    .collect()
}

pub fn project_card(project: &Project, compact_info_card: bool, now: DateTime<Utc>) -> ProjectCard {
    let title = format!("Git Repository: {}", project.name);

    if compact_info_card {
        let mut summary = format!(
            "{} · ★ {} · {} forks",
            project.path_with_namespace, project.star_count, project.forks_count
        );
        if let Some(branch) = &project.default_branch {
            summary.push_str(&format!(" · {branch}"));
        }

        return ProjectCard {
            title,
            url: project.web_url.clone(),
            summary: Some(summary),
            fields: Vec::new(),
        };
    }

    let mut fields = vec![Field::new("Path", project.path_with_namespace.clone())];
    if let Some(description) = project.description.as_deref().map(str::trim) {
        if !description.is_empty() {
            fields.push(Field::new("Description", description));
        }
    }
    if let Some(branch) = &project.default_branch {
        fields.push(Field::new("Default branch", branch.clone()));
    }
    if let Some(visibility) = &project.visibility {
        fields.push(Field::new("Visibility", visibility.clone()));
    }
    fields.push(Field::new("Stars", project.star_count.to_string()));
    fields.push(Field::new("Forks", project.forks_count.to_string()));
    if let Some(open_issues) = project.open_issues_count {
        fields.push(Field::new("Open issues", open_issues.to_string()));
    }
    if let Some(last_activity) = project.last_activity_at {
        fields.push(Field::new("Last activity", elapsed_time(last_activity, now)));
    }

    ProjectCard {
        title,
        url: project.web_url.clone(),
        summary: None,
        fields,
    }
}

/// Placeholder text for a block without a usable repository reference.
pub fn invalid_repository_message(source: &str) -> String {
    let truncated = if source.chars().count() > MAX_INVALID_SOURCE_CHARS {
        let head: String = source.chars().take(MAX_INVALID_SOURCE_CHARS).collect();
        format!("{head}...")
    } else {
        source.to_string()
    };
    format!("Invalid GitLab Repository: {truncated}")
}
