use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Lines longer than this are never treated as a repository reference.
const MAX_SOURCE_LENGTH: usize = 200;
const API_PROJECTS_PATH: &str = "api/v4/projects";
const EXCLUDE_MARKER: &str = "exclude:";

/// An independently fetchable project resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Branches,
    MergeRequests,
    Pipelines,
    Releases,
    Tags,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Branches,
        Category::MergeRequests,
        Category::Pipelines,
        Category::Releases,
        Category::Tags,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Branches => "branches",
            Category::MergeRequests => "merge-requests",
            Category::Pipelines => "pipelines",
            Category::Releases => "releases",
            Category::Tags => "tags",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Categories a block opted out of.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExcludeSet(BTreeSet<Category>);

impl ExcludeSet {
    pub fn contains(&self, category: Category) -> bool {
        self.0.contains(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Category> for ExcludeSet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A validated project on the configured GitLab instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReference {
    /// REST endpoint prefix, e.g. `https://gitlab.com/api/v4/projects/group%2Fproject`
    pub api_repo_url: String,
    /// URL-decoded project path, e.g. `group/project`
    pub group_path: String,
    pub group_path_slug: String,
    /// Slug of the last path segment, stable per repository
    pub repo_slug: String,
}

/// The parsed body of a block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSpec {
    pub source_info: Option<RepositoryReference>,
    pub exclude: ExcludeSet,
}

/// Lowercase, hyphen-only form of `text`.
///
/// Every character that is not an ASCII letter becomes `-`, runs of `-`
/// collapse to one and leading/trailing hyphens are removed.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());

    for c in text.chars() {
        if c.is_ascii_alphabetic() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    slug.trim_matches('-').to_string()
}

/// Resolves one block line into a repository reference.
///
/// The line may be a full URL or a project path relative to `instance_url`.
/// Returns `None` when the line is empty, longer than 200 characters, names a
/// different host than `instance_url`, or has no project path. A reference
/// is only ever built for the configured host so the token is never sent
/// elsewhere.
pub fn resolve(instance_url: &str, raw_line: &str) -> Option<RepositoryReference> {
    let source = raw_line.trim();
    let length = source.chars().count();
    if length == 0 || length > MAX_SOURCE_LENGTH {
        return None;
    }

    let instance_url = instance_url.trim().trim_end_matches('/');
    let is_full_url = source.starts_with("http");

    let candidate_host = if is_full_url {
        normalize_host(source)
    } else {
        normalize_host(&format!("{instance_url}/{source}"))
    };

    if normalize_host(instance_url) != candidate_host {
        debug!("Ignoring '{source}': host does not match '{instance_url}'");
        return None;
    }

    let group_path = group_path(source, is_full_url);
    if group_path.is_empty() {
        return None;
    }

    let repo_slug = slugify(group_path.rsplit('/').next().unwrap_or_default());

    Some(RepositoryReference {
        api_repo_url: format!(
            "{instance_url}/{API_PROJECTS_PATH}/{}",
            urlencoding::encode(&group_path)
        ),
        group_path_slug: slugify(&group_path),
        repo_slug,
        group_path,
    })
}

/// Parses a block body into its repository reference and excludes.
///
/// Blank lines are skipped. A line containing `exclude:` sets the exclude
/// set; every other line is resolved as the reference. When several lines
/// qualify, the last one wins.
pub fn parse_block(instance_url: &str, block: &str) -> BlockSpec {
    block
        .lines()
        .filter(|line| !line.trim().is_empty())
        .fold(BlockSpec::default(), |mut spec, line| {
            if line.contains(EXCLUDE_MARKER) {
                spec.exclude = capture_excludes(line);
            } else {
                spec.source_info = resolve(instance_url, line);
            }
            spec
        })
}

/// Reads `exclude: a, b, c`, keeping only known categories.
fn capture_excludes(line: &str) -> ExcludeSet {
    let Some((_, items)) = line.split_once(EXCLUDE_MARKER) else {
        return ExcludeSet::default();
    };

    items
        .split(',')
        .filter_map(|item| item.trim().parse::<Category>().ok())
        .collect()
}

/// `host[:port]` of `url`, leaving out the default ports 80 and 443.
fn normalize_host(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            match parsed.port() {
                Some(port) if port != 80 && port != 443 => format!("{host}:{port}"),
                _ => host.to_string(),
            }
        }
        Err(_) => url.split('/').next().unwrap_or_default().to_string(),
    }
}

fn group_path(source: &str, is_full_url: bool) -> String {
    let raw_path = if is_full_url {
        Url::parse(source)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| source.to_string())
    } else {
        source.to_string()
    };

    let decoded = urlencoding::decode(&raw_path)
        .map(|path| path.into_owned())
        .unwrap_or(raw_path);

    decoded
        .replace(['\r', '\n'], "")
        .trim_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTANCE: &str = "https://gitlab.com";

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("--group//sub_group--"), "group-sub-group");
        assert_eq!(slugify("https://gitlab.com/a/b"), "https-gitlab-com-a-b");
        assert_eq!(slugify("v1.2.3"), "v");
        assert_eq!(slugify("123"), "");
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("Ünïcode"), "n-code");
    }

    #[test]
    fn test_slugify_is_idempotent_and_clean() {
        let inputs = [
            "https://gitlab.example.com:8443/api/v4/projects/group%2Fproject/merge_requests?state=opened",
            "  Mixed CASE -- input__with   gaps ",
            "---",
            "a",
            "Émile/Zola",
        ];

        for input in inputs {
            let slug = slugify(input);
            assert_eq!(slugify(&slug), slug, "not idempotent for {input:?}");
            assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c == '-'));
            assert!(!slug.contains("--"));
            assert!(!slug.starts_with('-') && !slug.ends_with('-'));
        }
    }

    #[test]
    fn test_resolve_full_url() {
        let reference = resolve(INSTANCE, "https://gitlab.com/group/sub/project").unwrap();

        assert_eq!(
            reference.api_repo_url,
            "https://gitlab.com/api/v4/projects/group%2Fsub%2Fproject"
        );
        assert_eq!(reference.group_path, "group/sub/project");
        assert_eq!(reference.group_path_slug, "group-sub-project");
        assert_eq!(reference.repo_slug, "project");
    }

    #[test]
    fn test_resolve_bare_path() {
        let reference = resolve(INSTANCE, "  /group/my-project  ").unwrap();
        assert_eq!(reference.group_path, "group/my-project");
        assert_eq!(
            reference.api_repo_url,
            "https://gitlab.com/api/v4/projects/group%2Fmy-project"
        );
        assert_eq!(reference.repo_slug, "my-project");
    }

    #[test]
    fn test_resolve_api_url_suffix_property() {
        let cases = [
            ("https://gitlab.com", "group/project"),
            ("https://gitlab.com/", "https://gitlab.com/group/project/"),
            ("http://git.local:8080", "http://git.local:8080/a/b/c"),
            ("https://gitlab.com", "https://gitlab.com:443/team/tool"),
        ];

        for (instance, line) in cases {
            let reference = resolve(instance, line).unwrap();
            let suffix = format!(
                "/api/v4/projects/{}",
                urlencoding::encode(&reference.group_path)
            );
            assert!(
                reference.api_repo_url.ends_with(&suffix),
                "{} does not end with {suffix}",
                reference.api_repo_url
            );
        }
    }

    #[test]
    fn test_resolve_decodes_path() {
        let reference = resolve(INSTANCE, "https://gitlab.com/group/my%20project").unwrap();
        assert_eq!(reference.group_path, "group/my project");
        assert_eq!(
            reference.api_repo_url,
            "https://gitlab.com/api/v4/projects/group%2Fmy%20project"
        );
    }

    #[test]
    fn test_resolve_rejects_invalid_lines() {
        assert!(resolve(INSTANCE, "").is_none());
        assert!(resolve(INSTANCE, "   ").is_none());
        assert!(resolve(INSTANCE, &"a".repeat(201)).is_none());
        assert!(resolve(INSTANCE, "https://gitlab.com").is_none());
        assert!(resolve(INSTANCE, &format!("group/{}", "a".repeat(194))).is_some());
    }

    #[test]
    fn test_resolve_rejects_other_hosts() {
        assert!(resolve(INSTANCE, "https://github.com/group/project").is_none());
        assert!(resolve(INSTANCE, "https://gitlab.com.evil.org/group/project").is_none());
        assert!(resolve("http://git.local:8080", "http://git.local:9090/group/project").is_none());
    }

    #[test]
    fn test_resolve_ignores_default_ports() {
        assert!(resolve("https://gitlab.com", "http://gitlab.com:80/group/project").is_some());
        assert!(resolve("https://gitlab.com:443", "https://gitlab.com/group/project").is_some());
    }

    #[test]
    fn test_parse_block_with_excludes() {
        let spec = parse_block(
            INSTANCE,
            "https://gitlab.com/group/project\nexclude: pipelines, bogus, tags\n",
        );

        let reference = spec.source_info.unwrap();
        assert_eq!(reference.group_path, "group/project");

        let excluded: Vec<_> = spec.exclude.iter().collect();
        assert_eq!(excluded, vec![Category::Pipelines, Category::Tags]);
    }

    #[test]
    fn test_parse_block_defaults() {
        let spec = parse_block(INSTANCE, "group/project");
        assert!(spec.source_info.is_some());
        assert!(spec.exclude.is_empty());

        let spec = parse_block(INSTANCE, "");
        assert_eq!(spec, BlockSpec::default());
    }

    #[test]
    fn test_parse_block_last_reference_wins() {
        let spec = parse_block(INSTANCE, "group/first\r\n\r\ngroup/second\r\n");
        assert_eq!(spec.source_info.unwrap().group_path, "group/second");

        // A trailing foreign line still replaces an earlier valid one.
        let spec = parse_block(INSTANCE, "group/first\nhttps://github.com/a/b");
        assert!(spec.source_info.is_none());
    }

    #[test]
    fn test_parse_block_exclude_without_items() {
        let spec = parse_block(INSTANCE, "group/project\nexclude:   ");
        assert!(spec.exclude.is_empty());
    }

    #[test]
    fn test_category_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert_eq!(
            "merge_requests".parse::<Category>(),
            Err(UnknownCategory("merge_requests".to_string()))
        );
        assert_eq!(
            serde_json::to_string(&Category::MergeRequests).unwrap(),
            "\"merge-requests\""
        );
    }
}
