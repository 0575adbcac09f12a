use log::debug;
use serde::Serialize;

use crate::error::Result;
use crate::output::FetchProgress;
use crate::providers::{
    parse_block, Category, ExcludeSet, FetchResult, GitLabProvider, RepositoryReference,
};

/// Outcome of rendering one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RenderOutcome {
    /// The block has no usable repository reference
    Invalid { source: String },
    Rendered(RenderedBlock),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedBlock {
    pub reference: RepositoryReference,
    pub exclude: ExcludeSet,
    pub result: FetchResult,
}

/// Parses `block` and fetches its repository data.
///
/// A block without a valid reference for `instance_url` yields
/// [`RenderOutcome::Invalid`] without any request.
///
/// # Errors
///
/// Returns the project-details failure of the referenced repository.
pub async fn render_block(
    provider: &GitLabProvider,
    instance_url: &str,
    block: &str,
) -> Result<RenderOutcome> {
    let spec = parse_block(instance_url, block);

    let Some(reference) = spec.source_info else {
        debug!("No valid GitLab repository reference in block");
        return Ok(RenderOutcome::Invalid {
            source: block.trim().to_string(),
        });
    };

    if spec.exclude.is_empty() {
        debug!("Rendering {}", reference.group_path);
    } else {
        debug!(
            "Rendering {} (excluding {})",
            reference.group_path,
            spec.exclude
                .iter()
                .map(Category::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let progress = FetchProgress::start(&reference.repo_slug);
    match provider.fetch_gitlab_data(&reference, &spec.exclude).await {
        Ok(result) => {
            progress.finish();
            Ok(RenderOutcome::Rendered(RenderedBlock {
                reference,
                exclude: spec.exclude,
                result,
            }))
        }
        Err(e) => {
            progress.fail();
            Err(e)
        }
    }
}
