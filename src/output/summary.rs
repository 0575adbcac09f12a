use std::fmt::Write;

use chrono::{DateTime, Utc};
use comfy_table::Cell;

use crate::config::DisplayConfig;
use crate::providers::Category;
use crate::renderer::{RenderOutcome, RenderedBlock};

use super::sections::{
    build_sections, invalid_repository_message, project_card, Field, Section, SectionBody,
};
use super::styling::{bright, bright_red, cyan, dim};
use super::tables::{color_coded_status_cell, create_cyan_header, create_table};

/// Prints a human-readable rendering of a block to stdout.
///
/// Shows the project card followed by one table per section:
/// - Merge requests with their unresolved review thread counts
/// - The two most recent pipelines, status color coded
/// - Branches, releases and tags
///
/// Failed categories print their error in place of the table.
pub fn print_summary(
    outcome: &RenderOutcome,
    display: &DisplayConfig,
    open_merge_requests_only: bool,
) {
    println!(
        "{}",
        render_summary(outcome, display, open_merge_requests_only, Utc::now())
    );
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn section_emoji(category: Category) -> &'static str {
    match category {
        Category::MergeRequests => "🔀",
        Category::Pipelines => "🚀",
        Category::Branches => "🌿",
        Category::Releases => "📦",
        Category::Tags => "🏷️",
    }
}

fn format_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| format!("{}: {}", field.label, field.value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_section(output: &mut String, section: &Section, compact: bool) {
    add_section_header(output, section_emoji(section.category), section.header);

    let items = match &section.body {
        SectionBody::Error(message) => {
            let _ = writeln!(output, "  {}\n", bright_red(message));
            return;
        }
        SectionBody::Items(items) if items.is_empty() => {
            let _ = writeln!(output, "  {}\n", dim("Nothing to show."));
            return;
        }
        SectionBody::Items(items) => items,
    };

    let with_status = items.iter().any(|item| item.status.is_some());

    let mut labels = vec!["Title", section.date_label];
    if with_status {
        labels.push("Status");
    }
    if !compact {
        labels.push("Details");
    }

    let mut table = create_table();
    table.set_header(create_cyan_header(&labels));

    for item in items {
        let title = match &item.url {
            Some(url) => format!("{}\n{url}", item.title),
            None => item.title.clone(),
        };

        let mut row = vec![Cell::new(title), Cell::new(&item.elapsed)];
        if with_status {
            row.push(
                item.status
                    .as_deref()
                    .map_or_else(|| Cell::new(""), color_coded_status_cell),
            );
        }
        if !compact {
            row.push(Cell::new(format_fields(&item.fields)));
        }
        table.add_row(row);
    }

    let _ = writeln!(output, "{table}\n");
}

fn render_block(
    output: &mut String,
    block: &RenderedBlock,
    display: &DisplayConfig,
    open_merge_requests_only: bool,
    now: DateTime<Utc>,
) {
    let card = project_card(&block.result.project, display.compact_info_card, now);

    add_section_header(output, "📁", &card.title);
    let _ = writeln!(output, "  {}", cyan(&card.url));

    if let Some(summary) = &card.summary {
        let _ = writeln!(output, "  {}\n", dim(summary));
    } else {
        let mut table = create_table();
        for field in &card.fields {
            table.add_row(vec![Cell::new(field.label), Cell::new(&field.value)]);
        }
        let _ = writeln!(output, "{table}\n");
    }

    let sections = build_sections(
        &block.result,
        &block.exclude,
        display,
        open_merge_requests_only,
        now,
    );
    for section in &sections {
        render_section(output, section, display.compact_mode);
    }
}

pub fn render_summary(
    outcome: &RenderOutcome,
    display: &DisplayConfig,
    open_merge_requests_only: bool,
    now: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    match outcome {
        RenderOutcome::Invalid { source } => {
            let _ = writeln!(output, "{}", bright_red(invalid_repository_message(source)));
        }
        RenderOutcome::Rendered(block) => {
            render_block(&mut output, block, display, open_merge_requests_only, now);
        }
    }

    output
}
