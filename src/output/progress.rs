use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_red, toned, Tone};

/// Spinner shown while a repository is being fetched
pub struct FetchProgress {
    pb: ProgressBar,
    repo_slug: String,
}

impl FetchProgress {
    pub fn start(repo_slug: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        // Static template, parsing cannot fail; keep the default style if it ever does
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(
            toned(
                format!("Retrieving data for '{repo_slug}' from GitLab"),
                Tone::Pending,
            )
            .to_string(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            repo_slug: repo_slug.to_string(),
        }
    }

    pub fn finish(self) {
        self.pb.finish_with_message(
            toned(format!("Retrieved data for '{}' ✓", self.repo_slug), Tone::Good).to_string(),
        );
    }

    pub fn fail(self) {
        self.pb.abandon_with_message(
            bright_red(format!("Retrieving data for '{}' failed ✗", self.repo_slug)).to_string(),
        );
    }
}
