mod progress;
mod sections;
mod styling;
mod summary;
mod tables;

pub use progress::FetchProgress;
pub use sections::invalid_repository_message;
pub use styling::{dim, magenta_bold};
pub use summary::print_summary;

/// Prints the `gitlab-tooling` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🦊 gitlab-tooling"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("GitLab repository overview")
    );
}
