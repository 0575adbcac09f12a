use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitLabToolingError {
    #[error("The host '{0}' is offline or the domain name cannot be resolved.")]
    HostUnreachable(String),

    #[error("Request '{url}' failed with status: {status}")]
    ApiError { url: String, status: u16 },

    #[error("An error occurred while fetching data from GitLab '{url}': {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request '{0}' timed out")]
    Timeout(String),

    #[error("Failed to decode response from '{url}': {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid time string: {0}")]
    InvalidDuration(String),
}

impl GitLabToolingError {
    /// Whether the failure came from resolving the instance host name.
    pub fn is_host_unreachable(&self) -> bool {
        matches!(self, Self::HostUnreachable(_))
    }
}

pub type Result<T> = std::result::Result<T, GitLabToolingError>;
