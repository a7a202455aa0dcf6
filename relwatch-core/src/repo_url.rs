//! GitHub repository URL parsing
//!
//! Accepts `https://github.com/<owner>/<name>[/anything][?query][#fragment]`.

use std::fmt;

use url::Url;

use crate::error::TrackerError;

const GITHUB_HOST: &str = "github.com";

/// `(owner, name)` pair extracted from a repository URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parse a GitHub repository URL into its owner and name.
///
/// # Example
/// ```
/// use relwatch_core::repo_url::parse_github_url;
///
/// let repo = parse_github_url("https://github.com/tokio-rs/tokio/releases").unwrap();
/// assert_eq!(repo.owner, "tokio-rs");
/// assert_eq!(repo.name, "tokio");
/// assert!(parse_github_url("not-a-url").is_err());
/// ```
pub fn parse_github_url(input: &str) -> Result<RepoRef, TrackerError> {
    let trimmed = input.trim();
    let invalid = |reason| TrackerError::invalid_url(trimmed, reason);

    let url = Url::parse(trimmed).map_err(|_| invalid("not an absolute URL"))?;

    if url.scheme() != "https" {
        return Err(invalid("scheme must be https"));
    }
    if url.host_str() != Some(GITHUB_HOST) {
        return Err(invalid("host must be github.com"));
    }

    let mut segments = url
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty());

    let (Some(owner), Some(name)) = (segments.next(), segments.next()) else {
        return Err(invalid("path must be /<owner>/<name>"));
    };

    let name = name.strip_suffix(".git").unwrap_or(name);
    if name.is_empty() {
        return Err(invalid("repository name is empty"));
    }

    Ok(RepoRef {
        owner: owner.to_owned(),
        name: name.to_owned(),
    })
}
