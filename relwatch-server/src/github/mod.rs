//! GitHub API integration.
//!
//! Provides a reqwest-based client for the two REST endpoints relwatch
//! needs: repository metadata and the latest release.

mod client;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::{GitHubClient, GitHubConfig, GitHubError, DEFAULT_API_URL};
pub use types::{GitHubRelease, GitHubRepository};
