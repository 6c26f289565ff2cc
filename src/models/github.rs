use serde::{Deserialize, Serialize};

/// Wire shape of the repository endpoint, trimmed to the fields we map.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoWireResponse {
    pub full_name: String,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
}

/// Canonical repository stats payload. `fallback` marks a degraded
/// zeroed response substituted after the live path was exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoStats {
    pub full_name: String,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub fallback: bool,
}

impl RepoStats {
    pub fn from_wire(wire: RepoWireResponse) -> Self {
        Self {
            full_name: wire.full_name,
            stars: wire.stargazers_count,
            forks: wire.forks_count,
            open_issues: wire.open_issues_count,
            fallback: false,
        }
    }

    pub fn fallback_for(owner: &str, repo: &str) -> Self {
        Self {
            full_name: format!("{}/{}", owner, repo),
            stars: 0,
            forks: 0,
            open_issues: 0,
            fallback: true,
        }
    }
}
