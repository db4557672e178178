use octocrab::models::{pulls::PullRequest, pulls::Review, Author};

use crate::{RawPullRequest, RawReview, RawUser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub owner: String,
    pub repo: String,
}

impl RepoInfo {
    /// Accepts `owner/repo` or a `https://github.com/owner/repo` URL.
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        let value = value.trim().trim_end_matches('/');
        let slug = match value.split_once("github.com/") {
            Some((_, slug)) => slug,
            None => value,
        };
        let slug = slug.trim_end_matches(".git");

        match slug.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(anyhow::anyhow!("Invalid repository reference: {value}")),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl From<&Author> for RawUser {
    fn from(author: &Author) -> Self {
        Self {
            login: author.login.clone(),
            name: None,
            avatar_url: Some(author.avatar_url.to_string()),
        }
    }
}

impl RawPullRequest {
    /// Size counters are only present on the detailed pull request payload, not
    /// on list results; missing ones count as zero.
    pub fn from_github(pr: PullRequest, reviews: Vec<Review>) -> Self {
        Self {
            number: Some(pr.number),
            author: pr.user.as_deref().map(RawUser::from),
            title: pr.title,
            created_at: pr.created_at,
            merged_at: pr.merged_at,
            additions: pr.additions.unwrap_or_default(),
            deletions: pr.deletions.unwrap_or_default(),
            changed_files: pr.changed_files.unwrap_or_default(),
            comments: pr.comments.unwrap_or_default(),
            reviews: reviews
                .iter()
                .map(|review| RawReview {
                    user: review.user.as_ref().map(RawUser::from),
                })
                .collect(),
        }
    }
}
