pub mod backfill;
pub mod cache;
pub mod dataset;
pub mod github_pull;
pub mod retry;
