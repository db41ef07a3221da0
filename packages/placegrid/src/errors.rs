use thiserror::Error;

/// Failure inside one crawl iteration. These abort the current frontier
/// entry, never the whole run; the orchestrator logs them and picks the next
/// entry.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("could not classify page: {0}")]
    Classification(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("persistence failed: {0}")]
    Persistence(String),
}
