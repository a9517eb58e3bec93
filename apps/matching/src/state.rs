use crate::config::Config;
use crate::matching::repository::MatchingRepository;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub repo: MatchingRepository,
    pub config: Config,
}
