//! Core domain logic for the Amanda blog.
//! Keyword merge and post search live here; HTTP and rendering do not.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::keyword::{normalize_keyword, Keyword, KeywordId, PostKeyword};
pub use model::post::{NewPost, Post, PostId, PostValidationError, User, UserId};
pub use repo::keyword_repo::{KeywordRepository, SqliteKeywordRepository};
pub use repo::post_keyword_repo::{PostKeywordRepository, SqlitePostKeywordRepository};
pub use repo::post_repo::{PostEnrichmentUpdate, PostRepository, SqlitePostRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult, Upserted};
pub use service::enrichment::{Enrichment, EnrichmentError, PostEnricher, ScoredKeyword};
pub use service::keyword_service::{KeywordService, KeywordServiceError, MergeReport};
pub use service::post_service::{
    CreatedPost, FollowUpError, PostDetail, PostService, PostServiceError,
};
pub use service::search_service::{
    filter_by_author_substring, search_posts_or_empty, PostSearchQuery, PostSearchResponse,
    SearchService, SearchServiceError, RECENT_POST_LIMIT,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
