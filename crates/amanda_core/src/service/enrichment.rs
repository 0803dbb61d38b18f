//! Post enrichment contract.
//!
//! The analytics/image service lives outside the core. This module only
//! fixes what the post-creation workflow expects back from it.

use crate::repo::post_repo::PostEnrichmentUpdate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Suggested keywords kept from one enrichment response.
pub const SUGGESTED_KEYWORD_LIMIT: usize = 3;

/// Enrichment collaborator failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    /// Remote service could not be reached or answered non-success.
    Unavailable(String),
    /// Response body did not have the expected shape.
    InvalidResponse(String),
}

impl Display for EnrichmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "enrichment service unavailable: {message}"),
            Self::InvalidResponse(message) => {
                write!(f, "invalid enrichment response: {message}")
            }
        }
    }
}

impl Error for EnrichmentError {}

/// A keyword suggestion with the service's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub keyword: String,
    pub confidence_score: f64,
}

/// Analytics returned for one post body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enrichment {
    pub summary: Option<String>,
    pub sentiment: Option<f64>,
    pub image_hrefs: Vec<String>,
    pub keywords: Vec<ScoredKeyword>,
}

impl Enrichment {
    /// Returns up to three suggested keywords, highest confidence first.
    pub fn suggested_keywords(&self) -> Vec<String> {
        let mut scored: Vec<&ScoredKeyword> = self
            .keywords
            .iter()
            .filter(|entry| !entry.keyword.trim().is_empty() && !entry.keyword.contains(','))
            .collect();
        scored.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));
        scored
            .into_iter()
            .take(SUGGESTED_KEYWORD_LIMIT)
            .map(|entry| entry.keyword.clone())
            .collect()
    }

    /// Projects the fields persisted on the post.
    pub fn to_post_update(&self) -> PostEnrichmentUpdate {
        PostEnrichmentUpdate {
            summary: self.summary.clone(),
            image_href: self.image_hrefs.first().cloned(),
            sentiment: self.sentiment,
        }
    }
}

/// External enrichment collaborator.
pub trait PostEnricher {
    /// Analyzes one post body.
    fn enrich(&self, content: &str) -> Result<Enrichment, EnrichmentError>;
}

#[cfg(test)]
mod tests {
    use super::{Enrichment, ScoredKeyword};

    fn scored(keyword: &str, confidence_score: f64) -> ScoredKeyword {
        ScoredKeyword {
            keyword: keyword.to_string(),
            confidence_score,
        }
    }

    #[test]
    fn suggested_keywords_keep_top_three_by_confidence() {
        let enrichment = Enrichment {
            keywords: vec![
                scored("low", 0.1),
                scored("top", 0.9),
                scored("mid", 0.5),
                scored("high", 0.8),
                scored("a,b", 0.95),
            ],
            ..Enrichment::default()
        };
        assert_eq!(enrichment.suggested_keywords(), vec!["top", "high", "mid"]);
    }

    #[test]
    fn post_update_uses_first_image() {
        let enrichment: Enrichment = serde_json::from_str(
            r#"{ "sentiment": 0.4, "image_hrefs": ["one.png", "two.png"] }"#,
        )
        .unwrap();
        let update = enrichment.to_post_update();
        assert_eq!(update.image_href.as_deref(), Some("one.png"));
        assert_eq!(update.sentiment, Some(0.4));
        assert!(update.summary.is_none());
    }
}
