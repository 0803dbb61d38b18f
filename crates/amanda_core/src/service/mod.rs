//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Take the caller's session explicitly; services are built per request.

pub mod enrichment;
pub mod keyword_service;
pub mod post_service;
pub mod search_service;
