//! Integration tests module
//!
//! This module provides end-to-end integration tests for the crawler,
//! including:
//! - Listing → article → sink crawl jobs against a mock server
//! - Retry, abandonment and seed-failure handling
//! - Pagination properties

pub mod crawl_test;
pub mod fixtures;
pub mod pagination_test;
