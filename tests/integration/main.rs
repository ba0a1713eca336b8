//! Integration tests for the crawler
//!
//! These tests use wiremock to stand up a fake listing site and run full
//! crawls against it.

mod crawl_tests;
mod failure_tests;
