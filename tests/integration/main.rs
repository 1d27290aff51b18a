//! Integration tests
//!
//! These tests drive the download engine end-to-end against an in-memory
//! content source and wiremock servers serving page images and site HTML.

mod common;
mod shutdown_tests;
mod weeb_central_tests;
