//! Integration tests for the mirror
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! mirror runs end-to-end into temporary directories.

mod common;
mod mirror_tests;
