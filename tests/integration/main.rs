//! Integration tests for geosweep
//!
//! These tests use wiremock to stand in for the map search backend and run
//! whole crawls against on-disk SQLite databases.

mod common;
mod config_tests;
mod crawl_tests;
