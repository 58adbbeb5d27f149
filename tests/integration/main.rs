//! Integration tests for Site-Mirror

mod cli_tests;
mod crawl_tests;
