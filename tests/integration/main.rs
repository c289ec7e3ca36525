//! Integration test suite entry point.

mod cli_tests;
mod fixture;
mod geopackage_tests;
mod masking_tests;
