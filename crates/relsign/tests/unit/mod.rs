//! Unit tests for relsign binary crate components.

mod error_handling_test;
