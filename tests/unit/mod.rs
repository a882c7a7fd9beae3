//! Unit tests exercising the public API surface module by module.

pub mod report_tests;
