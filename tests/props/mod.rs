//! Property-based tests for registry accounting and report rendering.

pub mod report_props;
