//! Production-Grade Test Suite for devtrack
//!
//! This suite exercises the tracker stack the way a host would in
//! production: hooks feeding routed trackers, background flushing to real
//! files, lifecycle shutdown, and sustained concurrent load.
//!
//! Test Categories:
//! 1. Integration Testing - Full pipeline behavior against real report files
//! 2. Stress Testing - High event rates and many concurrent writers
