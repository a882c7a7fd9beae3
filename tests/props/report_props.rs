//! Property-based tests for report row rendering.

use chrono::{TimeZone, Utc};
use devtrack::registry::DeviceRecord;
use devtrack::report::render_row;
use proptest::prelude::*;

fn record_with(
    address: &str,
    port: u16,
    uplink: u64,
    downlink: u64,
    count: u64,
    tag: &str,
) -> DeviceRecord {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let mut record = DeviceRecord::new(address, port, now);
    record.total_uplink = uplink;
    record.total_downlink = downlink;
    record.connection_count = count;
    record.protocols.insert("TCP".to_string());
    if !tag.is_empty() {
        record.tags.insert(tag.to_string());
    }
    record
}

proptest! {
    /// A row is a single line and never shorter than the nominal width
    #[test]
    fn row_is_one_line_at_nominal_width(
        address in "[0-9a-f.:]{1,40}",
        port in 0u16..,
        up in 0u64..u64::from(u32::MAX),
        down in 0u64..u64::from(u32::MAX),
        count in 0u64..1_000_000,
        tag in "[a-z0-9-]{0,30}",
    ) {
        let row = render_row(&record_with(&address, port, up, down, count, &tag));
        prop_assert!(row.ends_with('\n'));
        prop_assert_eq!(row.matches('\n').count(), 1);
        // Column minimum widths plus separators put a floor on the length.
        prop_assert!(row.len() >= 158, "row too short: {}", row.len());
    }

    /// Whole binary megabytes render with trailing .00
    #[test]
    fn whole_mebibytes_render_exactly(mib in 0u64..4096) {
        let expected = format!("{}.00", mib);
        let row = render_row(&record_with("10.0.0.1", 80, mib * 1024 * 1024, 0, 1, "t"));
        prop_assert!(row.contains(&expected), "row is missing {}", expected);
    }

    /// Overlong values are pushed out, never cut
    #[test]
    fn long_values_never_truncated(tag in "[a-z]{20,40}") {
        let row = render_row(&record_with("10.0.0.1", 80, 0, 0, 1, &tag));
        prop_assert!(row.contains(&tag));
    }

    /// The address always opens the row
    #[test]
    fn address_opens_row(address in "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}") {
        let row = render_row(&record_with(&address, 80, 0, 0, 1, "t"));
        prop_assert!(row.starts_with(&address));
    }
}
