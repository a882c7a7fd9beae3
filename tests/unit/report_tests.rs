//! Unit tests for report rendering and file layout.

use chrono::{DateTime, TimeZone, Utc};
use devtrack::registry::DeviceRecord;
use devtrack::report::{month_stamp, render_row, report_filename, MonthlyReport};
use tempfile::TempDir;

fn fixed_time(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

fn sample_record() -> DeviceRecord {
    let mut record = DeviceRecord::new("203.0.113.5", 51000, fixed_time(2026, 8, 1, 10, 0, 0));
    record.last_seen = fixed_time(2026, 8, 1, 10, 5, 0);
    record.total_uplink = 2 * 1024 * 1024;
    record.total_downlink = 1024 * 1024;
    record.connection_count = 1;
    record.protocols.insert("TCP".to_string());
    record.tags.insert("in1".to_string());
    record
}

#[test]
fn test_row_columns_start_at_fixed_offsets() {
    let row = render_row(&sample_record());

    assert_eq!(&row[0..15], "203.0.113.5    ");
    assert_eq!(&row[16..24], "51000   ");
    assert_eq!(&row[25..37], "Unknown     ");
    assert_eq!(&row[38..53], "Unknown        ");
    assert_eq!(&row[54..74], "2026-08-01 10:00:00 ");
    assert_eq!(&row[75..95], "2026-08-01 10:05:00 ");
    assert_eq!(&row[96..108], "2.00        ");
    assert_eq!(&row[109..121], "1.00        ");
    assert_eq!(&row[122..130], "1       ");
    assert_eq!(&row[131..141], "TCP       ");
    assert_eq!(&row[142..157], "in1            ");
    assert_eq!(&row[157..], "\n");
}

#[test]
fn test_row_fields_parse_back() {
    let row = render_row(&sample_record());
    let fields: Vec<&str> = row.split_whitespace().collect();

    // Timestamps split on the internal space, so 13 fields in total.
    assert_eq!(fields.len(), 13);
    assert_eq!(fields[0], "203.0.113.5");
    assert_eq!(fields[1], "51000");
    assert_eq!(fields[8], "2.00");
    assert_eq!(fields[9], "1.00");
    assert_eq!(fields[10], "1");
    assert_eq!(fields[11], "TCP");
    assert_eq!(fields[12], "in1");
}

#[test]
fn test_fractional_megabytes_round_to_two_decimals() {
    let mut record = sample_record();
    record.total_uplink = 1024 * 1024 + 512 * 1024; // 1.5 MiB
    record.total_downlink = 1;

    let row = render_row(&record);
    assert!(row.contains("1.50"));
    assert!(row.contains("0.00"));
}

#[test]
fn test_zero_traffic_renders_as_zero() {
    let mut record = sample_record();
    record.total_uplink = 0;
    record.total_downlink = 0;

    let row = render_row(&record);
    let fields: Vec<&str> = row.split_whitespace().collect();
    assert_eq!(fields[8], "0.00");
    assert_eq!(fields[9], "0.00");
}

#[test]
fn test_record_without_tags_renders_empty_column() {
    let mut record = sample_record();
    record.tags.clear();

    let row = render_row(&record);
    // The tag column is all padding; the row still has its nominal length.
    assert_eq!(row.len(), 158);
    assert_eq!(&row[142..157], "               ");
}

#[test]
fn test_month_stamp_pads_single_digit_months() {
    assert_eq!(month_stamp(fixed_time(2027, 3, 1, 0, 0, 0)), "2027-03");
    assert_eq!(report_filename("2027-03"), "devices_2027-03.txt");
}

#[test]
fn test_file_grows_by_snapshot_size_per_flush() {
    let temp_dir = TempDir::new().unwrap();
    let report = MonthlyReport::create(temp_dir.path(), fixed_time(2026, 8, 25, 9, 0, 0)).unwrap();

    let mut second = sample_record();
    second.address = "198.51.100.7".to_string();
    let records = vec![sample_record(), second];

    report.append(&records).unwrap();
    report.append(&records).unwrap();
    report.append(&records).unwrap();

    let contents = std::fs::read_to_string(report.path()).unwrap();
    assert_eq!(contents.lines().count(), 5 + 3 * 2);
}

#[test]
fn test_separator_line_is_160_dashes() {
    let temp_dir = TempDir::new().unwrap();
    let report = MonthlyReport::create(temp_dir.path(), fixed_time(2026, 8, 25, 9, 0, 0)).unwrap();

    let contents = std::fs::read_to_string(report.path()).unwrap();
    let separator = contents.lines().nth(4).unwrap();
    assert_eq!(separator.len(), 160);
    assert!(separator.chars().all(|c| c == '-'));
}
