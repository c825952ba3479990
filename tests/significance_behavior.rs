//! Behavior tests for the mean-zero significance step, on raw values and
//! over gap files already on disk.

use std::fs;

use aurgap_core::export;
use aurgap_core::pipeline::scan_gap_directory;
use aurgap_core::significance::test_mean_zero;
use aurgap_core::{ContractFamily, PriceField, SignificanceBand};
use aurgap_tests::{assert_close, Fixture};

fn gap_file(rows: &[[&str; 5]]) -> String {
    let mut text = String::from("DateTime,gap_open,gap_high,gap_low,gap_close\n");
    for row in rows {
        text.push_str(&row.join(","));
        text.push('\n');
    }
    text
}

#[test]
fn when_gaps_are_constant_the_mean_is_certain_but_the_statistic_is_undefined() {
    // Given: five identical gaps
    let stats = test_mean_zero(&[1.0; 5]);

    // Then: zero dispersion leaves the statistic and p-value undefined
    assert_eq!(stats.n, 5);
    assert_close(stats.mean, 1.0, 1e-12);
    assert_close(stats.std_dev, 0.0, 1e-12);
    assert!(stats.statistic.is_nan());
    assert!(stats.p_value.is_nan());
    assert_eq!(stats.band(), SignificanceBand::None);
}

#[test]
fn when_gaps_are_symmetric_around_zero_nothing_is_significant() {
    let stats = test_mean_zero(&[-2.0, 0.0, 2.0]);

    assert_close(stats.mean, 0.0, 1e-12);
    assert_close(stats.std_dev, 2.0, 1e-12);
    assert_close(stats.p_value, 1.0, 1e-12);
}

#[test]
fn when_gaps_are_shifted_the_normal_approximation_drives_the_p_value() {
    // Given: mean 1 and sample variance 2/3 over four gaps
    let stats = test_mean_zero(&[0.0, 1.0, 1.0, 2.0]);
    let expected_std = (2.0_f64 / 3.0).sqrt();

    assert_close(stats.mean, 1.0, 1e-12);
    assert_close(stats.std_dev, expected_std, 1e-12);
    assert_close(stats.std_err, expected_std / 2.0, 1e-12);
    assert_close(stats.statistic, 2.0 / expected_std, 1e-12);
    // z ≈ 2.449 lies between the 1% and 5% two-tailed critical values.
    assert_eq!(stats.band(), SignificanceBand::Moderate);
}

#[test]
fn when_user_scans_a_directory_each_gap_file_is_tested_by_name() {
    // Given: two gap files, one with a blank cell, and an unrelated file
    let fixture = Fixture::new();
    let dir = fixture.file("gaps");
    fs::create_dir_all(&dir).expect("dir");
    fs::write(
        dir.join("price_gaps_AU2412.csv"),
        gap_file(&[
            ["2024-01-02 09:00:00", "1.0", "2.0", "0.5", "1.5"],
            ["2024-01-02 09:01:00", "1.2", "2.2", "0.7", ""],
            ["2024-01-03 09:00:00", "1.4", "2.4", "0.9", "1.9"],
        ]),
    )
    .expect("write");
    fs::write(
        dir.join("price_gaps_GCZ24E.csv"),
        gap_file(&[
            ["2024-01-02 09:00:00", "-3", "-3", "-3", "-3"],
            ["2024-01-03 09:00:00", "-5", "-5", "-5", "-5"],
        ]),
    )
    .expect("write");
    fs::write(dir.join("notes.csv"), "irrelevant\n").expect("write");

    // When: the directory is scanned
    let scan = scan_gap_directory(&dir).expect("scan");

    // Then: only gap files are read, in name order, with families from the code
    assert_eq!(scan.files.len(), 2);
    assert!(scan.skipped.is_empty());
    assert_eq!(scan.report.family(ContractFamily::Domestic).count(), 4);
    assert_eq!(scan.report.family(ContractFamily::International).count(), 4);

    // And: the blank close cell is excluded from that field only
    let au = |field: PriceField| {
        scan.report
            .rows()
            .iter()
            .find(|row| row.contract.as_str() == "AU2412" && row.field == field)
            .expect("row")
    };
    assert_eq!(au(PriceField::Open).stats.n, 3);
    assert_eq!(au(PriceField::Close).stats.n, 2);
    assert_close(au(PriceField::Close).stats.mean, 1.7, 1e-12);
}

#[test]
fn when_user_writes_scan_reports_blank_cells_mark_undefined_statistics() {
    // Given: a single-row gap file, whose sample deviation is undefined
    let fixture = Fixture::new();
    let dir = fixture.file("gaps");
    fs::create_dir_all(&dir).expect("dir");
    fs::write(
        dir.join("price_gaps_AU2406.csv"),
        gap_file(&[["2024-01-02 09:00:00", "1", "1", "1", "1"]]),
    )
    .expect("write");
    let scan = scan_gap_directory(&dir).expect("scan");

    // When: the domestic report is written
    let path = export::write_report(&dir, &scan.report, ContractFamily::Domestic).expect("report");

    // Then: the mean is present while the deviation onwards is blank
    let text = fs::read_to_string(path).expect("read");
    let row: Vec<&str> = text.lines().nth(1).expect("row").split(',').collect();
    assert_eq!(row[0], "AU2406");
    assert_eq!(row[1], "1");
    assert_eq!(row[2], "");
    assert_eq!(row[5], "");
    assert_eq!(row[6], "1");
}

#[test]
fn when_a_gap_file_name_is_not_a_contract_it_is_skipped_with_a_note() {
    let fixture = Fixture::new();
    let dir = fixture.file("gaps");
    fs::create_dir_all(&dir).expect("dir");
    fs::write(
        dir.join("price_gaps_AU-24.csv"),
        gap_file(&[["2024-01-02 09:00:00", "1", "1", "1", "1"]]),
    )
    .expect("write");

    let scan = scan_gap_directory(&dir).expect("scan");

    assert!(scan.files.is_empty());
    assert_eq!(scan.skipped.len(), 1);
    assert!(scan.report.is_empty());
}

#[test]
fn when_one_gap_file_is_broken_the_rest_of_the_scan_still_runs() {
    // Given: one valid gap file and one without the low and close columns
    let fixture = Fixture::new();
    let dir = fixture.file("gaps");
    fs::create_dir_all(&dir).expect("dir");
    fs::write(
        dir.join("price_gaps_AU2402.csv"),
        gap_file(&[
            ["2024-01-02 09:00:00", "1", "2", "3", "4"],
            ["2024-01-03 09:00:00", "3", "4", "5", "6"],
        ]),
    )
    .expect("write");
    fs::write(
        dir.join("price_gaps_AU2406.csv"),
        "DateTime,gap_open,gap_high\n2024-01-02 09:00:00,1,2\n",
    )
    .expect("write");

    // When: the directory is scanned
    let scan = scan_gap_directory(&dir).expect("scan");

    // Then: the valid contract keeps its statistics
    assert_eq!(scan.files.len(), 1);
    let au2402_close = scan
        .report
        .rows()
        .iter()
        .find(|row| row.contract.as_str() == "AU2402" && row.field == PriceField::Close)
        .expect("close row");
    assert_eq!(au2402_close.stats.n, 2);
    assert_close(au2402_close.stats.mean, 5.0, 1e-12);

    // And: the broken file is noted and reported as an undefined group
    assert_eq!(scan.skipped.len(), 1);
    assert!(scan.skipped[0].contains("gap_low"));
    let broken: Vec<_> = scan
        .report
        .rows()
        .iter()
        .filter(|row| row.contract.as_str() == "AU2406")
        .collect();
    assert_eq!(broken.len(), 4);
    assert!(broken.iter().all(|row| row.stats.n == 0 && row.stats.mean.is_nan()));
}

#[test]
fn when_a_gap_file_holds_infinite_cells_they_are_not_counted() {
    let fixture = Fixture::new();
    let dir = fixture.file("gaps");
    fs::create_dir_all(&dir).expect("dir");
    fs::write(
        dir.join("price_gaps_AU2412.csv"),
        gap_file(&[
            ["2024-01-02 09:00:00", "1", "1", "1", "inf"],
            ["2024-01-03 09:00:00", "3", "3", "3", "3"],
            ["2024-01-04 09:00:00", "5", "5", "5", "5"],
        ]),
    )
    .expect("write");

    let scan = scan_gap_directory(&dir).expect("scan");

    let close = scan
        .report
        .rows()
        .iter()
        .find(|row| row.field == PriceField::Close)
        .expect("close row");
    assert_eq!(close.stats.n, 2);
    assert_close(close.stats.mean, 4.0, 1e-12);
}
