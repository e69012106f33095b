//! Test fixtures for telemetry inputs.
//!
//! Produces well-formed telemetry text in every supported format and writes
//! it below temporary resource roots.

use std::path::Path;

// Type alias for complex return type
type TempResourceRoot = (tempfile::TempDir, crate::resources::FileResources);

/// Renders `(delta, azimuth, elevation)` rows in the elapsed-delta format.
pub fn elapsed_delta_text(rows: &[(f64, f64, f64)]) -> String {
    rows.iter()
        .map(|(delta, azimuth, elevation)| format!("{delta} {azimuth} {elevation}\n"))
        .collect()
}

/// Renders a view-period product from `(time, event, azimuth, elevation)` rows.
///
/// Every record uses station 14, pass 1234 and an RTLT of `00:22:05.5`.
pub fn view_period_product(events: &[(&str, &str, f64, f64)]) -> String {
    let mut text = String::from(
        "CCSD3ZF0000100000001NJPL3KS0L015$$MARK$$\n\
         MISSION_NAME = M20;\n\
         SPACECRAFT_NAME = M20;\n\
         DSN_SPACECRAFT_NUM = 168;\n\
         DATA_SET_ID = DSN_VIEWPERIOD;\n\
         FILE_NAME = M20_20223_20284_TEST.VP;\n\
         USER_PRODUCT_ID = 1.0;\n\
         APPLICABLE_START_TIME = 2020-223T00:00:00;\n\
         APPLICABLE_STOP_TIME = 2020-284T00:00:00;\n\
         PRODUCT_CREATION_TIME = 2020-220T12:30:00;\n\
         CCSD3RE00000$$MARK$$NJPL3IF0M00400000001\n",
    );

    for (time, event, azimuth, elevation) in events {
        text.push_str(&format!(
            "{:<15} {:<16} {:>3} {:>2} {:>4} {:>5} {:>5} {:>5} {:>5} {:>10}\n",
            time, event, 168, 14, 1234, azimuth, elevation, "1.0", "2.0", "00:22:05.5"
        ));
    }

    text
}

/// Renders one station allocation record on `day` (`YY DDD`).
///
/// `times` holds SOA, BOT, EOT and EOA as `HHMM`. Every record books DSS-14
/// for project M20 on pass 1234.
pub fn station_allocation_line(day: &str, times: [&str; 4], description: &str) -> String {
    let [soa, bot, eot, eoa] = times;
    format!(
        " {:<6} {:>4} {:>4} {:>4} {:>4} {:<6} {:<5} {:<16} {:>4} {:<6}{} {:<3} {}",
        day, soa, bot, eot, eoa, "DSS-14", "M20", description, 1234, "N007", "1", "1A1", "C"
    )
}

/// Renders a station allocation file from `(day, [soa, bot, eot, eoa], description)` rows.
pub fn station_allocation_product(records: &[(&str, [&str; 4], &str)]) -> String {
    let mut text = String::from(
        "CCSD3ZF0000100000001NJPL3KS0L015$$MARK$$\n\
         MISSION_NAME = M20;\n\
         SPACECRAFT_NAME = M20;\n\
         DSN_SPACECRAFT_NUM = 168;\n\
         DATA_SET_ID = SAF;\n\
         FILE_NAME = M20_2020_223_TEST.SAF;\n\
         PRODUCT_VERSION_ID = 2.0;\n\
         APPLICABLE_START_TIME = 2020-223T00:00:00;\n\
         APPLICABLE_STOP_TIME = 2020-284T00:00:00;\n\
         PRODUCT_CREATION_TIME = 2020-220T12:30:00;\n\
         CCSD3RE00000$$MARK$$NJPL3IF0M00400000001\n",
    );

    for (day, times, description) in records {
        text.push_str(&station_allocation_line(day, *times, description));
        text.push('\n');
    }

    text
}

/// Creates a temporary resource root containing `files`.
///
/// # Panics
///
/// Panics if the temporary directory or a file cannot be created.
/// This is acceptable in test fixtures where failures indicate environment issues.
pub fn create_resource_root(files: &[(&str, &str)]) -> TempResourceRoot {
    let temp_dir = tempfile::tempdir().unwrap();
    for (id, contents) in files {
        write_resource(temp_dir.path(), id, contents);
    }
    let resources = crate::resources::FileResources::new(temp_dir.path());
    (temp_dir, resources)
}

/// Writes one resource below `root`, creating parent directories.
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_resource(root: &Path, id: &str, contents: &str) {
    let path = root.join(id.trim_start_matches('/'));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
