use chrono::NaiveDateTime;

const STAMP_LEN: usize = "YYYY-MM-DD_HH-MM-SS".len();
const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Extract the recording time from a thumbnail name such as
/// `ipcam-record.2024-06-01_14-05-00.0.jpg`.
///
/// Only the first `DDDD-DD-DD_DD-DD-DD` run in the name is considered. If it
/// is not a real calendar date-time the name has no timestamp.
pub fn parse_timestamp(filename: &str) -> Option<NaiveDateTime> {
    let start = filename.as_bytes().windows(STAMP_LEN).position(has_stamp_shape)?;

    // The matched run is pure ASCII, so both ends are char boundaries.
    NaiveDateTime::parse_from_str(&filename[start..start + STAMP_LEN], STAMP_FORMAT).ok()
}

fn has_stamp_shape(window: &[u8]) -> bool {
    window.iter().enumerate().all(|(i, b)| match i {
        4 | 7 | 13 | 16 => *b == b'-',
        10 => *b == b'_',
        _ => b.is_ascii_digit(),
    })
}
