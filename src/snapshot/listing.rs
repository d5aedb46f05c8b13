use chrono::NaiveDateTime;

use super::timestamp::parse_timestamp;

/// Number of whitespace separated fields in a unix `LIST` line, the name
/// being the last.
const LIST_FIELDS: usize = 9;
const IMAGE_SUFFIX: &str = ".jpg";

/// One image file from a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileEntry {
    /// The file name, without its directory.
    pub name: String,
    /// The recording time encoded in the name, if the name carries one.
    pub parsed_timestamp: Option<NaiveDateTime>,
}

impl RemoteFileEntry {
    /// Build an entry from a bare file name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let parsed_timestamp = parse_timestamp(&name);
        Self { name, parsed_timestamp }
    }

    /// Build an entry from one line of `LIST` output. Malformed lines and
    /// anything that is not a `.jpg` yield `None`.
    pub fn from_listing_line(line: &str) -> Option<Self> {
        parse_listing_line(line).map(Self::new)
    }
}

/// Pull the file name out of a unix-style `LIST` line such as
///
/// ```text
/// -rw-r--r--   1 root  root  15360 Jun 01 14:05 ipcam-record.2024-06-01_14-05-00.0.jpg
/// ```
///
/// Names containing spaces come back with single spaces between the words.
pub fn parse_listing_line(line: &str) -> Option<String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < LIST_FIELDS {
        return None;
    }

    let name = fields[LIST_FIELDS - 1..].join(" ");
    name.ends_with(IMAGE_SUFFIX).then_some(name)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_regular_line() {
        let line = "-rw-r--r--    1 root     root        15360 Jun 01 14:05 ipcam-record.2024-06-01_14-05-00.0.jpg";
        assert_eq!(
            parse_listing_line(line).as_deref(),
            Some("ipcam-record.2024-06-01_14-05-00.0.jpg")
        );
    }

    #[test]
    fn test_name_with_spaces() {
        let line = "-rw-r--r-- 1 root root 15360 Jun 01 14:05 my   snapshot.jpg";
        assert_eq!(parse_listing_line(line).as_deref(), Some("my snapshot.jpg"));
    }

    #[test]
    fn test_short_and_foreign_lines_are_skipped() {
        assert_eq!(parse_listing_line(""), None);
        assert_eq!(parse_listing_line("total 48"), None);
        assert_eq!(parse_listing_line("ipcam-record.2024-06-01_14-05-00.0.jpg"), None);
        assert_eq!(
            parse_listing_line("-rw-r--r-- 1 root root 1048576 Jun 01 14:05 ipcam-record.2024-06-01_14-05-00.mp4"),
            None
        );
        assert_eq!(
            parse_listing_line("drwxr-xr-x 2 root root 4096 Jun 01 14:05 thumbnail"),
            None
        );
    }

    #[test]
    fn test_entry_from_line() {
        let entry = RemoteFileEntry::from_listing_line(
            "-rw-r--r-- 1 root root 15360 Jun 01 14:05 ipcam-record.2024-06-01_14-05-00.0.jpg",
        )
        .unwrap();

        assert_eq!(
            entry.parsed_timestamp,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(14, 5, 0)
        );
    }

    #[test]
    fn test_entry_without_timestamp() {
        let entry = RemoteFileEntry::new("cover.jpg");
        assert_eq!(entry.parsed_timestamp, None);
    }
}
