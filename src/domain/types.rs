use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FileId {
    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<u64>().ok().map(Self)
    }
}

/// Severity of a single log line. Levels outside the common five are kept
/// verbatim so that filtering can still match them exactly.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Other(String),
}

impl From<String> for LogLevel {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("ERROR") {
            Self::Error
        } else if trimmed.eq_ignore_ascii_case("WARN") {
            Self::Warn
        } else if trimmed.eq_ignore_ascii_case("INFO") {
            Self::Info
        } else if trimmed.eq_ignore_ascii_case("DEBUG") {
            Self::Debug
        } else if trimmed.eq_ignore_ascii_case("TRACE") {
            Self::Trace
        } else {
            Self::Other(trimmed.to_string())
        }
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
            Self::Other(value) => value.as_str(),
        }
    }

    pub fn matches(&self, filter: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(filter.trim())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub line_number: u64,
    /// Backend timestamps are ISO-8601, usually without an offset; those are read as UTC.
    /// Anything unparseable is treated as absent.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(default)]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub raw_line: String,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
}

pub fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed);
    }

    let naive_t = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    let naive_space = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    PrimitiveDateTime::parse(value, naive_t)
        .or_else(|_| PrimitiveDateTime::parse(value, naive_space))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Server-side paging block. `pages` and `page` are always derived from
/// `total` and `per_page` so a sloppy backend cannot break the invariants.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            page: page.clamp(1, pages.max(1)),
            per_page,
            total,
            pages,
        }
    }

    pub fn clamp_page(&self, page: u64) -> u64 {
        page.clamp(1, self.pages.max(1))
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct RawPagination {
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub per_page: u64,
    #[serde(default)]
    pub total: u64,
}

impl From<RawPagination> for Pagination {
    fn from(raw: RawPagination) -> Self {
        Pagination::new(raw.page, raw.per_page, raw.total)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct LogFile {
    pub id: FileId,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub log_type: Option<String>,
    #[serde(default)]
    pub upload_time: Option<String>,
    #[serde(default)]
    pub processed: bool,
    #[serde(default)]
    pub entry_count: u64,
}

impl LogFile {
    pub fn display_name(&self) -> &str {
        if self.original_filename.trim().is_empty() {
            "(unnamed)"
        } else {
            self.original_filename.as_str()
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct AnalysisHistoryItem {
    pub id: i64,
    #[serde(default)]
    pub selected_text: String,
    #[serde(default)]
    pub analysis_summary: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub configured: bool,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_is_ceiling_of_total_over_per_page() {
        for per_page in 1..=7u64 {
            for total in 0..=30u64 {
                let pagination = Pagination::new(1, per_page, total);
                let expected = (total + per_page - 1) / per_page;
                assert_eq!(pagination.pages, expected, "total={total} per_page={per_page}");
            }
        }
    }

    #[test]
    fn page_is_clamped_into_valid_range() {
        assert_eq!(Pagination::new(0, 10, 95).page, 1);
        assert_eq!(Pagination::new(42, 10, 95).page, 10);
        assert_eq!(Pagination::new(3, 10, 95).page, 3);

        let empty = Pagination::new(5, 10, 0);
        assert_eq!(empty.pages, 0);
        assert_eq!(empty.page, 1);
    }

    #[test]
    fn zero_per_page_has_no_pages() {
        let pagination = Pagination::new(4, 0, 12);
        assert_eq!(pagination.pages, 0);
        assert_eq!(pagination.page, 1);
    }

    #[test]
    fn log_level_parses_case_insensitively_and_keeps_unknown() {
        assert_eq!(LogLevel::from("error".to_string()), LogLevel::Error);
        assert_eq!(LogLevel::from(" Warn ".to_string()), LogLevel::Warn);
        assert_eq!(
            LogLevel::from("FATAL".to_string()),
            LogLevel::Other("FATAL".to_string())
        );
        assert!(LogLevel::Other("WARNING".to_string()).matches("warning"));
        assert!(!LogLevel::Other("WARNING".to_string()).matches("WARN"));
    }

    #[test]
    fn log_entry_decodes_backend_shape() {
        let entry: LogEntry = serde_json::from_str(
            r#"{"id":3,"line_number":17,"timestamp":"2025-09-23T22:40:00","level":"ERROR","source":"db","message":"pool exhausted","raw_line":"2025-09-23 22:40:00 ERROR [db] pool exhausted"}"#,
        )
        .expect("decode");
        assert_eq!(entry.level, Some(LogLevel::Error));
        assert_eq!(entry.source.as_deref(), Some("db"));
        let ts = entry.timestamp.expect("timestamp");
        assert_eq!(ts.hour(), 22);
        assert_eq!(ts.offset(), time::UtcOffset::UTC);
    }

    #[test]
    fn log_entry_tolerates_nulls() {
        let entry: LogEntry = serde_json::from_str(
            r#"{"id":1,"line_number":1,"timestamp":null,"level":null,"source":null,"message":"x","raw_line":"x"}"#,
        )
        .expect("decode");
        assert!(entry.level.is_none());
        assert!(entry.timestamp.is_none());
    }

    #[test]
    fn unparseable_or_mistyped_timestamp_is_absent() {
        for raw in [r#""Sep 23 22:40:00""#, "1695508800", "{}"] {
            let json = format!(
                r#"{{"id":1,"line_number":1,"timestamp":{raw},"message":"x","raw_line":"x"}}"#
            );
            let entry: LogEntry = serde_json::from_str(&json).expect("decode");
            assert!(entry.timestamp.is_none(), "{raw}");
        }
    }

    #[test]
    fn timestamp_accepts_rfc3339_and_fractional_seconds() {
        assert!(parse_timestamp("2025-09-23T22:40:00.123456Z").is_some());
        assert!(parse_timestamp("2025-09-23T22:40:00.5").is_some());
        assert!(parse_timestamp("2025-09-23 22:40:00").is_some());
        assert!(parse_timestamp("Sep 23 22:40:00").is_none());
    }
}
