use super::{FileId, LogEntry, Pagination};

pub const DEFAULT_PER_PAGE: u64 = 100;

/// Display-only narrowing applied to the page the server returned.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EntryFilter {
    pub search: String,
    pub level: Option<String>,
}

impl EntryFilter {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.level.is_none()
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(level) = self.level.as_deref() {
            let Some(entry_level) = entry.level.as_ref() else {
                return false;
            };
            if !entry_level.matches(level) {
                return false;
            }
        }

        let needle = self.search.trim();
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();
        entry.raw_line.to_lowercase().contains(&needle)
            || entry.message.to_lowercase().contains(&needle)
    }
}

pub fn filter_entries<'a>(entries: &'a [LogEntry], filter: &EntryFilter) -> Vec<&'a LogEntry> {
    entries.iter().filter(|entry| filter.matches(entry)).collect()
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PageRequest {
    pub seq: u64,
    pub file_id: FileId,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntryPage {
    pub entries: Vec<LogEntry>,
    pub pagination: Pagination,
}

/// Paged view of one file's entries.
///
/// The network stage (`PageRequest` out, `apply_page` in) owns `total` and
/// `pages`; the local stage (`visible`) only narrows what is displayed.
/// A successful page replaces the cached entries wholesale, a failed one
/// leaves them empty.
#[derive(Clone, Debug)]
pub struct EntryQuery {
    file_id: Option<FileId>,
    page: u64,
    per_page: u64,
    filter: EntryFilter,
    entries: Vec<LogEntry>,
    pagination: Option<Pagination>,
    error: Option<String>,
    next_seq: u64,
    in_flight: Option<u64>,
}

impl EntryQuery {
    pub fn new(per_page: u64) -> Self {
        Self {
            file_id: None,
            page: 1,
            per_page: per_page.max(1),
            filter: EntryFilter::default(),
            entries: Vec::new(),
            pagination: None,
            error: None,
            next_seq: 0,
            in_flight: None,
        }
    }

    pub fn file_id(&self) -> Option<FileId> {
        self.file_id
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn filter(&self) -> &EntryFilter {
        &self.filter
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn visible(&self) -> Vec<&LogEntry> {
        filter_entries(&self.entries, &self.filter)
    }

    pub fn open_file(&mut self, file_id: FileId) -> PageRequest {
        self.file_id = Some(file_id);
        self.entries.clear();
        self.pagination = None;
        self.error = None;
        self.issue(file_id, 1)
    }

    pub fn set_search(&mut self, search: &str) -> Option<PageRequest> {
        let search = search.trim();
        if self.filter.search == search {
            return None;
        }
        self.filter.search = search.to_string();
        self.restart()
    }

    pub fn set_level(&mut self, level: Option<&str>) -> Option<PageRequest> {
        let level = level
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .map(str::to_string);
        if self.filter.level == level {
            return None;
        }
        self.filter.level = level;
        self.restart()
    }

    pub fn goto_page(&mut self, page: u64) -> Option<PageRequest> {
        let file_id = self.file_id?;
        let target = match self.pagination {
            Some(pagination) => pagination.clamp_page(page),
            None => page.max(1),
        };
        if target == self.page && self.pagination.is_some() && self.error.is_none() {
            return None;
        }
        Some(self.issue(file_id, target))
    }

    pub fn next_page(&mut self) -> Option<PageRequest> {
        self.goto_page(self.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> Option<PageRequest> {
        self.goto_page(self.page.saturating_sub(1))
    }

    pub fn first_page(&mut self) -> Option<PageRequest> {
        self.goto_page(1)
    }

    pub fn last_page(&mut self) -> Option<PageRequest> {
        let last = self.pagination.map(|p| p.pages.max(1))?;
        self.goto_page(last)
    }

    pub fn reload(&mut self) -> Option<PageRequest> {
        let file_id = self.file_id?;
        Some(self.issue(file_id, self.page))
    }

    /// Applies a page response. Returns `false` when the response belongs to
    /// a superseded request and was discarded.
    pub fn apply_page(&mut self, seq: u64, result: Result<EntryPage, String>) -> bool {
        if self.in_flight != Some(seq) {
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                self.page = page.pagination.page;
                self.entries = page.entries;
                self.pagination = Some(page.pagination);
                self.error = None;
            }
            Err(error) => {
                self.entries.clear();
                self.pagination = None;
                self.error = Some(error);
            }
        }
        true
    }

    fn restart(&mut self) -> Option<PageRequest> {
        let file_id = self.file_id?;
        Some(self.issue(file_id, 1))
    }

    fn issue(&mut self, file_id: FileId, page: u64) -> PageRequest {
        self.next_seq = self.next_seq.wrapping_add(1);
        let seq = self.next_seq;
        self.in_flight = Some(seq);
        self.page = page.max(1);
        PageRequest {
            seq,
            file_id,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogLevel;

    fn entry(line: u64, level: Option<LogLevel>, message: &str) -> LogEntry {
        LogEntry {
            id: line as i64,
            line_number: line,
            timestamp: None,
            level: level.clone(),
            source: None,
            message: message.to_string(),
            raw_line: format!(
                "{} {message}",
                level.as_ref().map(LogLevel::as_str).unwrap_or("-")
            ),
        }
    }

    fn page_of(entries: Vec<LogEntry>, page: u64, total: u64) -> EntryPage {
        EntryPage {
            entries,
            pagination: Pagination::new(page, 50, total),
        }
    }

    fn fifty_with_twelve_errors() -> Vec<LogEntry> {
        (1..=50)
            .map(|line| {
                let level = if line % 4 == 0 && line <= 48 {
                    LogLevel::Error
                } else {
                    LogLevel::Info
                };
                entry(line, Some(level), &format!("line {line}"))
            })
            .collect()
    }

    #[test]
    fn level_filter_narrows_page_without_touching_totals() {
        let mut query = EntryQuery::new(50);
        let request = query.open_file(FileId(7));
        assert!(query.apply_page(request.seq, Ok(page_of(fifty_with_twelve_errors(), 1, 480))));

        let refetch = query.set_level(Some("ERROR")).expect("filter change refetches");
        assert_eq!(refetch.page, 1);
        assert!(query.apply_page(refetch.seq, Ok(page_of(fifty_with_twelve_errors(), 1, 480))));

        let visible = query.visible();
        assert_eq!(visible.len(), 12);
        assert!(visible.iter().all(|e| e.level == Some(LogLevel::Error)));
        let pagination = query.pagination().expect("pagination");
        assert_eq!(pagination.total, 480);
        assert_eq!(pagination.pages, 10);
    }

    #[test]
    fn search_matches_raw_line_or_message_case_insensitively() {
        let mut entries = vec![
            entry(1, Some(LogLevel::Info), "Connection Refused by peer"),
            entry(2, Some(LogLevel::Info), "all good"),
        ];
        entries[1].raw_line = "host=db01 TIMEOUT".to_string();
        let filter = EntryFilter {
            search: "connection refused".to_string(),
            level: None,
        };
        assert_eq!(filter_entries(&entries, &filter).len(), 1);

        let filter = EntryFilter {
            search: "timeout".to_string(),
            level: None,
        };
        let visible = filter_entries(&entries, &filter);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].line_number, 2);
    }

    #[test]
    fn level_filter_excludes_entries_without_level() {
        let entries = vec![entry(1, None, "no level"), entry(2, Some(LogLevel::Warn), "w")];
        let filter = EntryFilter {
            search: String::new(),
            level: Some("warn".to_string()),
        };
        let visible = filter_entries(&entries, &filter);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].line_number, 2);
    }

    #[test]
    fn changing_search_resets_to_first_page() {
        let mut query = EntryQuery::new(50);
        let first = query.open_file(FileId(1));
        query.apply_page(first.seq, Ok(page_of(Vec::new(), 1, 500)));
        let third = query.goto_page(3).expect("page 3");
        query.apply_page(third.seq, Ok(page_of(Vec::new(), 3, 500)));
        assert_eq!(query.page(), 3);

        let request = query.set_search("timeout").expect("refetch");
        assert_eq!(request.page, 1);
        assert_eq!(query.page(), 1);
        assert!(query.set_search(" timeout ").is_none());
    }

    #[test]
    fn failed_fetch_clears_entries_instead_of_keeping_stale_ones() {
        let mut query = EntryQuery::new(50);
        let first = query.open_file(FileId(1));
        query.apply_page(first.seq, Ok(page_of(fifty_with_twelve_errors(), 1, 50)));
        assert_eq!(query.entries().len(), 50);

        let again = query.reload().expect("reload");
        assert!(query.apply_page(again.seq, Err("HTTP 500".to_string())));
        assert!(query.entries().is_empty());
        assert_eq!(query.error(), Some("HTTP 500"));
        assert!(!query.is_loading());
    }

    #[test]
    fn stale_page_response_is_discarded() {
        let mut query = EntryQuery::new(50);
        let first = query.open_file(FileId(1));
        query.apply_page(first.seq, Ok(page_of(Vec::new(), 1, 500)));
        let older = query.goto_page(2).expect("page 2");
        let newer = query.goto_page(3).expect("page 3");

        assert!(query.apply_page(newer.seq, Ok(page_of(vec![entry(101, None, "p3")], 3, 500))));
        assert!(!query.apply_page(older.seq, Ok(page_of(vec![entry(51, None, "p2")], 2, 500))));
        assert_eq!(query.page(), 3);
        assert_eq!(query.entries()[0].line_number, 101);
    }

    #[test]
    fn navigation_clamps_and_skips_redundant_fetches() {
        let mut query = EntryQuery::new(50);
        let first = query.open_file(FileId(1));
        query.apply_page(first.seq, Ok(page_of(Vec::new(), 1, 120)));

        assert!(query.prev_page().is_none());
        assert!(query.first_page().is_none());
        let last = query.last_page().expect("last page");
        assert_eq!(last.page, 3);
        query.apply_page(last.seq, Ok(page_of(Vec::new(), 3, 120)));
        assert!(query.next_page().is_none());
        assert_eq!(query.goto_page(99), None);
    }

    #[test]
    fn navigation_without_file_is_noop() {
        let mut query = EntryQuery::new(50);
        assert!(query.next_page().is_none());
        assert!(query.reload().is_none());
        assert!(query.set_search("x").is_none());
    }
}
