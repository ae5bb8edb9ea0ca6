use super::FileId;

pub const QUICK_START_LIMIT: usize = 3;

/// Suggested prompts for the active file. Failures degrade to an empty list.
#[derive(Clone, Debug, Default)]
pub struct Suggestions {
    file_id: Option<FileId>,
    items: Vec<String>,
    loading: bool,
}

impl Suggestions {
    /// Returns the file to fetch for when the active file actually changed.
    pub fn activate(&mut self, file_id: Option<FileId>) -> Option<FileId> {
        if self.file_id == file_id {
            return None;
        }
        self.file_id = file_id;
        self.items.clear();
        self.loading = file_id.is_some();
        file_id
    }

    pub fn apply(&mut self, file_id: FileId, result: Result<Vec<String>, String>) -> bool {
        if self.file_id != Some(file_id) {
            return false;
        }
        self.loading = false;
        self.items = match result {
            Ok(items) => dedup_preserving_order(items),
            Err(_) => Vec::new(),
        };
        true
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn quick_start(&self) -> &[String] {
        let end = self.items.len().min(QUICK_START_LIMIT);
        &self.items[..end]
    }
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() || out.iter().any(|existing| existing == trimmed) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn quick_start_takes_first_three_in_order() {
        let mut suggestions = Suggestions::default();
        let file = suggestions.activate(Some(FileId(3))).expect("fetch");
        suggestions.apply(
            file,
            Ok(strings(&["errors", "warnings", "errors", "network", "auth"])),
        );
        assert_eq!(suggestions.quick_start(), strings(&["errors", "warnings", "network"]));
        assert_eq!(suggestions.items.len(), 4);
    }

    #[test]
    fn failure_degrades_to_empty() {
        let mut suggestions = Suggestions::default();
        let file = suggestions.activate(Some(FileId(3))).expect("fetch");
        assert!(suggestions.apply(file, Err("HTTP 404".to_string())));
        assert!(suggestions.quick_start().is_empty());
        assert!(!suggestions.is_loading());
    }

    #[test]
    fn fetched_once_per_file_change() {
        let mut suggestions = Suggestions::default();
        assert_eq!(suggestions.activate(Some(FileId(3))), Some(FileId(3)));
        assert_eq!(suggestions.activate(Some(FileId(3))), None);
        assert_eq!(suggestions.activate(Some(FileId(4))), Some(FileId(4)));
    }

    #[test]
    fn response_for_previous_file_is_ignored() {
        let mut suggestions = Suggestions::default();
        suggestions.activate(Some(FileId(3)));
        suggestions.activate(Some(FileId(4)));
        assert!(!suggestions.apply(FileId(3), Ok(strings(&["stale"]))));
        assert!(suggestions.items.is_empty());
    }
}
