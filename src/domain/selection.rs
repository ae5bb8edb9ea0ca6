use super::FileId;

/// Selections this short are treated as accidental clicks.
pub const MIN_SELECTION_CHARS: usize = 10;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selection {
    pub text: String,
    pub source_file_id: FileId,
}

/// Returns the trimmed text when it is long enough to count as a selection.
pub fn qualify_selection(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.chars().count() > MIN_SELECTION_CHARS {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[derive(Clone, Debug, Default)]
pub struct SelectionCapture {
    current: Option<Selection>,
}

impl SelectionCapture {
    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    /// Called on pointer release with whatever text is selected. Every
    /// qualifying release replaces the previous selection.
    pub fn on_release(&mut self, file_id: FileId, text: &str) -> Option<&Selection> {
        let text = qualify_selection(text)?;
        self.current = Some(Selection {
            text,
            source_file_id: file_id,
        });
        self.current.as_ref()
    }

    pub fn on_file_changed(&mut self, file_id: Option<FileId>) {
        let keep = self
            .current
            .as_ref()
            .is_some_and(|selection| Some(selection.source_file_id) == file_id);
        if !keep {
            self.current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_selection_emits_nothing() {
        let mut capture = SelectionCapture::default();
        assert!(capture.on_release(FileId(1), "error").is_none());
        assert!(capture.on_release(FileId(1), "   0123456789   ").is_none());
        assert!(capture.current().is_none());
    }

    #[test]
    fn qualifying_selection_is_trimmed() {
        let mut capture = SelectionCapture::default();
        let selection = capture
            .on_release(FileId(1), "  connection refused \n")
            .expect("selection");
        assert_eq!(selection.text, "connection refused");
        assert_eq!(selection.source_file_id, FileId(1));
    }

    #[test]
    fn threshold_counts_characters_not_bytes() {
        assert!(qualify_selection("ошибкаошибк").is_some());
        assert!(qualify_selection("ошибкаошиб").is_none());
    }

    #[test]
    fn later_release_overwrites_and_noise_keeps_previous() {
        let mut capture = SelectionCapture::default();
        capture.on_release(FileId(1), "first selection text");
        capture.on_release(FileId(1), "tiny");
        assert_eq!(capture.current().unwrap().text, "first selection text");
        capture.on_release(FileId(1), "second selection text");
        assert_eq!(capture.current().unwrap().text, "second selection text");
    }

    #[test]
    fn file_change_clears_foreign_selection() {
        let mut capture = SelectionCapture::default();
        capture.on_release(FileId(1), "connection refused");
        capture.on_file_changed(Some(FileId(1)));
        assert!(capture.current().is_some());
        capture.on_file_changed(Some(FileId(2)));
        assert!(capture.current().is_none());
    }
}
