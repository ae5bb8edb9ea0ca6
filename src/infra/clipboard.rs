use thiserror::Error;

#[derive(Debug, Error)]
pub enum CopyToClipboardError {
    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("nothing to copy")]
    Empty,
}

pub fn copy_text_to_clipboard(text: &str) -> Result<(), CopyToClipboardError> {
    if text.trim().is_empty() {
        return Err(CopyToClipboardError::Empty);
    }

    let mut clipboard = arboard::Clipboard::new()
        .map_err(|error| CopyToClipboardError::Clipboard(error.to_string()))?;
    clipboard
        .set_text(text.to_string())
        .map_err(|error| CopyToClipboardError::Clipboard(error.to_string()))
}
