mod line_editor;
mod mouse;

pub use line_editor::LineEditor;
pub use mouse::{
    ENTRY_GUTTER_WIDTH, EntriesLayout, FilesLayout, content_area, entries_layout, entry_gutter,
    files_layout, list_viewport,
};

use crate::domain::{
    AnalysisConfig, AnalysisHistoryItem, AnalysisRequest, AnalysisResult, AnalysisTicket,
    AnalysisController, EntryPage, EntryQuery, FileId, LogFile, PageRequest, SelectionCapture,
    Suggestions,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] crate::infra::ConfigError),

    #[error(transparent)]
    Logging(#[from] crate::infra::InitLoggingError),
}

/// Level filters offered by the `l` key, in cycling order. Matching is exact,
/// so each spelling the backend emits gets its own step.
pub const LEVEL_CYCLE: [Option<&str>; 9] = [
    None,
    Some("ERROR"),
    Some("FATAL"),
    Some("CRITICAL"),
    Some("WARN"),
    Some("WARNING"),
    Some("INFO"),
    Some("DEBUG"),
    Some("TRACE"),
];

#[derive(Clone, Debug, Default)]
pub struct FilesView {
    pub files: Vec<LogFile>,
    pub selected: usize,
    pub offset: usize,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntriesFocus {
    List,
    Search,
    Question,
}

/// A position in the visible entry list: row index plus char column of the raw line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct TextPoint {
    pub index: usize,
    pub col: usize,
}

/// Mouse selection over raw lines. The cursor column is inclusive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DragSelection {
    pub anchor: TextPoint,
    pub cursor: TextPoint,
    pub active: bool,
}

impl DragSelection {
    fn ordered(&self) -> (TextPoint, TextPoint) {
        if self.anchor <= self.cursor {
            (self.anchor, self.cursor)
        } else {
            (self.cursor, self.anchor)
        }
    }

    /// Selected `[from, to)` char range on row `index`, if the row is covered.
    pub fn columns_on(&self, index: usize, line_chars: usize) -> Option<(usize, usize)> {
        let (start, end) = self.ordered();
        if index < start.index || index > end.index {
            return None;
        }
        let from = if index == start.index {
            start.col.min(line_chars)
        } else {
            0
        };
        let to = if index == end.index {
            end.col.saturating_add(1).min(line_chars)
        } else {
            line_chars
        };
        Some((from, to.max(from)))
    }

    pub fn extract(&self, lines: &[&str]) -> String {
        let (start, end) = self.ordered();
        let mut parts = Vec::new();
        for index in start.index..=end.index {
            let Some(line) = lines.get(index) else {
                break;
            };
            let chars = line.chars().count();
            let Some((from, to)) = self.columns_on(index, chars) else {
                continue;
            };
            parts.push(line.chars().skip(from).take(to - from).collect::<String>());
        }
        parts.join("\n")
    }
}

#[derive(Clone, Debug)]
pub struct EntriesView {
    pub file_id: FileId,
    pub title: String,
    pub selected: usize,
    pub offset: usize,
    pub focus: EntriesFocus,
    pub search: LineEditor,
    pub level_index: usize,
    pub drag: Option<DragSelection>,
    pub mark: Option<usize>,
}

impl EntriesView {
    fn new(file_id: FileId, title: String, query: &EntryQuery) -> Self {
        let level_index = LEVEL_CYCLE
            .iter()
            .position(|level| *level == query.filter().level.as_deref())
            .unwrap_or(0);
        Self {
            file_id,
            title,
            selected: 0,
            offset: 0,
            focus: EntriesFocus::List,
            search: LineEditor::from_text(&query.filter().search),
            level_index,
            drag: None,
            mark: None,
        }
    }

    /// Inclusive row range marked from the keyboard, if any.
    pub fn marked_rows(&self) -> Option<(usize, usize)> {
        let mark = self.mark?;
        Some((mark.min(self.selected), mark.max(self.selected)))
    }

    fn reset_cursor(&mut self) {
        self.selected = 0;
        self.offset = 0;
        self.drag = None;
        self.mark = None;
    }
}

#[derive(Clone, Debug, Default)]
pub struct AnalysisPanel {
    pub open: bool,
    pub scroll: u16,
    pub question: LineEditor,
}

#[derive(Clone, Debug)]
pub struct HistoryOverlay {
    pub file_id: FileId,
    pub loading: bool,
    pub items: Vec<AnalysisHistoryItem>,
    pub error: Option<String>,
    pub scroll: u16,
}

#[derive(Clone, Debug)]
pub enum View {
    Files,
    Entries(EntriesView),
}

#[derive(Clone, Debug)]
pub struct AppModel {
    pub api_base_url: String,
    pub terminal_size: (u16, u16),
    pub notice: Option<String>,
    pub help_open: bool,
    pub view: View,
    pub files: FilesView,
    pub entries: EntryQuery,
    pub selection: SelectionCapture,
    pub analysis: AnalysisController,
    pub panel: AnalysisPanel,
    pub suggestions: Suggestions,
    pub history: Option<HistoryOverlay>,
}

impl AppModel {
    pub fn new(api_base_url: String, per_page: u64) -> Self {
        Self {
            api_base_url,
            terminal_size: (0, 0),
            notice: None,
            help_open: false,
            view: View::Files,
            files: FilesView {
                loading: true,
                ..FilesView::default()
            },
            entries: EntryQuery::new(per_page),
            selection: SelectionCapture::default(),
            analysis: AnalysisController::new(),
            panel: AnalysisPanel::default(),
            suggestions: Suggestions::default(),
            history: None,
        }
    }

    pub fn selected_file(&self) -> Option<&LogFile> {
        self.files.files.get(self.files.selected)
    }
}

/// Work finished on a backend thread, routed back through `update`.
#[derive(Clone, Debug)]
pub enum BackendEvent {
    FilesLoaded(Result<Vec<LogFile>, String>),
    PageLoaded {
        seq: u64,
        result: Result<EntryPage, String>,
    },
    SuggestionsLoaded {
        file_id: FileId,
        result: Result<Vec<String>, String>,
    },
    AnalysisFinished {
        seq: u64,
        result: AnalysisResult,
    },
    ConfigLoaded(Result<AnalysisConfig, String>),
    HistoryLoaded {
        file_id: FileId,
        result: Result<Vec<AnalysisHistoryItem>, String>,
    },
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Paste(String),
    Mouse(MouseEvent),
    Backend(BackendEvent),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Quit,
    LoadFiles,
    FetchConfig,
    FetchPage(PageRequest),
    FetchSuggestions { file_id: FileId },
    Analyze(AnalysisTicket),
    FetchHistory { file_id: FileId },
    CopyResult,
    Batch(Vec<AppCommand>),
}

impl AppCommand {
    fn from_page(request: Option<PageRequest>) -> Self {
        request.map(Self::FetchPage).unwrap_or(Self::None)
    }

    fn from_ticket(ticket: Option<AnalysisTicket>) -> Self {
        ticket.map(Self::Analyze).unwrap_or(Self::None)
    }
}

/// Commands to issue right after startup. `file` opens that file straight away.
pub fn startup(model: &mut AppModel, file: Option<FileId>) -> AppCommand {
    let mut commands = vec![AppCommand::LoadFiles, AppCommand::FetchConfig];
    if let Some(file_id) = file {
        commands.push(open_file(model, file_id, format!("file {file_id}")));
    }
    AppCommand::Batch(commands)
}

pub fn update(model: AppModel, event: AppEvent) -> (AppModel, AppCommand) {
    let (mut model, command) = match event {
        AppEvent::Key(key) => update_on_key(model, key),
        AppEvent::Paste(text) => update_on_paste(model, text),
        AppEvent::Mouse(mouse) => mouse::update_on_mouse(model, mouse),
        AppEvent::Backend(event) => (update_on_backend(model, event), AppCommand::None),
    };
    fit_viewport(&mut model);
    (model, command)
}

fn update_on_key(model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    model.notice = None;

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        return (model, AppCommand::Quit);
    }

    if model.help_open {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Char('q')
        ) {
            model.help_open = false;
        }
        return (model, AppCommand::None);
    }

    if model.history.is_some() {
        return update_history_overlay(model, key);
    }

    if key.code == KeyCode::F(1) {
        model.help_open = true;
        return (model, AppCommand::None);
    }

    match model.view.clone() {
        View::Files => update_files(model, key),
        View::Entries(view) => match view.focus {
            EntriesFocus::List => update_entries(model, view, key),
            EntriesFocus::Search => update_search(model, view, key),
            EntriesFocus::Question => update_question(model, view, key),
        },
    }
}

fn update_on_paste(mut model: AppModel, text: String) -> (AppModel, AppCommand) {
    if let View::Entries(mut view) = model.view.clone() {
        match view.focus {
            EntriesFocus::Search => view.search.insert_str(&text),
            EntriesFocus::Question => model.panel.question.insert_str(&text),
            EntriesFocus::List => return (model, AppCommand::None),
        }
        model.view = View::Entries(view);
    }
    (model, AppCommand::None)
}

fn update_history_overlay(mut model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    let Some(mut overlay) = model.history.take() else {
        return (model, AppCommand::None);
    };
    match key.code {
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('q') => {
            return (model, AppCommand::None);
        }
        KeyCode::Up => overlay.scroll = overlay.scroll.saturating_sub(1),
        KeyCode::Down => overlay.scroll = overlay.scroll.saturating_add(1),
        KeyCode::PageUp => overlay.scroll = overlay.scroll.saturating_sub(10),
        KeyCode::PageDown => overlay.scroll = overlay.scroll.saturating_add(10),
        KeyCode::Home => overlay.scroll = 0,
        _ => {}
    }
    model.history = Some(overlay);
    (model, AppCommand::None)
}

fn update_files(mut model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    let total = model.files.files.len();
    let step = page_step(files_layout(model.terminal_size).list);

    match key.code {
        KeyCode::Char('q') => return (model, AppCommand::Quit),
        KeyCode::Char('?') => model.help_open = true,
        KeyCode::Char('r') | KeyCode::Char('R') => {
            model.files.loading = true;
            model.files.error = None;
            return (model, AppCommand::LoadFiles);
        }
        KeyCode::Esc => {
            if let Some(file_id) = model.entries.file_id() {
                let title = title_for(&model.files.files, file_id);
                let view = EntriesView::new(file_id, title, &model.entries);
                model.view = View::Entries(view);
            }
        }
        KeyCode::Enter | KeyCode::Right => {
            let Some(file) = model.selected_file().cloned() else {
                return (model, AppCommand::None);
            };
            if !file.processed {
                model.notice = Some(format!(
                    "{} has not been processed by the backend yet.",
                    file.display_name()
                ));
                return (model, AppCommand::None);
            }
            let command = open_file(&mut model, file.id, file.display_name().to_string());
            return (model, command);
        }
        KeyCode::Up => model.files.selected = model.files.selected.saturating_sub(1),
        KeyCode::Down => {
            model.files.selected = (model.files.selected + 1).min(total.saturating_sub(1));
        }
        KeyCode::PageUp => model.files.selected = model.files.selected.saturating_sub(step),
        KeyCode::PageDown => {
            model.files.selected = (model.files.selected + step).min(total.saturating_sub(1));
        }
        KeyCode::Home => model.files.selected = 0,
        KeyCode::End => model.files.selected = total.saturating_sub(1),
        _ => {}
    }

    (model, AppCommand::None)
}

fn update_entries(
    mut model: AppModel,
    mut view: EntriesView,
    key: KeyEvent,
) -> (AppModel, AppCommand) {
    let total = model.entries.visible().len();
    let step = page_step(entries_layout(model.terminal_size, model.panel.open).list);
    let mut command = AppCommand::None;

    match key.code {
        KeyCode::Esc => {
            if view.mark.is_some() || view.drag.is_some() {
                view.mark = None;
                view.drag = None;
            } else if model.panel.open {
                model.analysis.close();
                model.panel.open = false;
                model.panel.scroll = 0;
            } else {
                model.view = View::Files;
                return (model, AppCommand::None);
            }
        }
        KeyCode::Char('?') => model.help_open = true,
        KeyCode::Up => view.selected = view.selected.saturating_sub(1),
        KeyCode::Down => view.selected = (view.selected + 1).min(total.saturating_sub(1)),
        KeyCode::PageUp => view.selected = view.selected.saturating_sub(step),
        KeyCode::PageDown => view.selected = (view.selected + step).min(total.saturating_sub(1)),
        KeyCode::Home => view.selected = 0,
        KeyCode::End => view.selected = total.saturating_sub(1),
        KeyCode::Char(']') | KeyCode::Right => {
            command = page_command(&mut view, model.entries.next_page());
        }
        KeyCode::Char('[') | KeyCode::Left => {
            command = page_command(&mut view, model.entries.prev_page());
        }
        KeyCode::Char('{') => command = page_command(&mut view, model.entries.first_page()),
        KeyCode::Char('}') => command = page_command(&mut view, model.entries.last_page()),
        KeyCode::Char('r') => command = page_command(&mut view, model.entries.reload()),
        KeyCode::Char('/') => view.focus = EntriesFocus::Search,
        KeyCode::Char('l') => {
            view.level_index = (view.level_index + 1) % LEVEL_CYCLE.len();
            let level = LEVEL_CYCLE[view.level_index];
            command = page_command(&mut view, model.entries.set_level(level));
        }
        KeyCode::Char('v') => match view.mark.take() {
            None => {
                view.mark = Some(view.selected);
                view.drag = None;
                model.notice = Some("Mark set. Move and press v again to select.".to_string());
            }
            Some(mark) => {
                let text = marked_text(&model.entries, mark, view.selected);
                if !capture_selection(&mut model, &text) {
                    model.notice = Some(format!(
                        "Selection too short: needs more than {} characters.",
                        crate::domain::MIN_SELECTION_CHARS
                    ));
                }
            }
        },
        KeyCode::Char('a') | KeyCode::Enter => {
            command = analyze_selection(&mut model, None);
        }
        KeyCode::Char(digit @ '1'..='9') => {
            let index = digit.to_digit(10).unwrap_or(1) as usize - 1;
            match model.suggestions.quick_start().get(index).cloned() {
                Some(suggestion) => command = analyze_selection(&mut model, Some(&suggestion)),
                None => model.notice = Some(format!("No suggestion #{digit}.")),
            }
        }
        KeyCode::Tab | KeyCode::Char('i') => {
            model.panel.open = true;
            view.focus = EntriesFocus::Question;
        }
        KeyCode::Char('R') => {
            command = AppCommand::from_ticket(model.analysis.retry());
            if command == AppCommand::None {
                model.notice = Some("Nothing to retry yet.".to_string());
            } else {
                model.panel.open = true;
                model.panel.scroll = 0;
            }
        }
        KeyCode::Char('y') => {
            if model.analysis.result().is_some() {
                command = AppCommand::CopyResult;
            } else {
                model.notice = Some("No analysis result to copy yet.".to_string());
            }
        }
        KeyCode::Char('J') => model.panel.scroll = model.panel.scroll.saturating_add(1),
        KeyCode::Char('K') => model.panel.scroll = model.panel.scroll.saturating_sub(1),
        KeyCode::Char('h') => {
            model.history = Some(HistoryOverlay {
                file_id: view.file_id,
                loading: true,
                items: Vec::new(),
                error: None,
                scroll: 0,
            });
            command = AppCommand::FetchHistory {
                file_id: view.file_id,
            };
        }
        KeyCode::Char('q') => return (model, AppCommand::Quit),
        _ => {}
    }

    model.view = View::Entries(view);
    (model, command)
}

fn update_search(
    mut model: AppModel,
    mut view: EntriesView,
    key: KeyEvent,
) -> (AppModel, AppCommand) {
    let mut command = AppCommand::None;
    match key.code {
        KeyCode::Esc => {
            view.search = LineEditor::from_text(&model.entries.filter().search);
            view.focus = EntriesFocus::List;
        }
        KeyCode::Enter => {
            let search = view.search.text.clone();
            command = page_command(&mut view, model.entries.set_search(&search));
            view.focus = EntriesFocus::List;
        }
        KeyCode::Backspace => view.search.backspace(),
        KeyCode::Delete => view.search.delete_forward(),
        KeyCode::Left => view.search.move_left(),
        KeyCode::Right => view.search.move_right(),
        KeyCode::Home => view.search.move_home(),
        KeyCode::End => view.search.move_end(),
        KeyCode::Char(ch) if !ch.is_control() => view.search.insert_char(ch),
        _ => {}
    }
    model.view = View::Entries(view);
    (model, command)
}

fn update_question(
    mut model: AppModel,
    mut view: EntriesView,
    key: KeyEvent,
) -> (AppModel, AppCommand) {
    let mut command = AppCommand::None;
    match key.code {
        KeyCode::Esc | KeyCode::Tab => view.focus = EntriesFocus::List,
        KeyCode::Enter => {
            let Some(selection) = model.selection.current().cloned() else {
                model.notice = Some(no_selection_notice());
                model.view = View::Entries(view);
                return (model, AppCommand::None);
            };
            let mut question = model.panel.question.text.clone();
            let ticket = model.analysis.ask_custom(
                &selection.text,
                selection.source_file_id,
                &mut question,
            );
            model.panel.question.sync_from(&question);
            if ticket.is_some() {
                model.panel.scroll = 0;
                view.focus = EntriesFocus::List;
            }
            command = AppCommand::from_ticket(ticket);
        }
        KeyCode::Backspace => model.panel.question.backspace(),
        KeyCode::Delete => model.panel.question.delete_forward(),
        KeyCode::Left => model.panel.question.move_left(),
        KeyCode::Right => model.panel.question.move_right(),
        KeyCode::Home => model.panel.question.move_home(),
        KeyCode::End => model.panel.question.move_end(),
        KeyCode::Char(ch) if !ch.is_control() => model.panel.question.insert_char(ch),
        _ => {}
    }
    model.view = View::Entries(view);
    (model, command)
}

fn update_on_backend(mut model: AppModel, event: BackendEvent) -> AppModel {
    match event {
        BackendEvent::FilesLoaded(result) => {
            model.files.loading = false;
            match result {
                Ok(files) => {
                    model.files.selected = model.files.selected.min(files.len().saturating_sub(1));
                    model.files.files = files;
                    model.files.error = None;
                    if let View::Entries(view) = &mut model.view {
                        view.title = title_for(&model.files.files, view.file_id);
                    }
                }
                Err(error) => model.files.error = Some(error),
            }
        }
        BackendEvent::PageLoaded { seq, result } => {
            if !model.entries.apply_page(seq, result) {
                debug!(seq, "discarded stale page response");
            } else if let View::Entries(view) = &mut model.view {
                view.drag = None;
                view.mark = None;
            }
        }
        BackendEvent::SuggestionsLoaded { file_id, result } => {
            if !model.suggestions.apply(file_id, result) {
                debug!(%file_id, "discarded suggestions for inactive file");
            }
        }
        BackendEvent::AnalysisFinished { seq, result } => {
            if model.analysis.apply(seq, result) {
                model.panel.scroll = 0;
            } else {
                debug!(seq, "discarded superseded analysis result");
            }
        }
        BackendEvent::ConfigLoaded(result) => {
            if let Ok(config) = result {
                model.analysis.set_configured(Some(config.configured));
            }
        }
        BackendEvent::HistoryLoaded { file_id, result } => {
            if let Some(overlay) = model.history.as_mut().filter(|o| o.file_id == file_id) {
                overlay.loading = false;
                match result {
                    Ok(items) => overlay.items = items,
                    Err(error) => overlay.error = Some(error),
                }
            }
        }
    }
    model
}

/// Switches to the entries view for `file_id` and starts loading page one.
/// Selection and analysis belonging to another file are dropped.
fn open_file(model: &mut AppModel, file_id: FileId, title: String) -> AppCommand {
    let switching = model.entries.file_id() != Some(file_id);
    let page = model.entries.open_file(file_id);
    model.selection.on_file_changed(Some(file_id));
    if switching {
        model.analysis.close();
        model.panel = AnalysisPanel::default();
    }
    model.history = None;

    let mut commands = vec![AppCommand::FetchPage(page)];
    if let Some(file_id) = model.suggestions.activate(Some(file_id)) {
        commands.push(AppCommand::FetchSuggestions { file_id });
    }
    model.view = View::Entries(EntriesView::new(file_id, title, &model.entries));
    AppCommand::Batch(commands)
}

fn page_command(view: &mut EntriesView, request: Option<PageRequest>) -> AppCommand {
    if request.is_some() {
        view.reset_cursor();
    }
    AppCommand::from_page(request)
}

fn analyze_selection(model: &mut AppModel, suggestion: Option<&str>) -> AppCommand {
    let Some(selection) = model.selection.current().cloned() else {
        model.notice = Some(no_selection_notice());
        return AppCommand::None;
    };
    let ticket = match suggestion {
        Some(suggestion) => model.analysis.ask_suggested(
            &selection.text,
            selection.source_file_id,
            suggestion,
        ),
        None => model.analysis.submit(AnalysisRequest {
            text: selection.text,
            file_id: selection.source_file_id,
            issue_description: None,
        }),
    };
    if ticket.is_some() {
        model.panel.open = true;
        model.panel.scroll = 0;
    }
    AppCommand::from_ticket(ticket)
}

/// Records `text` as the current selection when it qualifies.
pub(super) fn capture_selection(model: &mut AppModel, text: &str) -> bool {
    let Some(file_id) = model.entries.file_id() else {
        return false;
    };
    let Some(selection) = model.selection.on_release(file_id, text) else {
        return false;
    };
    let chars = selection.text.chars().count();
    model.panel.open = true;
    model.notice = Some(format!(
        "Selected {chars} characters. a: analyze, 1-3: suggested question, Tab: ask."
    ));
    true
}

fn marked_text(entries: &EntryQuery, from: usize, to: usize) -> String {
    let (start, end) = (from.min(to), from.max(to));
    entries
        .visible()
        .iter()
        .skip(start)
        .take(end - start + 1)
        .map(|entry| entry.raw_line.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn no_selection_notice() -> String {
    "Select some log text first: drag with the mouse, or press v twice.".to_string()
}

fn title_for(files: &[LogFile], file_id: FileId) -> String {
    files
        .iter()
        .find(|file| file.id == file_id)
        .map(|file| file.display_name().to_string())
        .unwrap_or_else(|| format!("file {file_id}"))
}

fn page_step(list: ratatui::layout::Rect) -> usize {
    usize::from(list_viewport(list).height.saturating_sub(1)).max(1)
}

/// Keeps the selected row inside the list viewport for the current terminal size.
fn fit_viewport(model: &mut AppModel) {
    match &mut model.view {
        View::Files => {
            let height = usize::from(list_viewport(files_layout(model.terminal_size).list).height);
            let total = model.files.files.len();
            model.files.selected = model.files.selected.min(total.saturating_sub(1));
            model.files.offset = fit_offset(model.files.selected, model.files.offset, height, total);
        }
        View::Entries(view) => {
            let layout = entries_layout(model.terminal_size, model.panel.open);
            let height = usize::from(list_viewport(layout.list).height);
            let total = model.entries.visible().len();
            view.selected = view.selected.min(total.saturating_sub(1));
            view.offset = fit_offset(view.selected, view.offset, height, total);
        }
    }
}

fn fit_offset(selected: usize, offset: usize, height: usize, total: usize) -> usize {
    if height == 0 || total <= height {
        return 0;
    }
    let mut offset = offset;
    if selected < offset {
        offset = selected;
    } else if selected >= offset + height {
        offset = selected + 1 - height;
    }
    offset.min(total - height)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::{LogEntry, LogLevel, Pagination};

    pub fn entry(line_number: u64, level: &str, raw_line: &str) -> LogEntry {
        LogEntry {
            id: line_number as i64,
            line_number,
            timestamp: None,
            level: Some(LogLevel::from(level.to_string())),
            source: None,
            message: raw_line.to_string(),
            raw_line: raw_line.to_string(),
        }
    }

    pub fn log_file(id: u64, name: &str) -> LogFile {
        LogFile {
            id: FileId(id),
            original_filename: name.to_string(),
            file_size: 2048,
            log_type: Some("application".to_string()),
            upload_time: None,
            processed: true,
            entry_count: 480,
        }
    }

    pub fn page_of(entries: Vec<LogEntry>, page: u64, total: u64) -> EntryPage {
        EntryPage {
            entries,
            pagination: Pagination::new(page, 100, total),
        }
    }

    pub fn fetch_pages(command: &AppCommand) -> Vec<PageRequest> {
        match command {
            AppCommand::FetchPage(request) => vec![request.clone()],
            AppCommand::Batch(commands) => commands.iter().flat_map(fetch_pages).collect(),
            _ => Vec::new(),
        }
    }

    /// A model in the entries view of file 7 with `entries` loaded as page one.
    pub fn model_with_entries(entries: Vec<LogEntry>) -> AppModel {
        let total = entries.len() as u64;
        model_with_page(entries, total)
    }

    pub fn model_with_page(entries: Vec<LogEntry>, total: u64) -> AppModel {
        let mut model = AppModel::new("http://127.0.0.1:5000/api".to_string(), 100);
        model.terminal_size = (120, 40);
        let (model, _) = update(
            model,
            AppEvent::Backend(BackendEvent::FilesLoaded(Ok(vec![log_file(7, "app.log")]))),
        );
        let (model, command) = update(model, key(KeyCode::Enter));
        let request = fetch_pages(&command).pop().expect("page request");
        let (model, _) = update(
            model,
            AppEvent::Backend(BackendEvent::PageLoaded {
                seq: request.seq,
                result: Ok(page_of(entries, 1, total)),
            }),
        );
        model
    }

    pub fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }
}
