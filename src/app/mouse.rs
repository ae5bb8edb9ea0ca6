use super::{AppCommand, AppModel, DragSelection, EntriesFocus, TextPoint, View};
use crate::domain::{LogEntry, LogLevel};
use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use unicode_width::UnicodeWidthChar;

const SCROLL_STEP: usize = 3;

/// Width of the `line level ` gutter printed before every raw line.
pub const ENTRY_GUTTER_WIDTH: usize = 13;

pub(super) fn update_on_mouse(model: AppModel, mouse: MouseEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    if model.terminal_size.0 == 0 || model.terminal_size.1 == 0 {
        return (model, AppCommand::None);
    }

    match mouse.kind {
        MouseEventKind::ScrollUp => {
            model = apply_scroll(model, mouse.column, mouse.row, ScrollDirection::Up);
        }
        MouseEventKind::ScrollDown => {
            model = apply_scroll(model, mouse.column, mouse.row, ScrollDirection::Down);
        }
        MouseEventKind::Down(MouseButton::Left) => {
            model = apply_press(model, mouse.column, mouse.row);
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            model = apply_drag(model, mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            model = apply_release(model);
        }
        _ => {}
    }

    (model, AppCommand::None)
}

#[derive(Clone, Copy, Debug)]
enum ScrollDirection {
    Up,
    Down,
}

fn apply_scroll(mut model: AppModel, col: u16, row: u16, direction: ScrollDirection) -> AppModel {
    if model.help_open {
        return model;
    }

    if let Some(overlay) = model.history.as_mut() {
        overlay.scroll = scroll_offset(overlay.scroll, direction);
        return model;
    }

    match model.view.clone() {
        View::Files => {
            let total = model.files.files.len();
            model.files.selected = scroll_index(model.files.selected, total, direction);
        }
        View::Entries(mut view) => {
            let layout = entries_layout(model.terminal_size, model.panel.open);
            if layout
                .panel
                .is_some_and(|panel| rect_contains(panel, col, row))
            {
                model.panel.scroll = scroll_offset(model.panel.scroll, direction);
                return model;
            }
            let total = model.entries.visible().len();
            view.selected = scroll_index(view.selected, total, direction);
            model.view = View::Entries(view);
        }
    }

    model
}

fn apply_press(mut model: AppModel, col: u16, row: u16) -> AppModel {
    if model.help_open || model.history.is_some() {
        return model;
    }

    match model.view.clone() {
        View::Files => {
            let layout = files_layout(model.terminal_size);
            if let Some(index) = hit_test_row(
                list_viewport(layout.list),
                model.files.offset,
                model.files.files.len(),
                row,
            ) {
                model.files.selected = index;
            }
        }
        View::Entries(mut view) => {
            let layout = entries_layout(model.terminal_size, model.panel.open);
            if !rect_contains(layout.list, col, row) {
                return model;
            }
            let point = {
                let visible = model.entries.visible();
                text_point_at(list_viewport(layout.list), view.offset, &visible, col, row)
            };
            let Some(point) = point else {
                return model;
            };
            view.focus = EntriesFocus::List;
            view.selected = point.index;
            view.mark = None;
            view.drag = Some(DragSelection {
                anchor: point,
                cursor: point,
                active: true,
            });
            model.view = View::Entries(view);
        }
    }

    model
}

fn apply_drag(mut model: AppModel, col: u16, row: u16) -> AppModel {
    let View::Entries(mut view) = model.view.clone() else {
        return model;
    };
    let Some(mut drag) = view.drag.filter(|drag| drag.active) else {
        return model;
    };

    let layout = entries_layout(model.terminal_size, model.panel.open);
    let viewport = list_viewport(layout.list);
    if viewport.height == 0 {
        return model;
    }
    let last_row = viewport.y.saturating_add(viewport.height).saturating_sub(1);
    let row = row.clamp(viewport.y, last_row);
    let col = col.max(viewport.x);

    let point = {
        let visible = model.entries.visible();
        text_point_at(viewport, view.offset, &visible, col, row)
    };
    if let Some(point) = point {
        drag.cursor = point;
        view.selected = point.index;
    }
    view.drag = Some(drag);
    model.view = View::Entries(view);
    model
}

fn apply_release(mut model: AppModel) -> AppModel {
    let View::Entries(mut view) = model.view.clone() else {
        return model;
    };
    let Some(mut drag) = view.drag.filter(|drag| drag.active) else {
        return model;
    };

    let text = {
        let visible = model.entries.visible();
        let lines: Vec<&str> = visible.iter().map(|entry| entry.raw_line.as_str()).collect();
        drag.extract(&lines)
    };

    if super::capture_selection(&mut model, &text) {
        drag.active = false;
        view.drag = Some(drag);
    } else {
        view.drag = None;
    }
    model.view = View::Entries(view);
    model
}

/// Maps a screen cell inside the entry list to a visible entry and a char
/// column inside its raw line. Cells over the gutter map to column zero.
fn text_point_at(
    viewport: Rect,
    offset: usize,
    visible: &[&LogEntry],
    col: u16,
    row: u16,
) -> Option<TextPoint> {
    if visible.is_empty() || !rect_contains(viewport, col, row) {
        return None;
    }
    let index = offset
        .saturating_add(usize::from(row - viewport.y))
        .min(visible.len() - 1);
    let x = usize::from(col - viewport.x);
    let col = match x.checked_sub(ENTRY_GUTTER_WIDTH) {
        Some(width) => char_index_at_width(&visible[index].raw_line, width),
        None => 0,
    };
    Some(TextPoint { index, col })
}

fn char_index_at_width(text: &str, width: usize) -> usize {
    let mut consumed = 0usize;
    for (index, ch) in text.chars().enumerate() {
        let ch_width = ch.width().unwrap_or(0);
        if width < consumed + ch_width.max(1) {
            return index;
        }
        consumed += ch_width;
    }
    text.chars().count()
}

pub fn entry_gutter(entry: &LogEntry) -> String {
    let level = entry.level.as_ref().map(LogLevel::as_str).unwrap_or("-");
    let gutter = format!("{:>6} {:<5.5} ", entry.line_number, level);
    gutter.chars().take(ENTRY_GUTTER_WIDTH).collect()
}

#[derive(Clone, Copy, Debug)]
pub struct FilesLayout {
    pub header: Rect,
    pub list: Rect,
    pub footer: Rect,
}

#[derive(Clone, Copy, Debug)]
pub struct EntriesLayout {
    pub header: Rect,
    pub list: Rect,
    pub panel: Option<Rect>,
    pub footer: Rect,
}

pub fn files_layout(terminal_size: (u16, u16)) -> FilesLayout {
    let [header, list, footer] = standard_chunks(terminal_size);
    FilesLayout {
        header,
        list,
        footer,
    }
}

pub fn entries_layout(terminal_size: (u16, u16), panel_open: bool) -> EntriesLayout {
    let [header, body, footer] = standard_chunks(terminal_size);
    if !panel_open || body.width == 0 || body.height == 0 {
        return EntriesLayout {
            header,
            list: body,
            panel: None,
            footer,
        };
    }

    let split = if body.width >= 100 {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
            .split(body)
    } else {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(body)
    };

    EntriesLayout {
        header,
        list: split[0],
        panel: Some(split[1]),
        footer,
    }
}

/// Area inside a fully bordered list block.
pub fn list_viewport(list: Rect) -> Rect {
    if list.width < 2 || list.height < 2 {
        return Rect {
            x: list.x,
            y: list.y,
            width: 0,
            height: 0,
        };
    }
    Rect {
        x: list.x.saturating_add(1),
        y: list.y.saturating_add(1),
        width: list.width.saturating_sub(2),
        height: list.height.saturating_sub(2),
    }
}

fn standard_chunks(terminal_size: (u16, u16)) -> [Rect; 3] {
    let area = inner_area(content_area(terminal_size));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// Everything below the one-row title bar.
pub fn content_area(terminal_size: (u16, u16)) -> Rect {
    let (width, height) = terminal_size;
    if height > 1 {
        Rect {
            x: 0,
            y: 1,
            width,
            height: height - 1,
        }
    } else {
        Rect {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

fn inner_area(area: Rect) -> Rect {
    if area.width < 40 || area.height < 12 {
        return area;
    }
    area.inner(ratatui::layout::Margin {
        vertical: 0,
        horizontal: 2,
    })
}

fn hit_test_row(viewport: Rect, offset: usize, total: usize, row: u16) -> Option<usize> {
    if total == 0 || viewport.height == 0 {
        return None;
    }
    if row < viewport.y || row >= viewport.y.saturating_add(viewport.height) {
        return None;
    }
    let index = offset.saturating_add(usize::from(row - viewport.y));
    (index < total).then_some(index)
}

fn rect_contains(area: Rect, col: u16, row: u16) -> bool {
    col >= area.x
        && col < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

fn scroll_index(selected: usize, total: usize, direction: ScrollDirection) -> usize {
    if total == 0 {
        return 0;
    }
    match direction {
        ScrollDirection::Up => selected.saturating_sub(SCROLL_STEP),
        ScrollDirection::Down => selected
            .saturating_add(SCROLL_STEP)
            .min(total.saturating_sub(1)),
    }
}

fn scroll_offset(scroll: u16, direction: ScrollDirection) -> u16 {
    let step = u16::try_from(SCROLL_STEP).unwrap_or(u16::MAX);
    match direction {
        ScrollDirection::Up => scroll.saturating_sub(step),
        ScrollDirection::Down => scroll.saturating_add(step),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{entry, model_with_entries};
    use crate::app::{AppEvent, update};
    use crossterm::event::KeyModifiers;

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> AppEvent {
        AppEvent::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn text_origin(model: &AppModel) -> (u16, u16) {
        let layout = entries_layout(model.terminal_size, model.panel.open);
        let viewport = list_viewport(layout.list);
        (viewport.x + ENTRY_GUTTER_WIDTH as u16, viewport.y)
    }

    #[test]
    fn drag_across_rows_captures_selected_text() {
        let model = model_with_entries(vec![
            entry(1, "ERROR", "2024-01-15 10:02:11 ERROR db timeout after 30s"),
            entry(2, "WARN", "2024-01-15 10:02:12 WARN retrying connection"),
        ]);
        let (x, y) = text_origin(&model);

        let (model, _) = update(model, mouse(MouseEventKind::Down(MouseButton::Left), x + 20, y));
        let (model, _) = update(model, mouse(MouseEventKind::Drag(MouseButton::Left), x + 18, y + 1));
        let (model, _) = update(model, mouse(MouseEventKind::Up(MouseButton::Left), x + 18, y + 1));

        let selection = model.selection.current().expect("selection captured");
        assert_eq!(
            selection.text,
            "ERROR db timeout after 30s\n2024-01-15 10:02:12"
        );
        assert!(model.panel.open);
        let View::Entries(view) = &model.view else {
            panic!("expected entries view");
        };
        assert!(view.drag.is_some_and(|drag| !drag.active));
    }

    #[test]
    fn plain_click_keeps_previous_selection() {
        let model = model_with_entries(vec![entry(
            1,
            "ERROR",
            "2024-01-15 10:02:11 ERROR db timeout after 30s",
        )]);
        let (x, y) = text_origin(&model);

        let (model, _) = update(model, mouse(MouseEventKind::Down(MouseButton::Left), x, y));
        let (model, _) = update(model, mouse(MouseEventKind::Drag(MouseButton::Left), x + 30, y));
        let (model, _) = update(model, mouse(MouseEventKind::Up(MouseButton::Left), x + 30, y));
        let first = model.selection.current().cloned().expect("selection");

        let (model, _) = update(model, mouse(MouseEventKind::Down(MouseButton::Left), x + 5, y));
        let (model, _) = update(model, mouse(MouseEventKind::Up(MouseButton::Left), x + 5, y));
        assert_eq!(model.selection.current(), Some(&first));
        let View::Entries(view) = &model.view else {
            panic!("expected entries view");
        };
        assert!(view.drag.is_none());
    }

    #[test]
    fn scroll_over_list_moves_selection() {
        let entries = (1..=20)
            .map(|line| entry(line, "INFO", &format!("line {line} request served")))
            .collect();
        let model = model_with_entries(entries);
        let (x, y) = text_origin(&model);
        let (model, _) = update(model, mouse(MouseEventKind::ScrollDown, x, y));
        let View::Entries(view) = &model.view else {
            panic!("expected entries view");
        };
        assert_eq!(view.selected, 3);
    }

    #[test]
    fn char_index_accounts_for_wide_chars() {
        assert_eq!(char_index_at_width("a界b", 0), 0);
        assert_eq!(char_index_at_width("a界b", 1), 1);
        assert_eq!(char_index_at_width("a界b", 2), 1);
        assert_eq!(char_index_at_width("a界b", 3), 2);
        assert_eq!(char_index_at_width("a界b", 9), 3);
    }

    #[test]
    fn gutter_has_fixed_width() {
        let short = entry(7, "INFO", "x");
        let long = entry(12_345_678, "CRITICAL", "x");
        assert_eq!(entry_gutter(&short).chars().count(), ENTRY_GUTTER_WIDTH);
        assert_eq!(entry_gutter(&long).chars().count(), ENTRY_GUTTER_WIDTH);
    }
}
