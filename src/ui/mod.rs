mod analysis;
mod theme;

pub use analysis::result_plain_text;

use crate::app::{
    AppModel, ENTRY_GUTTER_WIDTH, EntriesFocus, EntriesView, HistoryOverlay, LEVEL_CYCLE,
    LineEditor, View, content_area, entries_layout, entry_gutter, files_layout, list_viewport,
};
use crate::domain::{LogEntry, LogFile};
use humansize::{DECIMAL, format_size};
use ratatui::prelude::*;
use ratatui::widgets::*;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn render(frame: &mut Frame, model: &AppModel) {
    let full_area = frame.area();
    if full_area.width == 0 || full_area.height == 0 {
        return;
    }

    render_title_bar(frame, full_area, model);

    match &model.view {
        View::Files => render_files(frame, model),
        View::Entries(view) => render_entries(frame, model, view),
    }

    let overlay_area = content_area((full_area.width, full_area.height));
    if let Some(history) = &model.history {
        render_history_overlay(frame, overlay_area, history);
    }
    if model.help_open {
        render_help_overlay(frame, overlay_area);
    }
}

fn frame_size(frame: &Frame) -> (u16, u16) {
    let area = frame.area();
    (area.width, area.height)
}

fn render_title_bar(frame: &mut Frame, area: Rect, model: &AppModel) {
    let bar_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: 1,
    };

    let base = Style::default().fg(theme::FG).bg(theme::BAR_BG);
    let mut spans = vec![
        Span::styled(
            " logscope ",
            Style::default()
                .fg(theme::ACCENT)
                .bg(theme::BAR_BG)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" ", base),
        Span::styled(
            model.api_base_url.clone(),
            Style::default().fg(theme::DIM).bg(theme::BAR_BG),
        ),
    ];
    if model.analysis.configured() == Some(false) {
        spans.push(Span::styled(
            "  demo mode",
            Style::default().fg(theme::WARNING).bg(theme::BAR_BG),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(base), bar_area);
}

fn render_files(frame: &mut Frame, model: &AppModel) {
    let layout = files_layout(frame_size(frame));

    let summary = if model.files.loading {
        "Loading files…".to_string()
    } else {
        let total: u64 = model.files.files.iter().map(|file| file.entry_count).sum();
        format!("{} files · {total} entries", model.files.files.len())
    };
    let header = Paragraph::new(Line::from(Span::styled(
        summary,
        Style::default().fg(theme::MUTED),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::BORDER))
            .padding(Padding::horizontal(1))
            .title("Log Files"),
    );
    frame.render_widget(header, layout.header);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .title("Uploaded");

    if let Some(error) = &model.files.error {
        let message = Paragraph::new(vec![
            Line::from(Span::styled(
                "Could not load the file list.",
                Style::default()
                    .fg(theme::ERROR)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(error.clone(), Style::default().fg(theme::ERROR))),
            Line::from(""),
            Line::from("Press r to retry."),
        ])
        .wrap(Wrap { trim: false })
        .block(block);
        frame.render_widget(message, layout.list);
    } else if model.files.files.is_empty() {
        let text = if model.files.loading {
            "Loading…"
        } else {
            "No log files uploaded yet."
        };
        frame.render_widget(Paragraph::new(text).block(block), layout.list);
    } else {
        let width = usize::from(list_viewport(layout.list).width).saturating_sub(2);
        let items: Vec<ListItem> = model
            .files
            .files
            .iter()
            .map(|file| file_list_item(file, width))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▸ ");
        let mut state = ListState::default()
            .with_offset(model.files.offset)
            .with_selected(Some(model.files.selected));
        frame.render_stateful_widget(list, layout.list, &mut state);
    }

    let footer = footer_paragraph(
        "Keys: arrows=move  Enter=open  Esc=back to entries  r=reload  q=quit  F1/?=help".to_string(),
        model.notice.as_deref(),
    );
    frame.render_widget(footer, layout.footer);
}

fn file_list_item(file: &LogFile, max_width: usize) -> ListItem<'static> {
    let size = format_size(file.file_size, DECIMAL);
    let kind = file.log_type.as_deref().unwrap_or("log");
    let status = if file.processed { "" } else { "  (processing)" };
    let right = format!("{kind} · {size} · {} entries{status}", file.entry_count);
    let right_width = UnicodeWidthStr::width(right.as_str());
    let name_width = max_width.saturating_sub(right_width + 2).max(8);
    let name = truncate_end(file.display_name(), name_width);
    let padding = name_width.saturating_sub(UnicodeWidthStr::width(name.as_str())) + 2;

    ListItem::new(Line::from(vec![
        Span::styled(name, Style::default().fg(theme::FG)),
        Span::raw(" ".repeat(padding)),
        Span::styled(
            right,
            Style::default().fg(if file.processed { theme::MUTED } else { theme::WARNING }),
        ),
    ]))
}

fn render_entries(frame: &mut Frame, model: &AppModel, view: &EntriesView) {
    let layout = entries_layout(frame_size(frame), model.panel.open);

    render_entries_header(frame, layout.header, model, view);
    render_entry_list(frame, layout.list, model, view);
    if let Some(panel) = layout.panel {
        analysis::render_analysis_panel(frame, panel, model, view);
    }

    let base = if model.panel.open {
        "Keys: drag/v=select  a=analyze  1-3=suggested  Tab=ask  R=retry  y=copy  h=history  Esc=close  F1=help"
    } else {
        "Keys: drag/v=select  a=analyze  [/]=page  {/}=first/last  /=search  l=level  h=history  Esc=back  F1=help"
    };
    let footer = footer_paragraph(base.to_string(), model.notice.as_deref());
    frame.render_widget(footer, layout.footer);
}

fn render_entries_header(frame: &mut Frame, area: Rect, model: &AppModel, view: &EntriesView) {
    let paging = match model.entries.pagination() {
        Some(pagination) => format!(
            "page {}/{} · {} entries",
            pagination.page,
            pagination.pages.max(1),
            pagination.total
        ),
        None => format!("page {}", model.entries.page()),
    };
    let shown = model.entries.visible().len();
    let fetched = model.entries.entries().len();
    let narrowed = if shown < fetched {
        format!(" · {shown}/{fetched} shown")
    } else {
        String::new()
    };
    let loading = if model.entries.is_loading() {
        " · loading…"
    } else {
        ""
    };
    let title = format!("{} · {paging}{narrowed}{loading}", view.title);

    let level = LEVEL_CYCLE
        .get(view.level_index)
        .copied()
        .flatten()
        .unwrap_or("all");
    let focused = view.focus == EntriesFocus::Search;
    let mut spans = vec![Span::styled(
        "Search: ",
        Style::default().fg(if focused { theme::ACCENT } else { theme::MUTED }),
    )];
    if view.search.text.is_empty() && !focused {
        spans.push(Span::styled("/ to search this page", Style::default().fg(theme::DIM)));
    } else {
        spans.push(Span::raw(view.search.text.clone()));
    }
    spans.push(Span::styled("   Level: ", Style::default().fg(theme::MUTED)));
    spans.push(Span::styled(level.to_string(), level_style_for(level)));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .padding(Padding::horizontal(1))
        .title(title);
    let inner = block.inner(area);
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);

    if focused {
        set_editor_cursor(frame, inner, "Search: ", &view.search);
    }
}

fn set_editor_cursor(frame: &mut Frame, inner: Rect, prompt: &str, editor: &LineEditor) {
    if inner.width == 0 || inner.height == 0 {
        return;
    }
    let (before, _) = editor.split_at_cursor();
    let offset = UnicodeWidthStr::width(prompt) + UnicodeWidthStr::width(before);
    let x = inner
        .x
        .saturating_add(u16::try_from(offset).unwrap_or(u16::MAX))
        .min(inner.right().saturating_sub(1));
    frame.set_cursor_position((x, inner.y));
}

fn render_entry_list(frame: &mut Frame, area: Rect, model: &AppModel, view: &EntriesView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .title("Entries");

    if let Some(error) = model.entries.error() {
        let message = Paragraph::new(vec![
            Line::from(Span::styled(
                "Failed to load entries.",
                Style::default()
                    .fg(theme::ERROR)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(error.to_string(), Style::default().fg(theme::ERROR))),
            Line::from(""),
            Line::from("Press r to retry."),
        ])
        .wrap(Wrap { trim: false })
        .block(block);
        frame.render_widget(message, area);
        return;
    }

    let visible = model.entries.visible();
    if visible.is_empty() {
        let text = if model.entries.is_loading() {
            "Loading…"
        } else if model.entries.entries().is_empty() {
            "This page has no entries."
        } else {
            "No entries on this page match the filter."
        };
        frame.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(theme::DIM))).block(block),
            area,
        );
        return;
    }

    let viewport = list_viewport(area);
    let text_width = usize::from(viewport.width).saturating_sub(ENTRY_GUTTER_WIDTH);
    let marked = view.marked_rows();
    let lines: Vec<Line> = visible
        .iter()
        .enumerate()
        .skip(view.offset)
        .take(usize::from(viewport.height))
        .map(|(index, entry)| {
            let row_marked = marked.is_some_and(|(from, to)| index >= from && index <= to);
            entry_line(entry, index, view, row_marked, text_width)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn entry_line(
    entry: &LogEntry,
    index: usize,
    view: &EntriesView,
    row_marked: bool,
    text_width: usize,
) -> Line<'static> {
    let row_style = if index == view.selected {
        Style::default().bg(theme::SURFACE_2)
    } else {
        Style::default()
    };
    let selected_style = Style::default().fg(theme::FG).bg(theme::SELECTION_BG);

    let gutter_style = entry
        .level
        .as_ref()
        .map(|level| level_style_for(level.as_str()))
        .unwrap_or_else(|| Style::default().fg(theme::DIM));
    let mut spans = vec![Span::styled(entry_gutter(entry), row_style.patch(gutter_style))];

    let raw = take_prefix_width(&entry.raw_line, text_width);
    let chars = raw.chars().count();
    let range = if row_marked {
        Some((0, chars))
    } else {
        view.drag.and_then(|drag| drag.columns_on(index, chars))
    };

    match range {
        Some((from, to)) if from < to => {
            let before: String = raw.chars().take(from).collect();
            let inside: String = raw.chars().skip(from).take(to - from).collect();
            let after: String = raw.chars().skip(to).collect();
            spans.push(Span::styled(before, row_style));
            spans.push(Span::styled(inside, selected_style));
            spans.push(Span::styled(after, row_style));
        }
        _ => spans.push(Span::styled(raw, row_style)),
    }

    Line::from(spans)
}

fn level_style_for(level: &str) -> Style {
    let color = match level {
        "ERROR" | "CRITICAL" | "FATAL" => theme::ERROR,
        "WARN" | "WARNING" => theme::WARNING,
        "INFO" => theme::INFO,
        "DEBUG" | "TRACE" => theme::DIM,
        _ => theme::MUTED,
    };
    Style::default().fg(color)
}

fn footer_paragraph(base: String, notice: Option<&str>) -> Paragraph<'static> {
    let mut spans = vec![Span::raw(base)];
    if let Some(notice) = notice.filter(|notice| !notice.trim().is_empty()) {
        spans.push(Span::raw("  ·  "));
        spans.push(Span::styled(
            notice.to_string(),
            Style::default().fg(theme::ACCENT),
        ));
    }
    Paragraph::new(Line::from(spans)).style(Style::default().fg(theme::DIM))
}

fn render_history_overlay(frame: &mut Frame, area: Rect, history: &HistoryOverlay) {
    let popup = centered_rect(80, 70, area);
    frame.render_widget(Clear, popup);

    let mut lines = Vec::new();
    if history.loading {
        lines.push(Line::from(Span::styled("Loading…", Style::default().fg(theme::DIM))));
    } else if let Some(error) = &history.error {
        lines.push(Line::from(Span::styled(
            format!("Could not load history: {error}"),
            Style::default().fg(theme::ERROR),
        )));
    } else if history.items.is_empty() {
        lines.push(Line::from("No analyses recorded for this file yet."));
    } else {
        let width = usize::from(popup.width).saturating_sub(6);
        for item in &history.items {
            let when = item.created_at.as_deref().unwrap_or("unknown time");
            lines.push(Line::from(vec![
                Span::styled(format!("#{} ", item.id), Style::default().fg(theme::ACCENT)),
                Span::styled(when.to_string(), Style::default().fg(theme::MUTED)),
            ]));
            let selected = item.selected_text.lines().next().unwrap_or("");
            lines.push(Line::from(Span::styled(
                format!("  > {}", truncate_end(selected, width.saturating_sub(4))),
                Style::default().fg(theme::DIM),
            )));
            for summary_line in item.analysis_summary.lines() {
                lines.push(Line::from(format!("  {summary_line}")));
            }
            lines.push(Line::from(""));
        }
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((history.scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .padding(Padding::horizontal(1))
                .title(format!("Analysis history · file {} (Esc to close)", history.file_id)),
        );
    frame.render_widget(paragraph, popup);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(74, 76, area);
    frame.render_widget(Clear, popup);

    let text = vec![
        Line::from("Files"),
        Line::from("  - Arrows/PgUp/PgDn: move · Enter: open · r: reload list"),
        Line::from("  - Esc: return to the open file"),
        Line::from(""),
        Line::from("Entries"),
        Line::from("  - ] / [: next / previous page · } / {: last / first page"),
        Line::from("  - /: search this page (Enter applies, Esc cancels)"),
        Line::from("  - l: cycle level filter · r: reload page"),
        Line::from("  - Mouse drag: select text · v: mark lines, v again to select"),
        Line::from(""),
        Line::from("Analysis"),
        Line::from("  - a or Enter: analyze the selection"),
        Line::from("  - 1-3: analyze with a suggested question"),
        Line::from("  - Tab: type your own question, Enter sends"),
        Line::from("  - R: retry · y: copy result · J/K: scroll panel"),
        Line::from("  - h: analysis history for this file"),
        Line::from("  - Esc: clear selection highlight, close panel, then go back"),
        Line::from(""),
        Line::from("Global"),
        Line::from("  - Ctrl+Q or Ctrl+C: quit · F1 or ?: toggle this help"),
    ];

    let paragraph = Paragraph::new(text).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .padding(Padding::horizontal(1))
            .title("Help (F1 or ? to close)"),
    );
    frame.render_widget(paragraph, popup);
}

fn truncate_end(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let mut out = take_prefix_width(text, max_width.saturating_sub(1));
    out.push('…');
    out
}

fn take_prefix_width(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        used += ch_width;
        out.push(ch);
    }
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{entry, fetch_pages, key, model_with_entries, page_of};
    use crate::app::{AppEvent, BackendEvent, update};
    use crossterm::event::KeyCode;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw(model: &AppModel) -> String {
        let backend = TestBackend::new(model.terminal_size.0, model.terminal_size.1);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal.draw(|frame| render(frame, model)).expect("draw");
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn entries_view_shows_gutter_and_paging() {
        let model = model_with_entries(vec![
            entry(41, "ERROR", "db timeout after 30s"),
            entry(42, "INFO", "request served"),
        ]);
        let screen = draw(&model);
        assert!(screen.contains("app.log · page 1/1 · 2 entries"));
        assert!(screen.contains("    41 ERROR db timeout after 30s"));
        assert!(screen.contains("    42 INFO  request served"));
    }

    #[test]
    fn level_with_no_entries_shows_filter_message() {
        let mut model = model_with_entries(vec![entry(1, "INFO", "request served")]);
        model.entries.set_level(Some("ERROR"));
        let screen = draw(&model);
        assert!(screen.contains("Loading…") || screen.contains("match the filter"));
    }

    #[test]
    fn header_counts_lines_hidden_by_level_filter() {
        let model = model_with_entries(vec![entry(1, "INFO", "request served")]);
        let (model, command) = update(model, key(KeyCode::Char('l')));
        let request = fetch_pages(&command).pop().expect("refetch");
        let (model, _) = update(
            model,
            AppEvent::Backend(BackendEvent::PageLoaded {
                seq: request.seq,
                result: Ok(page_of(
                    vec![
                        entry(1, "ERROR", "db timeout after 30s"),
                        entry(2, "INFO", "request served"),
                    ],
                    1,
                    2,
                )),
            }),
        );
        let screen = draw(&model);
        assert!(screen.contains("page 1/1 · 2 entries · 1/2 shown"));
        assert!(!screen.contains("request served"));
    }

    #[test]
    fn take_prefix_width_stops_before_wide_char_overflow() {
        assert_eq!(take_prefix_width("ab界c", 3), "ab");
        assert_eq!(take_prefix_width("ab界c", 4), "ab界");
        assert_eq!(truncate_end("abcdef", 4), "abc…");
    }
}
