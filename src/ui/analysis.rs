use super::theme;
use crate::app::{AppModel, EntriesFocus, EntriesView};
use crate::domain::{
    AnalysisIssue, AnalysisPayload, AnalysisResult, AnalysisState, Severity, SeverityTag,
    StructuredAnalysis,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use unicode_width::UnicodeWidthStr;

pub(super) fn render_analysis_panel(
    frame: &mut Frame,
    area: Rect,
    model: &AppModel,
    view: &EntriesView,
) {
    let title = match model.analysis.state() {
        AnalysisState::Loading { .. } => "Analysis · analyzing…".to_string(),
        AnalysisState::Done(result) => format!("Analysis · {}", result.label()),
        AnalysisState::Idle => "Analysis".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .padding(Padding::horizontal(1))
        .title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let context = context_lines(model, view, inner.width);
    let context_height = u16::try_from(context.len()).unwrap_or(u16::MAX).min(inner.height);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(context_height), Constraint::Min(0)])
        .split(inner);

    frame.render_widget(Paragraph::new(context), chunks[0]);

    if view.focus == EntriesFocus::Question {
        let (before, _) = model.panel.question.split_at_cursor();
        let prefix = UnicodeWidthStr::width(QUESTION_PROMPT) + UnicodeWidthStr::width(before);
        let question_row = chunks[0]
            .y
            .saturating_add(context_height.saturating_sub(2));
        let x = chunks[0]
            .x
            .saturating_add(u16::try_from(prefix).unwrap_or(u16::MAX))
            .min(chunks[0].right().saturating_sub(1));
        frame.set_cursor_position((x, question_row));
    }

    let body = Paragraph::new(state_lines(model)).wrap(Wrap { trim: false });
    let rendered = u16::try_from(body.line_count(chunks[1].width)).unwrap_or(u16::MAX);
    let max_scroll = rendered.saturating_sub(chunks[1].height);
    let body = body.scroll((model.panel.scroll.min(max_scroll), 0));
    frame.render_widget(body, chunks[1]);
}

const QUESTION_PROMPT: &str = "Ask: ";

/// Lines pinned above the scrollable body.
fn context_lines(model: &AppModel, view: &EntriesView, width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width);
    let mut lines = Vec::new();

    match model.selection.current() {
        Some(selection) => {
            let chars = selection.text.chars().count();
            let first = selection.text.lines().next().unwrap_or("");
            let label = format!("Selection ({chars} chars): ");
            let preview = super::truncate_end(first, width.saturating_sub(label.len()));
            lines.push(Line::from(vec![
                Span::styled(label, Style::default().fg(theme::MUTED)),
                Span::styled(preview, Style::default().fg(theme::FG)),
            ]));
        }
        None => lines.push(Line::from(Span::styled(
            "No selection. Drag over log lines, or press v twice.",
            Style::default().fg(theme::DIM),
        ))),
    }

    if model.suggestions.is_loading() {
        lines.push(Line::from(Span::styled(
            "Loading suggested questions…",
            Style::default().fg(theme::DIM),
        )));
    } else if model.suggestions.quick_start().is_empty() {
        lines.push(Line::from(Span::styled(
            "No suggested questions for this file.",
            Style::default().fg(theme::DIM),
        )));
    } else {
        for (index, suggestion) in model.suggestions.quick_start().iter().enumerate() {
            let key = format!("[{}] ", index + 1);
            let text = super::truncate_end(suggestion, width.saturating_sub(key.len()));
            lines.push(Line::from(vec![
                Span::styled(key, Style::default().fg(theme::ACCENT)),
                Span::raw(text),
            ]));
        }
    }

    let question = &model.panel.question;
    let focused = view.focus == EntriesFocus::Question;
    let mut spans = vec![Span::styled(
        QUESTION_PROMPT,
        Style::default().fg(if focused { theme::ACCENT } else { theme::MUTED }),
    )];
    if question.text.is_empty() && !focused {
        spans.push(Span::styled(
            "Tab to type your own question",
            Style::default().fg(theme::DIM),
        ));
    } else {
        spans.push(Span::raw(question.text.clone()));
    }
    lines.push(Line::from(spans));

    lines.push(Line::from(Span::styled(
        "─".repeat(width),
        Style::default().fg(theme::BORDER),
    )));
    lines
}

fn state_lines(model: &AppModel) -> Vec<Line<'static>> {
    match model.analysis.state() {
        AnalysisState::Idle => vec![
            hint_line("a/Enter: analyze the selection"),
            hint_line("1-3: analyze with a suggested question"),
            hint_line("Tab: ask your own question, Enter sends"),
        ],
        AnalysisState::Loading { .. } => {
            let mut lines = vec![Line::from(Span::styled(
                "⠿ Analyzing selection…",
                Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))];
            if let Some(issue) = model
                .analysis
                .last_request()
                .and_then(|request| request.issue_description.clone())
            {
                lines.push(Line::from(vec![
                    Span::styled("Question: ", Style::default().fg(theme::MUTED)),
                    Span::raw(issue),
                ]));
            }
            lines
        }
        AnalysisState::Done(result) => {
            let mut lines = result_lines(result);
            lines.push(Line::from(""));
            match result {
                AnalysisResult::Demo { .. } => {
                    if model.analysis.configured() == Some(false) {
                        lines.push(hint_line(
                            "The backend has no analysis credentials configured; set them server-side for real results.",
                        ));
                    }
                    lines.push(hint_line("y: copy · R: run again · Esc: close"));
                }
                AnalysisResult::Failure { .. } => {
                    lines.push(hint_line("R: retry · Esc: close"));
                }
                AnalysisResult::Success { .. } => {
                    lines.push(hint_line("y: copy · J/K: scroll · Esc: close"));
                }
            }
            lines
        }
    }
}

fn hint_line(text: &str) -> Line<'static> {
    Line::from(Span::styled(text.to_string(), Style::default().fg(theme::DIM)))
}

/// Styled lines for one terminal result. Exactly one of the demo, failure
/// and success renderings is produced.
pub(super) fn result_lines(result: &AnalysisResult) -> Vec<Line<'static>> {
    match result {
        AnalysisResult::Demo { summary } => {
            let mut lines = vec![Line::from(Span::styled(
                "DEMO MODE",
                Style::default()
                    .fg(theme::WARNING)
                    .add_modifier(Modifier::BOLD),
            ))];
            lines.extend(
                summary
                    .split('\n')
                    .map(|line| Line::from(line.to_string())),
            );
            lines
        }
        AnalysisResult::Failure { error_message } => vec![
            Line::from(Span::styled(
                "Analysis failed",
                Style::default()
                    .fg(theme::ERROR)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                error_message.clone(),
                Style::default().fg(theme::ERROR),
            )),
        ],
        AnalysisResult::Success { payload } => match payload {
            AnalysisPayload::Narrative(text) if text.trim().is_empty() => {
                vec![hint_line("The analysis service returned an empty response.")]
            }
            AnalysisPayload::Narrative(text) => render_markdownish_lines(text),
            AnalysisPayload::Structured(structured) => structured_lines(structured),
        },
    }
}

/// The result as plain text, for the clipboard and the command line.
pub fn result_plain_text(result: &AnalysisResult) -> String {
    result_lines(result)
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn structured_lines(analysis: &StructuredAnalysis) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(summary) = &analysis.summary {
        lines.push(section_heading("Summary"));
        lines.extend(indented(summary));
    }

    if let Some(severity) = &analysis.severity {
        lines.push(Line::from(vec![
            Span::styled("Severity: ", Style::default().fg(theme::MUTED)),
            Span::styled(
                severity.label().to_string(),
                severity_style(severity).add_modifier(Modifier::BOLD),
            ),
        ]));
    }

    if !analysis.issues.is_empty() {
        push_gap(&mut lines);
        lines.push(section_heading(&format!("Issues ({})", analysis.issues.len())));
        for issue in &analysis.issues {
            lines.extend(issue_card(issue));
        }
    }

    if !analysis.patterns.is_empty() {
        push_gap(&mut lines);
        lines.push(section_heading("Patterns"));
        for pattern in &analysis.patterns {
            let mut spans = vec![
                Span::styled("  • ", Style::default().fg(theme::ACCENT)),
                Span::raw(pattern.description.clone().unwrap_or_else(|| "(no description)".to_string())),
            ];
            if let Some(frequency) = &pattern.frequency {
                spans.push(Span::styled(
                    format!(" · frequency: {frequency}"),
                    Style::default().fg(theme::MUTED),
                ));
            }
            lines.push(Line::from(spans));
            if let Some(significance) = &pattern.significance {
                lines.push(Line::from(Span::styled(
                    format!("    {significance}"),
                    Style::default().fg(theme::DIM),
                )));
            }
        }
    }

    if !analysis.recommendations.is_empty() {
        push_gap(&mut lines);
        lines.push(section_heading("Recommendations"));
        for (index, recommendation) in analysis.recommendations.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(format!("  {}. ", index + 1), Style::default().fg(theme::ACCENT)),
                Span::raw(recommendation.clone()),
            ]));
        }
    }

    if let Some(root_cause) = &analysis.root_cause {
        push_gap(&mut lines);
        lines.push(section_heading("Root cause"));
        lines.extend(indented(root_cause));
    }

    if let Some(timeline) = &analysis.timeline {
        push_gap(&mut lines);
        lines.push(section_heading("Timeline"));
        lines.extend(indented(timeline));
    }

    if let Some(metrics) = analysis.key_metrics.as_ref().filter(|m| !m.is_empty()) {
        push_gap(&mut lines);
        lines.push(section_heading("Key metrics"));
        let mut parts = Vec::new();
        if let Some(errors) = metrics.error_count {
            parts.push(format!("errors: {errors}"));
        }
        if let Some(warnings) = metrics.warning_count {
            parts.push(format!("warnings: {warnings}"));
        }
        if !metrics.unique_sources.is_empty() {
            parts.push(format!("sources: {}", metrics.unique_sources.join(", ")));
        }
        if let Some(range) = &metrics.time_range {
            parts.push(format!("range: {range}"));
        }
        lines.push(Line::from(format!("  {}", parts.join(" · "))));
    }

    if lines.is_empty() {
        lines.push(hint_line("The analysis contained no recognizable sections."));
    }
    lines
}

fn issue_card(issue: &AnalysisIssue) -> Vec<Line<'static>> {
    let (tag, tag_style) = match &issue.severity {
        Some(severity) => (
            format!("[{}]", severity.label()),
            severity_style(severity).add_modifier(Modifier::BOLD),
        ),
        None => ("[issue]".to_string(), Style::default().fg(theme::MUTED)),
    };

    let mut header = vec![Span::raw("  "), Span::styled(tag, tag_style)];
    if let Some(kind) = &issue.kind {
        header.push(Span::raw(format!(" {kind}")));
    }
    if let Some(time) = &issue.time {
        header.push(Span::styled(
            format!(" · {time}"),
            Style::default().fg(theme::DIM),
        ));
    }

    let mut lines = vec![Line::from(header)];
    if let Some(description) = &issue.description {
        lines.push(Line::from(format!("    {description}")));
    }
    if let Some(recommendation) = &issue.recommendation {
        lines.push(Line::from(vec![
            Span::styled("    → ", Style::default().fg(theme::SUCCESS)),
            Span::raw(recommendation.clone()),
        ]));
    }
    lines
}

fn severity_style(severity: &SeverityTag) -> Style {
    let color = match severity {
        SeverityTag::Known(Severity::Critical | Severity::High) => theme::ERROR,
        SeverityTag::Known(Severity::Medium) => theme::WARNING,
        SeverityTag::Known(Severity::Low) => theme::INFO,
        SeverityTag::Known(Severity::Info) | SeverityTag::Other(_) => theme::MUTED,
    };
    Style::default().fg(color)
}

fn section_heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(theme::ACCENT)
            .add_modifier(Modifier::BOLD),
    ))
}

fn indented(text: &str) -> Vec<Line<'static>> {
    text.split('\n')
        .map(|line| Line::from(format!("  {line}")))
        .collect()
}

fn push_gap(lines: &mut Vec<Line<'static>>) {
    if !lines.is_empty() {
        lines.push(Line::from(""));
    }
}

/// Light markdown for narrative results: headings, quotes, bullets, fenced
/// code and inline `code`/**bold**. Markers are stripped from the output.
fn render_markdownish_lines(text: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut in_code_block = false;

    for raw_line in text.split('\n') {
        let trimmed = raw_line.trim_start();
        if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            lines.push(Line::from(Span::styled(
                raw_line.to_string(),
                Style::default().fg(theme::CODE),
            )));
            continue;
        }

        let indent = &raw_line[..raw_line.len() - trimmed.len()];

        if let Some((level, heading)) = parse_markdown_heading(trimmed) {
            let style = match level {
                1 => Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                2 => Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD),
                _ => Style::default().fg(theme::FG).add_modifier(Modifier::BOLD),
            };
            lines.push(Line::from(inline_spans(heading, style)));
            continue;
        }

        if let Some(quote) = trimmed.strip_prefix("> ") {
            let style = Style::default().fg(theme::MUTED);
            let mut spans = vec![Span::raw(indent.to_string()), Span::styled("│ ", style)];
            spans.extend(inline_spans(quote, style));
            lines.push(Line::from(spans));
            continue;
        }

        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
            .or_else(|| trimmed.strip_prefix("+ "))
        {
            let mut spans = vec![
                Span::raw(indent.to_string()),
                Span::styled("• ", Style::default().fg(theme::ACCENT)),
            ];
            spans.extend(inline_spans(item, Style::default()));
            lines.push(Line::from(spans));
            continue;
        }

        lines.push(Line::from(inline_spans(raw_line, Style::default())));
    }

    lines
}

fn parse_markdown_heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|ch| *ch == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some((level, rest.trim()))
}

fn inline_spans(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let code = remaining.find('`');
        let bold = remaining.find("**");
        let (pos, is_code) = match (code, bold) {
            (Some(c), Some(b)) if b < c => (b, false),
            (Some(c), _) => (c, true),
            (None, Some(b)) => (b, false),
            (None, None) => {
                spans.push(Span::styled(remaining.to_string(), base));
                break;
            }
        };

        if pos > 0 {
            spans.push(Span::styled(remaining[..pos].to_string(), base));
        }

        let marker = if is_code { "`" } else { "**" };
        let after = &remaining[pos + marker.len()..];
        match after.find(marker) {
            Some(end) => {
                let inner = &after[..end];
                if is_code {
                    spans.push(Span::styled(inner.to_string(), Style::default().fg(theme::CODE)));
                } else {
                    spans.extend(inline_spans(inner, base.add_modifier(Modifier::BOLD)));
                }
                remaining = &after[end + marker.len()..];
            }
            None => {
                spans.push(Span::styled(marker.to_string(), base));
                remaining = after;
            }
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisPayload, RawAnalysisResponse, normalize};

    fn success_from_json(json: &str) -> AnalysisResult {
        let raw: RawAnalysisResponse = serde_json::from_str(json).expect("raw response");
        normalize(&raw)
    }

    #[test]
    fn structured_issue_renders_one_tagged_card() {
        let result = success_from_json(
            r#"{"success":true,"analysis":{
                "summary":"DB pool exhausted",
                "issues":[{"type":"performance","severity":"high","description":"Pool exhausted"}],
                "recommendations":["Increase pool size"]
            }}"#,
        );
        let text = result_plain_text(&result);
        assert_eq!(text.matches("[high]").count(), 1);
        assert!(text.contains("DB pool exhausted"));
        assert!(text.contains("Pool exhausted"));
        assert!(text.contains("1. Increase pool size"));
        assert!(!text.contains("DEMO MODE"));
        assert!(!text.contains("Analysis failed"));
    }

    #[test]
    fn narrative_markdown_is_rendered_without_markers() {
        let result = AnalysisResult::Success {
            payload: AnalysisPayload::Narrative(
                "## Root cause\n- **pool** size is `10`\n```\nSELECT 1\n```".to_string(),
            ),
        };
        let text = result_plain_text(&result);
        assert_eq!(text, "Root cause\n• pool size is 10\nSELECT 1");
    }

    #[test]
    fn demo_and_failure_render_exclusively() {
        let demo = result_plain_text(&AnalysisResult::Demo {
            summary: "Sample summary".to_string(),
        });
        assert!(demo.starts_with("DEMO MODE"));
        assert!(demo.contains("Sample summary"));
        assert!(!demo.contains("Analysis failed"));

        let failure = result_plain_text(&AnalysisResult::failure(Some("API key invalid")));
        assert_eq!(failure, "Analysis failed\nAPI key invalid");
    }

    #[test]
    fn demo_envelope_renders_summary_only() {
        let result = success_from_json(
            r#"{"demo_mode":true,"demo_analysis":{
                "summary":"Database connection timeout detected",
                "recommendations":["Raise the pool size","Add retries"]
            }}"#,
        );
        assert_eq!(
            result,
            AnalysisResult::Demo {
                summary: "Database connection timeout detected".to_string()
            }
        );
        let text = result_plain_text(&result);
        assert!(text.starts_with("DEMO MODE"));
        assert!(text.contains("Database connection timeout detected"));
        assert!(!text.contains("Recommendations"));
        assert!(!text.contains("Raise the pool size"));
        assert!(!text.contains("Issues"));
        assert!(!text.contains("Analysis failed"));
    }

    #[test]
    fn unclosed_inline_markers_are_kept() {
        let spans = inline_spans("a `b **c", Style::default());
        let text: String = spans.iter().map(|span| span.content.as_ref()).collect();
        assert_eq!(text, "a `b **c");
    }

    #[test]
    fn heading_requires_space_after_hashes() {
        assert_eq!(parse_markdown_heading("### Timeline"), Some((3, "Timeline")));
        assert_eq!(parse_markdown_heading("#hashtag"), None);
        assert_eq!(parse_markdown_heading("plain"), None);
    }
}
