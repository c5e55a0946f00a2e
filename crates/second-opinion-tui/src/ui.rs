use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
};
use second_opinion_core::{Backend, ChatMessage};
use crate::app::{App, InputMode, ViewMode};

/// Parse inline markdown: **bold** and `code`. Anything unclosed is literal.
fn parse_inline(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        let (closing, style) = match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                ("**", base.add_modifier(Modifier::BOLD))
            }
            '`' => ("`", base.fg(Color::Magenta)),
            _ => {
                current_text.push(c);
                continue;
            }
        };

        // Collect until the closing marker
        let mut inner = String::new();
        let mut found_close = false;
        while let Some(c) = chars.next() {
            if closing == "**" && c == '*' && chars.peek() == Some(&'*') {
                chars.next();
                found_close = true;
                break;
            }
            if closing == "`" && c == '`' {
                found_close = true;
                break;
            }
            inner.push(c);
        }

        if found_close && !inner.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut current_text), base));
            }
            spans.push(Span::styled(inner, style));
        } else {
            current_text.push_str(closing);
            current_text.push_str(&inner);
            if found_close {
                current_text.push_str(closing);
            }
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::styled(current_text, base));
    }
    spans
}

/// Render a markdown answer line by line: fenced code blocks, headings,
/// bullets, and inline emphasis.
fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let code_style = Style::default().fg(Color::Green);
    let mut lines = Vec::new();
    let mut in_code = false;

    for raw in text.lines() {
        if raw.trim_start().starts_with("```") {
            in_code = !in_code;
            continue;
        }
        if in_code {
            lines.push(Line::from(Span::styled(format!("  {}", raw), code_style)));
            continue;
        }

        let trimmed = raw.trim_start();
        if let Some(heading) = trimmed.strip_prefix('#') {
            let heading = heading.trim_start_matches('#').trim();
            lines.push(Line::from(Span::styled(
                heading.to_string(),
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )));
        } else if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            let mut spans = vec![Span::raw("  • ")];
            spans.extend(parse_inline(item, Style::default()));
            lines.push(Line::from(spans));
        } else if raw.is_empty() {
            lines.push(Line::default());
        } else {
            lines.push(Line::from(parse_inline(raw, Style::default())));
        }
    }
    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, input, footer
    let [header_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.view_mode {
        ViewMode::Tabs => {
            let backend = app.active_backend();
            fit_chat(app, body_area, &[backend]);
            render_chat(app, frame, body_area, backend, true);
        }
        ViewMode::Split => {
            let [left, right] = Layout::horizontal([
                Constraint::Percentage(50),
                Constraint::Percentage(50),
            ])
            .areas(body_area);
            fit_chat(app, left, &Backend::ALL);
            let active = app.active_backend();
            render_chat(app, frame, left, Backend::Claude, active == Backend::Claude);
            render_chat(app, frame, right, Backend::ChatGpt, active == Backend::ChatGpt);
        }
    }

    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let titles: Vec<Line> = Backend::ALL
        .iter()
        .enumerate()
        .map(|(i, b)| Line::from(format!(" {} {} ", i + 1, b.display_name())))
        .collect();
    let selected = Backend::ALL
        .iter()
        .position(|b| *b == app.active_backend())
        .unwrap_or(0);

    let mode = match app.view_mode {
        ViewMode::Tabs => "tabs",
        ViewMode::Split => "split",
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(format!(" Second Opinion ({}) ", mode)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        );

    frame.render_widget(tabs, area);
}

/// Record panel size and settle the scroll offset before drawing.
fn fit_chat(app: &mut App, area: Rect, backends: &[Backend]) {
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    let total = backends
        .iter()
        .map(|b| app.chat_line_count(*b, app.chat_width))
        .max()
        .unwrap_or(0);
    app.fit_scroll(total);
}

fn message_lines(msg: &ChatMessage) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if msg.is_user() {
        lines.push(Line::from(Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(msg.text().to_string()));
    } else {
        let label = format!("{}:", msg.backend().display_name());
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        if msg.is_placeholder() {
            lines.push(Line::from(Span::styled(
                msg.text().to_string(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.extend(render_markdown(msg.text()));
        }
    }
    lines.push(Line::default());
    lines
}

fn render_chat(app: &App, frame: &mut Frame, area: Rect, backend: Backend, focused: bool) {
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", backend.display_name()));

    let visible = app.orchestrator.visible(backend);
    let chat_text = if visible.is_empty() && !app.is_loading() {
        Text::from(Span::styled(
            "Ask anything. Both models answer at once.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = visible.iter().flat_map(|m| message_lines(m)).collect();

        if app.is_loading() {
            lines.push(Line::from(Span::styled(
                format!("{}:", backend.display_name()),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            let label = if app.orchestrator.is_pending(backend) {
                format!("Thinking{}", dots)
            } else {
                format!("Waiting for the other model{}", dots)
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let title = if app.is_loading() {
        " Ask both (waiting for answers) "
    } else {
        " Ask both "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || app.cursor < inner_width {
        0
    } else {
        app.cursor - inner_width + 1
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let line = match &app.status {
        Some(status) => Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        )),
        None => {
            let hints = match app.input_mode {
                InputMode::Editing => {
                    "Enter send  Tab switch model  Ctrl+V split view  PgUp/PgDn scroll  Esc normal mode"
                }
                InputMode::Normal => {
                    "i edit  1/2 select model  v split view  j/k scroll  q quit"
                }
            };
            Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray)))
        }
    };
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_inline_bold_and_code() {
        let spans = parse_inline("use **this** and `that`", Style::default());
        let contents: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(contents, vec!["use ", "this", " and ", "that"]);
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[3].style.fg, Some(Color::Magenta));
    }

    #[test]
    fn test_unclosed_marker_is_literal() {
        let spans = parse_inline("2 ** 3", Style::default());
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "2 ** 3");
    }

    #[test]
    fn test_markdown_block_structure() {
        let lines = render_markdown("# Title\n- one\n\n```\nlet x = 1;\n```\nend");
        let rendered: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(rendered, vec!["Title", "  • one", "", "  let x = 1;", "end"]);
    }
}
