use crate::types::{ContentKind, Message, Role};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

/// Flatten the transcript into display lines, one string per terminal row
/// before wrapping. Pure so it can be tested without a terminal.
pub fn transcript_lines(messages: &[Message]) -> Vec<String> {
    let mut lines = Vec::new();

    for message in messages {
        match message.kind {
            ContentKind::Loader => {
                lines.push("... working ...".to_string());
                continue;
            }
            kind if kind.is_opaque() => {
                // Binary/markup payloads are placeholders in a terminal.
                lines.push(format!("[{} result omitted]", kind.wire_name()));
                continue;
            }
            _ => {}
        }

        let prefix = line_prefix(message);
        for (index, text_line) in message.text.lines().enumerate() {
            if index == 0 {
                lines.push(format!("{prefix}{text_line}"));
            } else {
                lines.push(format!("{}{text_line}", continuation_prefix(message)));
            }
        }
        if message.text.is_empty() {
            lines.push(prefix.to_string());
        }
    }

    lines
}

fn line_prefix(message: &Message) -> &'static str {
    if message.kind == ContentKind::ErrorMessage {
        return "!! ";
    }
    if message.kind == ContentKind::Code {
        return "    ";
    }
    match message.role {
        Role::User => "> ",
        Role::Generator => "",
        Role::System => "* ",
        // Superseded output stays visible but clearly marked stale.
        Role::SystemHide => "~ ",
        Role::Upload => "[upload] ",
    }
}

fn continuation_prefix(message: &Message) -> &'static str {
    match message.kind {
        ContentKind::Code => "    ",
        ContentKind::ErrorMessage => "!! ",
        _ => match message.role {
            Role::SystemHide => "~ ",
            _ => "  ",
        },
    }
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let text = truncate_line(status, area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

pub fn render_transcript(frame: &mut Frame<'_>, area: Rect, lines: &[String], scroll: usize) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let body = lines.join("\n");
    let paragraph = Paragraph::new(body)
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));
    frame.render_widget(paragraph, area);
}

pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &str, cursor_byte: usize) {
    if area.height == 0 || area.width <= 2 {
        return;
    }

    let text = format!("> {input}");
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::DIM))
            .wrap(Wrap { trim: false }),
        area,
    );

    let cursor_cells: usize = input[..cursor_byte.min(input.len())]
        .chars()
        .map(|ch| ch.width().unwrap_or(0))
        .sum();
    let width = area.width.saturating_sub(2).max(1) as usize;
    let cursor_x = area.x + 2 + (cursor_cells % width) as u16;
    let cursor_y = area.y + (cursor_cells / width) as u16;
    frame.set_cursor_position((
        cursor_x.min(area.x + area.width.saturating_sub(1)),
        cursor_y.min(area.y + area.height.saturating_sub(1)),
    ));
}

/// Modal shown while another instance holds the session.
pub fn render_suspended_modal(frame: &mut Frame<'_>) {
    let size = frame.area();
    let width = size.width.clamp(40, 70);
    let height = 8.min(size.height);
    let x = size.x + (size.width.saturating_sub(width)) / 2;
    let y = size.y + (size.height.saturating_sub(height)) / 2;
    let area = Rect::new(x, y, width, height);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Another Session Detected")
        .style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::from("Another instance has taken over this session."),
        Line::from("Polling is suspended in this window."),
        Line::from(""),
        Line::styled(
            "c continue here (suspends the other instance)",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::from("ctrl+c quit"),
    ];

    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false }),
        inner,
    );
}

fn truncate_line(input: &str, width: usize) -> String {
    let width = width.max(1);
    let mut out = String::new();
    let mut used = 0usize;

    for ch in input.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }

    out
}
