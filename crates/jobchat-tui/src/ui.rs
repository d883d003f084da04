use jobchat_core::{ChatRole, Message, RecordingState, Segment, TurnState};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::app::App;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let gauge_height = if app.controller.progress().is_some() { 1 } else { 0 };

    // Main layout: header, chat, gauge, input, footer
    let [header_area, chat_area, gauge_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(gauge_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    // Inner size minus borders, for scroll calculations
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);
    if app.follow_tail {
        app.scroll_to_bottom();
    }

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    if let Some(percent) = app.controller.progress() {
        render_gauge(percent, frame, gauge_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if let Some(alert) = app.controller.peek_alert() {
        render_alert(alert.message(), frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" 취업 지원 챗봇 ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ];

    let (tts_label, tts_style) = if app.controller.tts_enabled() {
        (" TTS on ", Style::default().bg(Color::Green).fg(Color::Black))
    } else {
        (" TTS off ", Style::default().fg(Color::Gray))
    };
    spans.push(Span::styled(tts_label, tts_style));
    spans.push(Span::raw(" "));

    match app.controller.recording_state() {
        RecordingState::Recording => spans.push(Span::styled(
            " ● REC ",
            Style::default().bg(Color::Red).fg(Color::White).bold(),
        )),
        RecordingState::Transcribing => spans.push(Span::styled(
            " Transcribing... ",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        )),
        RecordingState::Idle if app.controller.has_captured_audio() => spans.push(Span::styled(
            " recording ready ",
            Style::default().fg(Color::Yellow),
        )),
        RecordingState::Idle => {}
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn message_lines(message: &Message, streaming: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let label = match message.sender {
        ChatRole::User => Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        ChatRole::Assistant => Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
    };
    lines.push(Line::from(label));

    let link_style = Style::default()
        .fg(Color::Blue)
        .add_modifier(Modifier::UNDERLINED);
    for segments in message.content.lines() {
        let spans: Vec<Span<'static>> = segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => Span::raw(text.clone()),
                Segment::Link(url) => Span::styled(url.clone(), link_style),
            })
            .collect();
        lines.push(Line::from(spans));
    }

    if streaming {
        if let Some(last) = lines.last_mut() {
            last.push_span(Span::styled("▌", Style::default().fg(Color::DarkGray)));
        }
    }
    lines.push(Line::default());
    lines
}

fn render_chat(app: &App, frame: &mut Frame, area: Rect) {
    let controller = &app.controller;
    let title = match controller.turn_state() {
        TurnState::Streaming => " Chat (Esc to skip) ",
        TurnState::AwaitingReply => " Chat (Esc to cancel) ",
        TurnState::Idle => " Chat ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let streaming_index = controller.log().streaming_index();
    let mut lines: Vec<Line> = Vec::new();
    for (idx, message) in controller.messages().iter().enumerate() {
        lines.extend(message_lines(message, streaming_index == Some(idx)));
    }

    if controller.turn_state() == TurnState::AwaitingReply {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_gauge(percent: u8, frame: &mut Frame, area: Rect) {
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
        .percent(u16::from(percent.min(100)));
    frame.render_widget(gauge, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let controller = &app.controller;
    let (title, border) = if controller.can_submit() {
        (" Message (Enter to send) ", Color::Yellow)
    } else {
        (" Waiting for reply... ", Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);
    let inner = block.inner(area);

    // Columns up to the cursor; Hangul is two columns wide
    let input = controller.input();
    let before_cursor: String = input.chars().take(app.cursor).collect();
    let cursor_col = Span::raw(before_cursor).width() as u16;
    let offset = cursor_col.saturating_sub(inner.width.saturating_sub(1));

    let paragraph = Paragraph::new(input.to_string())
        .block(block)
        .scroll((0, offset));
    frame.render_widget(paragraph, area);

    if controller.peek_alert().is_none() {
        frame.set_cursor_position((inner.x + cursor_col - offset, inner.y));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let controller = &app.controller;
    let mut hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
    ];

    let record_label = if controller.recording_state() == RecordingState::Recording {
        " stop "
    } else {
        " record "
    };
    hints.extend(vec![
        Span::styled(" ^R ", key_style),
        Span::styled(record_label, label_style),
    ]);
    if controller.can_submit_audio() {
        hints.extend(vec![
            Span::styled(" ^S ", key_style),
            Span::styled(" send voice ", label_style),
        ]);
    }

    match controller.turn_state() {
        TurnState::AwaitingReply => hints.extend(vec![
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]),
        TurnState::Streaming => hints.extend(vec![
            Span::styled(" Esc ", key_style),
            Span::styled(" skip ", label_style),
        ]),
        TurnState::Idle => {}
    }

    hints.extend(vec![
        Span::styled(" ^T ", key_style),
        Span::styled(" TTS ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" ^C ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_alert(message: &str, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 6;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height.min(area.height));

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" 알림 ");

    let text = Text::from(vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from(Span::styled(
            "Enter / Esc to close",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    let popup = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(popup, popup_area);
}
