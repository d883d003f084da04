use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use jobchat_core::{RecordingState, SubmitOutcome};
use tracing::debug;

use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.sync_scroll(),
        AppEvent::Tick => app.tick(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    // An open alert swallows everything until it is dismissed
    if app.controller.peek_alert().is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.controller.take_alert();
        }
        return;
    }

    if ctrl {
        handle_shortcut(app, key.code);
        return;
    }

    match key.code {
        KeyCode::Enter => submit(app),
        KeyCode::Esc => {
            if !app.controller.cancel_request() {
                app.controller.finish_reveal();
            }
            app.sync_scroll();
        }

        // Chat scrolling
        KeyCode::PageUp => app.scroll_up(app.half_page()),
        KeyCode::PageDown => app.scroll_down(app.half_page()),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),

        // Input editing
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let input = app.controller.input_mut();
                let byte_pos = char_to_byte_index(input, app.cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let input = app.controller.input_mut();
            if app.cursor < input.chars().count() {
                let byte_pos = char_to_byte_index(input, app.cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.controller.input().chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.controller.input().chars().count();
        }
        KeyCode::Char(c) => {
            let input = app.controller.input_mut();
            let byte_pos = char_to_byte_index(input, app.cursor);
            input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn handle_shortcut(app: &mut App, code: KeyCode) {
    match code {
        // Record / stop
        KeyCode::Char('r') => {
            if app.controller.recording_state() == RecordingState::Recording {
                app.controller.stop_capture();
            } else {
                app.controller.start_capture();
            }
        }
        // Send the last recording
        KeyCode::Char('s') => {
            let outcome = app.controller.submit_captured_audio();
            debug!("voice submit: {:?}", outcome);
            app.scroll_to_bottom();
        }
        KeyCode::Char('t') => {
            app.controller.toggle_tts();
        }
        // Clear the input line
        KeyCode::Char('u') => {
            app.controller.input_mut().clear();
            app.cursor = 0;
        }
        _ => {}
    }
}

fn submit(app: &mut App) {
    match app.controller.submit_input() {
        SubmitOutcome::Sent => {
            app.cursor = 0;
            app.scroll_to_bottom();
        }
        SubmitOutcome::LoginRequired => app.scroll_to_bottom(),
        outcome => debug!("submit ignored: {:?}", outcome),
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        _ => {}
    }
}
