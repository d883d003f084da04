use jobchat_core::{ChatController, TurnState};

pub struct App {
    pub should_quit: bool,
    pub controller: ChatController,

    /// Cursor position in the controller's input buffer, in characters.
    pub cursor: usize,

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the chat area, set during render
    pub chat_width: u16,  // Inner width, for wrap calculations
    /// Keep the view pinned to the newest message until the user scrolls up.
    pub follow_tail: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(controller: ChatController) -> Self {
        Self {
            should_quit: false,
            controller,
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,
            animation_frame: 0,
        }
    }

    /// Tick animation frame and the loading gauge (called by Tick event)
    pub fn tick(&mut self) {
        if self.controller.turn_state() == TurnState::AwaitingReply {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.controller.tick_progress();
        self.sync_scroll();
    }

    /// Called after anything that may have changed the conversation.
    pub fn sync_scroll(&mut self) {
        self.clamp_cursor();
        if self.follow_tail {
            self.scroll_to_bottom();
        }
    }

    pub fn clamp_cursor(&mut self) {
        let len = self.controller.input().chars().count();
        self.cursor = self.cursor.min(len);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_tail = self.chat_scroll >= max;
    }

    pub fn half_page(&self) -> u16 {
        (self.visible_height() / 2).max(1)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
        self.follow_tail = true;
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    fn max_scroll(&self) -> u16 {
        self.total_chat_lines().saturating_sub(self.visible_height())
    }

    /// Estimated rendered height of the chat history, wrapping at the
    /// current chat width.
    pub fn total_chat_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total: usize = 0;
        for message in self.controller.messages() {
            total += 1; // "You:" / "AI:"
            for line in message.text().split('\n') {
                total += wrapped_height(line, wrap_width);
            }
            total += 1; // Blank line after message
        }
        if self.controller.turn_state() == TurnState::AwaitingReply {
            total += 2; // "AI:" + "Thinking..."
        }
        total.min(u16::MAX as usize) as u16
    }
}

/// Rows a line occupies once wrapped. Hangul and other wide glyphs take two
/// columns each.
pub fn wrapped_height(line: &str, width: usize) -> usize {
    let columns: usize = line
        .chars()
        .map(|c| if c.is_ascii() { 1 } else { 2 })
        .sum();
    if columns == 0 || width == 0 {
        1
    } else {
        columns.div_ceil(width)
    }
}
