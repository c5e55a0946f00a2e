use second_opinion_core::{Backend, Orchestrator, SubmitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// How the two conversations are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// One backend at a time, switched with Tab.
    Tabs,
    /// Both backends next to each other.
    Split,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub view_mode: ViewMode,

    pub orchestrator: Orchestrator,

    // Input box
    pub input: String,
    pub cursor: usize,

    // Chat scrolling. `follow` keeps the newest message in view.
    pub scroll: u16,
    pub follow: bool,
    pub chat_height: u16,
    pub chat_width: u16,

    pub animation_frame: u8,
    pub status: Option<String>,
}

impl App {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            view_mode: ViewMode::Tabs,
            orchestrator,
            input: String::new(),
            cursor: 0,
            scroll: 0,
            follow: true,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            status: None,
        }
    }

    pub fn active_backend(&self) -> Backend {
        self.orchestrator.active_backend()
    }

    pub fn is_loading(&self) -> bool {
        self.orchestrator.is_loading()
    }

    /// Send the input box to both backends.
    pub fn submit_input(&mut self) {
        match self.orchestrator.submit(&self.input) {
            Ok(_) => {
                self.input.clear();
                self.cursor = 0;
                self.status = None;
                self.follow = true;
            }
            Err(SubmitError::Busy) => {
                self.status = Some("Still waiting for both answers...".to_string());
            }
            // Blank input is simply not sent.
            Err(SubmitError::EmptyMessage) => {}
        }
    }

    pub fn select_backend(&mut self, backend: Backend) {
        if self.orchestrator.active_backend() != backend {
            self.orchestrator.set_active_backend(backend);
            self.follow = true;
        }
    }

    pub fn next_backend(&mut self) {
        let next = self.active_backend().other();
        self.select_backend(next);
    }

    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Tabs => ViewMode::Split,
            ViewMode::Split => ViewMode::Tabs,
        };
    }

    /// Tick animation frame and apply any replies that have come back.
    pub fn on_tick(&mut self) {
        let progress = self.orchestrator.drain_ready();
        if !progress.is_empty() {
            self.follow = true;
        }
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        } else {
            self.animation_frame = 0;
            if progress.iter().any(|p| p.settled) {
                self.status = None;
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }

    /// Estimate how many rows the visible chat takes once wrapped, so the view
    /// can stick to the bottom.
    pub fn chat_line_count(&self, backend: Backend, width: u16) -> u16 {
        let wrap_width = if width > 0 { width as usize } else { 50 };

        let mut total_lines: u16 = 0;
        for msg in self.orchestrator.visible(backend) {
            total_lines = total_lines.saturating_add(1); // Role line
            for line in msg.text().lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                let rows = if char_count == 0 { 1 } else { char_count.div_ceil(wrap_width) };
                total_lines = total_lines.saturating_add(rows as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank separator
        }
        if self.is_loading() {
            total_lines = total_lines.saturating_add(2);
        }
        total_lines
    }

    /// Clamp the scroll offset to the content, or pin it to the bottom when
    /// following. Called by the renderer once panel sizes are known.
    pub fn fit_scroll(&mut self, total_lines: u16) {
        let max_scroll = total_lines.saturating_sub(self.chat_height);
        if self.follow || self.scroll >= max_scroll {
            self.scroll = max_scroll;
            self.follow = true;
        }
    }
}
