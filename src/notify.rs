//! User-facing notices.
//!
//! Components raise and cancel notices through an injected
//! [`NotificationCenter`]. A keyed notice replaces any live notice with the
//! same key, so a later workflow stage can swap out an earlier one.

use std::time::Duration;

use console::{style, Term};
use parking_lot::Mutex;

/// Key of the loading notice shown while uploads are in flight.
pub const UPLOAD_NOTICE_KEY: &str = "upload-start";
/// Key of the loading notice shown while the backend classifies uploads.
pub const PROCESSING_NOTICE_KEY: &str = "ai-processing";

/// Default lifetime for auto-closing notices.
pub const DEFAULT_AUTO_CLOSE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
    /// Spinner-style notice that stays until hidden or replaced.
    Loading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub key: Option<String>,
    pub title: String,
    pub message: String,
    pub level: NoticeLevel,
    /// `None` means the notice stays until hidden.
    pub auto_close: Option<Duration>,
}

impl Notice {
    fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: None,
            title: title.into(),
            message: message.into(),
            level,
            auto_close: Some(DEFAULT_AUTO_CLOSE),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }

    pub fn loading(
        key: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            key: Some(key.into()),
            auto_close: None,
            ..Self::new(NoticeLevel::Loading, title, message)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.level != NoticeLevel::Loading
    }
}

/// Sink for user-facing notices.
pub trait NotificationCenter: Send + Sync {
    fn show(&self, notice: Notice);
    /// Dismiss the live notice with `key`, if any.
    fn hide(&self, key: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeEvent {
    Shown(Notice),
    Hidden(String),
}

#[derive(Debug, Default)]
struct BoardState {
    live: Vec<Notice>,
    history: Vec<NoticeEvent>,
}

/// In-memory notice registry that keeps the live set and a full history.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    state: Mutex<BoardState>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> Vec<Notice> {
        self.state.lock().live.clone()
    }

    pub fn live_with_key(&self, key: &str) -> Option<Notice> {
        self.state
            .lock()
            .live
            .iter()
            .find(|n| n.key.as_deref() == Some(key))
            .cloned()
    }

    pub fn history(&self) -> Vec<NoticeEvent> {
        self.state.lock().history.clone()
    }

    /// Every notice ever shown, oldest first.
    pub fn shown(&self) -> Vec<Notice> {
        self.state
            .lock()
            .history
            .iter()
            .filter_map(|event| match event {
                NoticeEvent::Shown(notice) => Some(notice.clone()),
                NoticeEvent::Hidden(_) => None,
            })
            .collect()
    }

    pub fn shown_with_level(&self, level: NoticeLevel) -> Vec<Notice> {
        self.shown()
            .into_iter()
            .filter(|n| n.level == level)
            .collect()
    }

    pub fn last_terminal(&self) -> Option<Notice> {
        self.shown().into_iter().rev().find(Notice::is_terminal)
    }
}

impl NotificationCenter for NoticeBoard {
    fn show(&self, notice: Notice) {
        let mut state = self.state.lock();
        if let Some(key) = notice.key.as_deref() {
            state.live.retain(|n| n.key.as_deref() != Some(key));
        }
        state.live.push(notice.clone());
        state.history.push(NoticeEvent::Shown(notice));
    }

    fn hide(&self, key: &str) {
        let mut state = self.state.lock();
        state.live.retain(|n| n.key.as_deref() != Some(key));
        state.history.push(NoticeEvent::Hidden(key.to_string()));
    }
}

/// Writes notices to the terminal.
pub struct ConsoleNotifier {
    term: Term,
}

impl ConsoleNotifier {
    pub fn stderr() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn render(notice: &Notice) -> String {
        let title = match notice.level {
            NoticeLevel::Info => style(notice.title.as_str()).cyan().bold(),
            NoticeLevel::Success => style(notice.title.as_str()).green().bold(),
            NoticeLevel::Error => style(notice.title.as_str()).red().bold(),
            NoticeLevel::Loading => style(notice.title.as_str()).blue().bold(),
        };
        let marker = if notice.level == NoticeLevel::Loading {
            "… "
        } else {
            ""
        };
        format!("{marker}{title}: {}", notice.message)
    }
}

impl NotificationCenter for ConsoleNotifier {
    fn show(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => {
                tracing::warn!(key = ?notice.key, "{}: {}", notice.title, notice.message)
            }
            _ => tracing::debug!(key = ?notice.key, "{}: {}", notice.title, notice.message),
        }
        let _ = self.term.write_line(&Self::render(&notice));
    }

    fn hide(&self, key: &str) {
        tracing::trace!(key, "notice hidden");
    }
}
