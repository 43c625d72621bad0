//! Transient user-facing notices.
//!
//! Operations that the user should hear about (welcome after login, expired
//! session, server-side failures) push a `Notice` to a `Notifier`. The
//! `NoticeBoard` keeps a short history and exposes the latest notice while
//! it is still fresh, which is what the status bar shows.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

/// How long a notice stays visible.
const NOTICE_TTL_SECS: i64 = 4;

/// Notices kept for inspection; older ones are dropped.
const MAX_NOTICES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn is_fresh(&self) -> bool {
        Utc::now() - self.at < Duration::seconds(NOTICE_TTL_SECS)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Shared, bounded notice history. Clone is cheap.
#[derive(Clone, Default)]
pub struct NoticeBoard {
    notices: Arc<Mutex<VecDeque<Notice>>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent notice, if it has not faded yet
    pub fn current(&self) -> Option<Notice> {
        self.lock().back().filter(|n| n.is_fresh()).cloned()
    }

    /// All retained notices, oldest first
    pub fn history(&self) -> Vec<Notice> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Notice>> {
        self.notices.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Notifier for NoticeBoard {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!(text = %notice.text, "notice"),
            NoticeLevel::Warning => warn!(text = %notice.text, "notice"),
        }
        let mut notices = self.lock();
        if notices.len() == MAX_NOTICES {
            notices.pop_front();
        }
        notices.push_back(notice);
    }
}
