use serde::Serialize;
use tokio::sync::Mutex;

/// User-facing alerts raised by the export tab, queued until the UI drains
/// them.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Inline, non-blocking.
    Warning { message: String },
    /// Blocking dialog with optional detail lines.
    Modal { title: String, details: Vec<String> },
}

#[derive(Debug, Default)]
pub struct NoticeBoard {
    pending: Mutex<Vec<Notice>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, notice: Notice) {
        self.pending.lock().await.push(notice);
    }

    pub async fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.pending.lock().await)
    }

    pub async fn peek(&self) -> Vec<Notice> {
        self.pending.lock().await.clone()
    }
}
