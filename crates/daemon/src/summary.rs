use std::sync::Arc;

use chrono::{DateTime, Utc};
use save_export_backend::Backend;
use save_export_core::{format_size, ExportResult};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::notice::{Notice, NoticeBoard};
use crate::table::TableController;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SummaryView {
    #[serde(flatten)]
    pub result: ExportResult,
    pub total_size_display: String,
    /// Set only when at least one game failed; drives the failure region.
    pub failure_message: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl SummaryView {
    pub fn failure_region_visible(&self) -> bool {
        self.failure_message.is_some()
    }
}

/// The summary pane replaces the tab's content view while `visible`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SummaryPanel {
    pub visible: bool,
    pub done_visible: bool,
    pub view: Option<SummaryView>,
}

impl SummaryPanel {
    pub fn content_visible(&self) -> bool {
        !self.visible
    }
}

pub struct ExportSummaryPresenter {
    backend: Arc<dyn Backend>,
    table: Arc<TableController>,
    notices: Arc<NoticeBoard>,
    panel: Mutex<SummaryPanel>,
}

impl ExportSummaryPresenter {
    pub fn new(backend: Arc<dyn Backend>, table: Arc<TableController>, notices: Arc<NoticeBoard>) -> Self {
        Self {
            backend,
            table,
            notices,
            panel: Mutex::new(SummaryPanel::default()),
        }
    }

    /// Shows the summary for a finished export. The size shown is that of
    /// whatever is selected in the table right now, which can differ from
    /// the exported set if the selection changed while the export ran.
    pub async fn present(&self, mut result: ExportResult) -> SummaryView {
        result.total_selected_size = self.table.selected_store_size().await;

        let failure_message = if result.failed > 0 {
            Some(
                self.backend
                    .translate(
                        "summary.total_export_failed",
                        &[("failed_count", result.failed.to_string())],
                    )
                    .await,
            )
        } else {
            None
        };

        let view = SummaryView {
            total_size_display: format_size(result.total_selected_size),
            result,
            failure_message,
            completed_at: Utc::now(),
        };

        *self.panel.lock().await = SummaryPanel {
            visible: true,
            done_visible: true,
            view: Some(view.clone()),
        };
        debug!(
            succeeded = view.result.succeeded,
            failed = view.result.failed,
            "export summary shown"
        );
        view
    }

    pub async fn panel(&self) -> SummaryPanel {
        self.panel.lock().await.clone()
    }

    /// "Learn more": opens the full error list. `None` when the visible
    /// summary has no failures.
    pub async fn learn_more(&self) -> Option<Notice> {
        let notice = {
            let panel = self.panel.lock().await;
            let view = panel.view.as_ref().filter(|_| panel.visible)?;
            let title = view.failure_message.clone()?;
            Notice::Modal {
                title,
                details: view.result.errors.iter().map(ToString::to_string).collect(),
            }
        };
        self.notices.push(notice.clone()).await;
        Some(notice)
    }

    /// Closes the summary and hides the done button. Returns false when it
    /// was already dismissed.
    pub async fn dismiss(&self) -> bool {
        let mut panel = self.panel.lock().await;
        if !panel.done_visible {
            return false;
        }
        panel.visible = false;
        panel.done_visible = false;
        true
    }
}
