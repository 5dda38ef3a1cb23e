use std::sync::Arc;

use anyhow::Result;
use save_export_backend::Backend;
use save_export_storage::BackupRecordStore;

use crate::export::ExportOrchestrator;
use crate::notice::NoticeBoard;
use crate::summary::ExportSummaryPresenter;
use crate::table::TableController;

/// The export tab: its table, summary pane, export workflow and alert queue,
/// all sharing one backend.
pub struct ExportTab {
    pub table: Arc<TableController>,
    pub summary: Arc<ExportSummaryPresenter>,
    pub export: ExportOrchestrator,
    pub notices: Arc<NoticeBoard>,
}

impl ExportTab {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let notices = Arc::new(NoticeBoard::new());
        let table = Arc::new(TableController::new(backend.clone(), BackupRecordStore::new()));
        let summary = Arc::new(ExportSummaryPresenter::new(
            backend.clone(),
            table.clone(),
            notices.clone(),
        ));
        let export = ExportOrchestrator::new(backend, table.clone(), summary.clone(), notices.clone());
        Self {
            table,
            summary,
            export,
            notices,
        }
    }

    /// Handles the backend's `update-export-table` push.
    pub async fn on_update_export_table(&self) -> Result<()> {
        self.table.refresh(true).await
    }
}
