use anyhow::Result;
use save_export_core::{BackupRecord, ExportReport, ProgressPhase, RecordId, Settings, SortableRecord};
use serde_json::Value;

/// Operations the export tab consumes from the backend process.
///
/// The `persist_setting`, `report_progress` and `set_global_status` commands
/// are fire-and-forget: they return before the backend has acted on them and
/// callers must not assume a later read observes them.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Every game that currently has at least one backup.
    async fn fetch_exportable_records(&self) -> Result<Vec<BackupRecord>>;

    async fn get_settings(&self) -> Result<Settings>;

    /// Locale-aware ordering by `title_to_sort`.
    async fn sort_records(&self, records: Vec<SortableRecord>) -> Result<Vec<SortableRecord>>;

    /// Opens the native folder picker. `None` when the user cancels.
    async fn select_destination_folder(&self) -> Result<Option<String>>;

    fn persist_setting(&self, key: &str, value: Value);

    /// Runs the export. Rejects only on unrecoverable errors; per-game
    /// failures come back in the report.
    async fn start_export_operation(
        &self,
        selected_ids: &[RecordId],
        count: u32,
        destination: &str,
    ) -> Result<ExportReport>;

    /// Authoritative single-flight check. A `true` answer means the backend
    /// has raised the matching global status flag on our behalf.
    async fn check_operation_may_start(&self, operation: &str) -> Result<bool>;

    fn report_progress(&self, operation_id: &str, title: &str, phase: ProgressPhase);

    fn set_global_status(&self, flag: &str, value: bool);

    /// Never fails; implementations fall back to the key itself.
    async fn translate(&self, key: &str, params: &[(&str, String)]) -> String;
}
