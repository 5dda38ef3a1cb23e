use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use save_export_backend::Backend;
use save_export_core::{format_size, BackupRecord, RecordId, Settings, SortableRecord};
use save_export_storage::BackupRecordStore;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::selection;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableRow {
    pub id: RecordId,
    pub title: String,
    pub backup_count: usize,
    pub backup_size: u64,
    pub size_display: String,
    pub latest_backup: String,
    pub selected: bool,
    pub pinned: bool,
    pub permanent: bool,
}

impl TableRow {
    fn new(record: &BackupRecord, title: &str, pinned: bool) -> Self {
        Self {
            id: record.id.clone(),
            title: title.to_owned(),
            backup_count: record.backup_count(),
            backup_size: record.backup_size,
            size_display: format_size(record.backup_size),
            latest_backup: record.latest_backup.clone(),
            selected: false,
            pinned,
            permanent: record.has_permanent_backup(),
        }
    }
}

/// What the export table currently shows.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TableView {
    pub rows: Vec<TableRow>,
    pub loading: bool,
}

impl TableView {
    /// Returns false when no row has that id.
    pub fn set_selected(&mut self, id: &str, selected: bool) -> bool {
        match self.rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                row.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn select_all(&mut self, selected: bool) {
        for row in &mut self.rows {
            row.selected = selected;
        }
    }

    /// State of the header checkbox.
    pub fn all_selected(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|row| row.selected)
    }

    /// Selected ids in on-screen order.
    pub fn selected_ids(&self) -> Vec<RecordId> {
        self.rows
            .iter()
            .filter(|row| row.selected)
            .map(|row| row.id.clone())
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.rows.iter().filter(|row| row.selected).count()
    }

    pub fn selected_size(&self) -> u64 {
        self.rows
            .iter()
            .filter(|row| row.selected)
            .map(|row| row.backup_size)
            .sum()
    }
}

/// Turns a fetched dataset into ordered table rows: pinned games first,
/// then everything else, each group ordered by the backend sort service.
pub struct TableReconciler {
    backend: Arc<dyn Backend>,
}

impl TableReconciler {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Builds every row without touching the visible table, so a failing
    /// sort call leaves the previous rows in place.
    pub async fn build_rows(&self, records: &[BackupRecord], settings: &Settings) -> Result<Vec<TableRow>> {
        let language = settings.language.as_str();

        let mut seen = HashSet::new();
        let mut unique: Vec<&BackupRecord> = records
            .iter()
            .rev()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        unique.reverse();

        let (pinned, others): (Vec<SortableRecord>, Vec<SortableRecord>) = unique
            .into_iter()
            .filter(|r| !r.display_title(language).is_empty())
            .map(|r| SortableRecord::new(r.clone(), language))
            .partition(|s| s.record.is_pinned(settings));

        let pinned = self
            .backend
            .sort_records(pinned)
            .await
            .context("sort pinned games")?;
        let others = self
            .backend
            .sort_records(others)
            .await
            .context("sort games")?;

        debug!(pinned = pinned.len(), others = others.len(), "export rows built");

        let rows = pinned
            .iter()
            .map(|s| TableRow::new(&s.record, s.record.display_title(language), true))
            .chain(
                others
                    .iter()
                    .map(|s| TableRow::new(&s.record, s.record.display_title(language), false)),
            )
            .collect();
        Ok(rows)
    }

    /// Swaps in freshly built rows, carrying over whatever was selected in
    /// the rows being replaced.
    pub fn commit(view: &mut TableView, mut rows: Vec<TableRow>) {
        let previous = selection::capture(view);
        for row in &mut rows {
            selection::restore(row, &previous);
        }
        view.rows = rows;
    }
}

/// Owns the export table and keeps it in step with the backend.
pub struct TableController {
    backend: Arc<dyn Backend>,
    store: BackupRecordStore,
    reconciler: TableReconciler,
    view: RwLock<TableView>,
}

impl TableController {
    pub fn new(backend: Arc<dyn Backend>, store: BackupRecordStore) -> Self {
        Self {
            reconciler: TableReconciler::new(backend.clone()),
            backend,
            store,
            view: RwLock::new(TableView::default()),
        }
    }

    pub fn store(&self) -> &BackupRecordStore {
        &self.store
    }

    /// One full reconciliation pass. On failure the previous rows stay on
    /// screen and the error is returned; the loading flag is cleared either
    /// way.
    pub async fn refresh(&self, loader: bool) -> Result<()> {
        if loader {
            self.view.write().await.loading = true;
        }

        let outcome = self.reconcile().await;

        if loader {
            self.view.write().await.loading = false;
        }

        match &outcome {
            Ok(rows) => info!(rows, "export table refreshed"),
            Err(e) => warn!(error = %e, "export table refresh failed, keeping previous rows"),
        }
        outcome.map(|_| ())
    }

    async fn reconcile(&self) -> Result<usize> {
        let records = self
            .backend
            .fetch_exportable_records()
            .await
            .context("fetch export table data")?;
        let settings = self.backend.get_settings().await.context("load settings")?;

        let rows = self.reconciler.build_rows(&records, &settings).await?;

        // Store and view change together under the view lock.
        let mut view = self.view.write().await;
        self.store.refresh(records).await;
        TableReconciler::commit(&mut view, rows);
        Ok(view.rows.len())
    }

    pub async fn view(&self) -> TableView {
        self.view.read().await.clone()
    }

    /// Total size of the selected rows, read from the record store while the
    /// table cannot be swapped underneath.
    pub async fn selected_store_size(&self) -> u64 {
        let view = self.view.read().await;
        let selection = selection::capture(&view);
        self.store.total_size(selection.iter()).await
    }

    pub async fn selected_ids(&self) -> Vec<RecordId> {
        self.view.read().await.selected_ids()
    }

    pub async fn set_selected(&self, id: &str, selected: bool) -> bool {
        self.view.write().await.set_selected(id, selected)
    }

    pub async fn select_all(&self, selected: bool) {
        self.view.write().await.select_all(selected);
    }
}
