#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use save_export_backend::Backend;
use save_export_core::{
    BackupItem, BackupRecord, ExportFailure, ExportReport, ProgressPhase, RecordId, Settings,
    SortableRecord, EXPORTING_FLAG,
};
use serde_json::Value;
use tokio::sync::Notify;

/// In-process backend that records every call the export tab makes.
#[derive(Default)]
pub struct FakeBackend {
    pub records: Mutex<Vec<BackupRecord>>,
    pub settings: Mutex<Settings>,
    pub fail_fetch: AtomicBool,
    pub fail_sort: AtomicBool,
    /// When set, the next sort call waits for a notification first.
    pub sort_gate: Mutex<Option<Arc<Notify>>>,
    /// Refuse every start check, as if another window were exporting.
    pub deny_start: AtomicBool,
    pub exporting: AtomicBool,
    pub export_errors: Mutex<Vec<ExportFailure>>,
    pub export_rejection: Mutex<Option<String>>,
    /// When set, exports wait for a notification before replying.
    pub export_gate: Mutex<Option<Arc<Notify>>>,
    pub folder: Mutex<Option<String>>,
    /// When set, the folder picker waits for a notification before replying.
    pub folder_gate: Mutex<Option<Arc<Notify>>>,
    /// Makes the export call panic, as a crashed worker would.
    pub panic_export: AtomicBool,

    pub fetch_calls: AtomicUsize,
    pub folder_calls: AtomicUsize,
    pub export_calls: Mutex<Vec<(Vec<RecordId>, u32, String)>>,
    pub progress: Mutex<Vec<ProgressPhase>>,
    pub statuses: Mutex<Vec<(String, bool)>>,
    pub persisted: Mutex<Vec<(String, Value)>>,
}

impl FakeBackend {
    pub fn with_records(records: Vec<BackupRecord>) -> Arc<Self> {
        let backend = Self::default();
        *backend.records.lock().unwrap() = records;
        Arc::new(backend)
    }

    pub fn set_records(&self, records: Vec<BackupRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn update_settings(&self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.settings.lock().unwrap());
    }

    pub fn export_calls(&self) -> Vec<(Vec<RecordId>, u32, String)> {
        self.export_calls.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<ProgressPhase> {
        self.progress.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(String, bool)> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn persisted(&self) -> Vec<(String, Value)> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Backend for FakeBackend {
    async fn fetch_exportable_records(&self) -> Result<Vec<BackupRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(anyhow!("backend unavailable"));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn get_settings(&self) -> Result<Settings> {
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn sort_records(&self, mut records: Vec<SortableRecord>) -> Result<Vec<SortableRecord>> {
        if self.fail_sort.load(Ordering::SeqCst) {
            return Err(anyhow!("sort service rejected"));
        }
        let gate = self.sort_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        records.sort_by_key(|r| r.title_to_sort.to_lowercase());
        Ok(records)
    }

    async fn select_destination_folder(&self) -> Result<Option<String>> {
        self.folder_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.folder_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.folder.lock().unwrap().clone())
    }

    fn persist_setting(&self, key: &str, value: Value) {
        self.persisted.lock().unwrap().push((key.to_owned(), value));
    }

    async fn start_export_operation(
        &self,
        selected_ids: &[RecordId],
        count: u32,
        destination: &str,
    ) -> Result<ExportReport> {
        self.export_calls
            .lock()
            .unwrap()
            .push((selected_ids.to_vec(), count, destination.to_owned()));
        if self.panic_export.load(Ordering::SeqCst) {
            panic!("export worker crashed");
        }

        let gate = self.export_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(message) = self.export_rejection.lock().unwrap().clone() {
            return Err(anyhow!(message));
        }
        Ok(ExportReport {
            errors: self.export_errors.lock().unwrap().clone(),
        })
    }

    async fn check_operation_may_start(&self, _operation: &str) -> Result<bool> {
        if self.deny_start.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(!self.exporting.swap(true, Ordering::SeqCst))
    }

    fn report_progress(&self, _operation_id: &str, _title: &str, phase: ProgressPhase) {
        self.progress.lock().unwrap().push(phase);
    }

    fn set_global_status(&self, flag: &str, value: bool) {
        if flag == EXPORTING_FLAG {
            self.exporting.store(value, Ordering::SeqCst);
        }
        self.statuses.lock().unwrap().push((flag.to_owned(), value));
    }

    async fn translate(&self, key: &str, params: &[(&str, String)]) -> String {
        if params.is_empty() {
            return key.to_owned();
        }
        let rendered: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{key}[{}]", rendered.join(","))
    }
}

pub fn record(id: &str, title: &str, size: u64) -> BackupRecord {
    BackupRecord {
        id: id.to_owned(),
        title: title.to_owned(),
        localized_title: None,
        backups: vec![BackupItem::default()],
        backup_size: size,
        latest_backup: "2026-10-01 12:00".to_owned(),
    }
}

pub fn failure(id: &str, message: &str) -> ExportFailure {
    ExportFailure {
        id: Some(id.to_owned()),
        message: message.to_owned(),
    }
}
